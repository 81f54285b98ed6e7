//! 进度旁路通道，不影响结果

pub const STATUS_RECOGNIZING: &str = "Performing OCR";
pub const STATUS_MERGING: &str = "Merging segments";
pub const STATUS_DONE: &str = "Done!";

/// 按帧采样：一帧的全部检测处理完后报告一次，而不是每条检测一次。
/// 帧数未知时识别阶段只有起始的 0.0。
pub trait ProgressSink {
    /// `fraction` 取值 0.0-1.0，为已处理帧数 / 总帧数
    fn report(&mut self, fraction: f32, status: &str);

    /// 每帧开始前检查一次
    fn is_cancelled(&self) -> bool {
        false
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _fraction: f32, _status: &str) {}
}
