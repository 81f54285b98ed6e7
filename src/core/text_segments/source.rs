use super::error::SegmentError;
use super::model::{Rectangle, Timestamp};
use std::collections::VecDeque;

/// 一帧的识别结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDetections {
    pub timestamp: Timestamp,
    pub detections: Vec<(String, Rectangle)>,
}

impl FrameDetections {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            detections: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>, region: Rectangle) -> Self {
        self.detections.push((text.into(), region));
        self
    }
}

/// 外部识别阶段，按时间顺序逐帧产出检测
pub trait DetectionSource {
    /// `Ok(None)` 表示结束；错误对整个运行是致命的
    fn next_frame(&mut self) -> Result<Option<FrameDetections>, SegmentError>;

    /// Total frame count if known, used for progress fractions.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// 内存中的检测源
pub struct VecDetectionSource {
    frames: VecDeque<FrameDetections>,
    total: u64,
}

impl VecDetectionSource {
    pub fn new(frames: Vec<FrameDetections>) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            total,
        }
    }
}

impl DetectionSource for VecDetectionSource {
    fn next_frame(&mut self) -> Result<Option<FrameDetections>, SegmentError> {
        Ok(self.frames.pop_front())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
