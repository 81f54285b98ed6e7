use super::error::SegmentError;
use super::model::Timestamp;

/// 片段合并配置
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    /// 相邻检测允许的最大间隔（毫秒）
    pub max_gap_ms: u64,
    /// 媒体时长，超出的检测会被丢弃
    pub duration_limit_ms: Option<u64>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        // 25fps 帧间隔 40ms + 1ms 容差
        Self {
            max_gap_ms: 41,
            duration_limit_ms: None,
        }
    }
}

impl SegmentConfig {
    pub fn with_max_gap(max_gap_ms: u64) -> Self {
        Self {
            max_gap_ms,
            ..Default::default()
        }
    }

    /// 帧间隔四舍五入后加 1ms，漏掉单帧不会打断片段
    pub fn for_frame_rate(fps: f64) -> Result<Self, SegmentError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SegmentError::InvalidFrameRate(fps));
        }
        let interval_ms = (1000.0 / fps).round() as u64;
        Ok(Self::with_max_gap(interval_ms + 1))
    }

    pub fn with_duration_limit(mut self, duration_ms: u64) -> Self {
        self.duration_limit_ms = Some(duration_ms);
        self
    }

    pub fn duration_limit(&self) -> Option<Timestamp> {
        self.duration_limit_ms.map(Timestamp::from_millis)
    }
}
