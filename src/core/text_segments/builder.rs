//! 片段构建器 - 按文字分组，每条检测生成一个单帧片段

use super::model::{Detection, Rectangle, Segment, Timestamp};
use log::{debug, warn};
use std::collections::BTreeMap;

/// 按文字分组的单帧片段列表，组内保持到达顺序
pub type SegmentGroups = BTreeMap<String, Vec<Segment>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectReason {
    DegenerateRegion,    // 宽或高为 0
    TimestampRegression, // 早于已接受的最新时间戳
    BeyondDuration,      // 超出媒体时长
}

/// 构建统计，独立于主结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub accepted: u64,
    pub skipped: u64,
    pub skipped_by_reason: BTreeMap<RejectReason, u64>,
}

impl BuildReport {
    pub fn skipped_for(&self, reason: RejectReason) -> u64 {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }

    fn record_skip(&mut self, reason: RejectReason) {
        self.skipped += 1;
        *self.skipped_by_reason.entry(reason).or_insert(0) += 1;
    }
}

pub struct SegmentBuilder {
    groups: SegmentGroups,
    report: BuildReport,
    latest: Option<Timestamp>,
    duration_limit: Option<Timestamp>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            report: BuildReport::default(),
            latest: None,
            duration_limit: None,
        }
    }

    pub fn with_duration_limit(duration_limit: Option<Timestamp>) -> Self {
        Self {
            duration_limit,
            ..Self::new()
        }
    }

    /// 接受或丢弃一条检测，丢弃时只计数不报错
    pub fn push(&mut self, detection: Detection) -> Result<(), RejectReason> {
        if let Err(reason) = self.validate(&detection) {
            debug!(
                "Skipping detection {:?} at {}: {:?}",
                detection.text, detection.timestamp, reason
            );
            self.report.record_skip(reason);
            return Err(reason);
        }

        self.latest = Some(detection.timestamp);
        self.report.accepted += 1;
        self.groups
            .entry(detection.text.clone())
            .or_default()
            .push(Segment::singleton(detection));
        Ok(())
    }

    /// 一帧的全部检测，返回接受数量
    pub fn push_frame<I>(&mut self, timestamp: Timestamp, detections: I) -> u64
    where
        I: IntoIterator<Item = (String, Rectangle)>,
    {
        let mut accepted: u64 = 0;
        for (text, region) in detections {
            if self.push(Detection::new(text, timestamp, region)).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }

    fn validate(&self, detection: &Detection) -> Result<(), RejectReason> {
        if detection.region.is_degenerate() {
            return Err(RejectReason::DegenerateRegion);
        }
        if let Some(latest) = self.latest {
            if detection.timestamp < latest {
                return Err(RejectReason::TimestampRegression);
            }
        }
        if let Some(limit) = self.duration_limit {
            if detection.timestamp > limit {
                return Err(RejectReason::BeyondDuration);
            }
        }
        Ok(())
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    pub fn finish(self) -> (SegmentGroups, BuildReport) {
        if self.report.skipped > 0 {
            warn!(
                "⚠️ Skipped {} malformed detections ({} accepted)",
                self.report.skipped, self.report.accepted
            );
        }
        (self.groups, self.report)
    }
}

impl Default for SegmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
