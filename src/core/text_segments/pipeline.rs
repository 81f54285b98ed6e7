use super::builder::{BuildReport, SegmentBuilder};
use super::config::SegmentConfig;
use super::error::SegmentError;
use super::merger::{merge_groups, MergedSegments};
use super::progress::{ProgressSink, STATUS_DONE, STATUS_MERGING, STATUS_RECOGNIZING};
use super::source::DetectionSource;
use log::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub segments: MergedSegments,
    pub report: BuildReport,
}

/// 检测源 → 构建器 → 合并器，单遍顺序执行
pub struct SegmentPipeline {
    config: SegmentConfig,
}

impl SegmentPipeline {
    pub fn new() -> Self {
        Self::with_config(SegmentConfig::default())
    }

    pub fn with_config(config: SegmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn run(
        &self,
        source: &mut dyn DetectionSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<PipelineOutput, SegmentError> {
        info!(
            "🔤 Segment pipeline: starting (max_gap={}ms)",
            self.config.max_gap_ms
        );

        let total = source.frame_count_hint();
        let mut builder = SegmentBuilder::with_duration_limit(self.config.duration_limit());
        let mut frames: u64 = 0;

        progress.report(0.0, STATUS_RECOGNIZING);
        while let Some(frame) = source.next_frame()? {
            if progress.is_cancelled() {
                warn!("🛑 Segment pipeline cancelled after {} frames", frames);
                return Err(SegmentError::Cancelled);
            }

            frames += 1;
            let accepted = builder.push_frame(frame.timestamp, frame.detections);
            debug!("Frame {} @ {}: {} detections accepted", frames, frame.timestamp, accepted);

            if let Some(total) = total.filter(|&t| t > 0) {
                progress.report((frames as f32 / total as f32).min(1.0), STATUS_RECOGNIZING);
            }
        }

        progress.report(1.0, STATUS_MERGING);
        let (groups, report) = builder.finish();
        let segments = merge_groups(groups, self.config.max_gap_ms);

        progress.report(1.0, STATUS_DONE);
        info!(
            "✅ Segment pipeline: {} frames, {} detections, {} segments",
            frames,
            report.accepted,
            segments.segment_count()
        );

        Ok(PipelineOutput { segments, report })
    }
}

impl Default for SegmentPipeline {
    fn default() -> Self {
        Self::new()
    }
}
