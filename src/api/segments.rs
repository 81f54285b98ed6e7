//! 文字片段追踪器

use crate::api::models::segments::{
    TextDetectionDto, TextSegmentDto, TrackerResult, TrackerStats,
};
use crate::core::text_segments::{
    merge_groups, MergedSegments, Rectangle, SegmentBuilder, SegmentConfig, SegmentError,
    Timestamp,
};
use flutter_rust_bridge::frb;
use log::{debug, info};
use std::sync::{Mutex, MutexGuard};

struct TrackerState {
    builder: SegmentBuilder,
    processed_frames: u64,
    /// 上一次 finish 的统计
    last_run: Option<TrackerStats>,
}

impl TrackerState {
    fn new(config: &SegmentConfig) -> Self {
        Self {
            builder: SegmentBuilder::with_duration_limit(config.duration_limit()),
            processed_frames: 0,
            last_run: None,
        }
    }

    fn stats(&self) -> TrackerStats {
        let report = self.builder.report();
        TrackerStats {
            processed_frames: self.processed_frames,
            accepted_detections: report.accepted,
            skipped_detections: report.skipped,
            distinct_texts: self.builder.key_count() as u64,
        }
    }
}

/// 文字片段追踪器 - 逐帧喂入识别结果，结束时合并
///
/// ```dart
/// final tracker = TextSegmentTracker.createForFrameRate(fps: 30);
/// tracker.pushFrame(timestampMs: ts, detections: lines);
/// final segments = tracker.finish();
/// ```
#[frb(opaque)]
pub struct TextSegmentTracker {
    config: SegmentConfig,
    state: Mutex<TrackerState>,
}

impl TextSegmentTracker {
    /// 指定最大间隔（毫秒）
    #[frb(sync)]
    pub fn create(max_gap_ms: u64) -> Self {
        Self::with_config(SegmentConfig::with_max_gap(max_gap_ms))
    }

    /// 按帧率推导最大间隔
    #[frb(sync)]
    pub fn create_for_frame_rate(fps: f64) -> Result<Self, SegmentError> {
        Ok(Self::with_config(SegmentConfig::for_frame_rate(fps)?))
    }

    #[frb(ignore)]
    pub fn with_config(config: SegmentConfig) -> Self {
        info!("🔤 TextSegmentTracker: created (max_gap={}ms)", config.max_gap_ms);
        Self {
            state: Mutex::new(TrackerState::new(&config)),
            config,
        }
    }

    /// 喂入一帧，返回被接受的检测数
    #[frb(sync)]
    pub fn push_frame(
        &self,
        timestamp_ms: u64,
        detections: Vec<TextDetectionDto>,
    ) -> Result<u64, SegmentError> {
        let mut state = self.lock()?;
        state.processed_frames += 1;
        let accepted = state.builder.push_frame(
            Timestamp::from_millis(timestamp_ms),
            detections.into_iter().map(|d| (d.text, Rectangle::from(d.region))),
        );
        debug!("Frame @{}ms: {} detections accepted", timestamp_ms, accepted);
        Ok(accepted)
    }

    #[frb(sync, getter)]
    pub fn stats(&self) -> Result<TrackerStats, SegmentError> {
        Ok(self.lock()?.stats())
    }

    /// 上一次 `finish`/`finish_json` 时的统计（含丢弃数）
    #[frb(sync, getter)]
    pub fn last_run_stats(&self) -> Result<Option<TrackerStats>, SegmentError> {
        Ok(self.lock()?.last_run.clone())
    }

    /// 合并并返回全部片段及本次统计，追踪器随后重置
    #[frb]
    pub fn finish(&self) -> Result<TrackerResult, SegmentError> {
        let (merged, stats) = self.take_merged()?;
        let segments = merged
            .iter()
            .flat_map(|(_, segments)| segments.iter().map(TextSegmentDto::from))
            .collect();
        Ok(TrackerResult { segments, stats })
    }

    /// 同 `finish`，以 JSON 返回（文字 -> 片段列表）
    #[frb]
    pub fn finish_json(&self) -> Result<String, SegmentError> {
        self.take_merged()?.0.to_json()
    }

    #[frb(sync)]
    pub fn reset(&self) -> Result<(), SegmentError> {
        let mut state = self.lock()?;
        *state = TrackerState::new(&self.config);
        Ok(())
    }

    fn take_merged(&self) -> Result<(MergedSegments, TrackerStats), SegmentError> {
        let (finished, stats) = {
            let mut state = self.lock()?;
            let stats = state.stats();
            let mut fresh = TrackerState::new(&self.config);
            fresh.last_run = Some(stats.clone());
            (std::mem::replace(&mut *state, fresh), stats)
        };
        let (groups, report) = finished.builder.finish();
        if report.skipped > 0 {
            info!(
                "📋 TextSegmentTracker: {} of {} detections skipped",
                report.skipped,
                report.accepted + report.skipped
            );
        }
        Ok((merge_groups(groups, self.config.max_gap_ms), stats))
    }

    fn lock(&self) -> Result<MutexGuard<'_, TrackerState>, SegmentError> {
        self.state.lock().map_err(|_| SegmentError::LockPoisoned)
    }
}

impl Drop for TextSegmentTracker {
    fn drop(&mut self) {
        info!("🗑️ TextSegmentTracker: released");
    }
}
