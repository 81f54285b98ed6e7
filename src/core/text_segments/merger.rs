//! 片段合并器 - 间隔容差内的同文字片段折叠为一个片段

use super::builder::SegmentGroups;
use super::error::SegmentError;
use super::model::{Segment, Timestamp};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// 合并一个文字的按时间排序的片段列表
///
/// 输入必须按时间排序；否则 debug 构建直接 panic，
/// release 构建把间隔视为 0。
pub fn merge_run(run: Vec<Segment>, max_gap_ms: u64) -> Vec<Segment> {
    let mut iter = run.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut finished = Vec::new();
    let last = iter.fold(first, |acc, next| {
        debug_assert!(
            next.start() >= acc.end(),
            "segments out of order: {} after {}",
            next.start(),
            acc.end()
        );
        if gap_ms(&acc, &next) <= max_gap_ms {
            acc.absorb(next)
        } else {
            finished.push(acc);
            next
        }
    });
    finished.push(last);
    finished
}

/// `next` 起点到 `acc` 终点的间隔，乱序时为 0
fn gap_ms(acc: &Segment, next: &Segment) -> u64 {
    next.start().saturating_since(acc.end())
}

/// 各文字互不影响，并行合并后按文字排序收集
pub fn merge_groups(groups: SegmentGroups, max_gap_ms: u64) -> MergedSegments {
    let input_count: usize = groups.values().map(Vec::len).sum();

    let by_text: BTreeMap<String, Vec<Segment>> = groups
        .into_par_iter()
        .map(|(text, run)| {
            let merged = merge_run(run, max_gap_ms);
            (text, merged)
        })
        .filter(|(_, merged)| !merged.is_empty())
        .collect();

    let merged = MergedSegments { by_text };
    info!(
        "🧩 Merged {} singletons into {} segments across {} texts (max_gap={}ms)",
        input_count,
        merged.segment_count(),
        merged.text_count(),
        max_gap_ms
    );
    merged
}

/// Receives each text's final segment list for persistence.
pub trait SegmentSink {
    fn accept(&mut self, text: &str, segments: &[Segment]) -> Result<(), SegmentError>;
}

/// 合并结果：文字 -> 不重叠的有序片段列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergedSegments {
    by_text: BTreeMap<String, Vec<Segment>>,
}

impl MergedSegments {
    pub fn get(&self, text: &str) -> Option<&[Segment]> {
        self.by_text.get(text).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Segment])> + '_ {
        self.by_text
            .iter()
            .map(|(text, segments)| (text.as_str(), segments.as_slice()))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_text.keys().map(String::as_str)
    }

    pub fn text_count(&self) -> usize {
        self.by_text.len()
    }

    pub fn segment_count(&self) -> usize {
        self.by_text.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }

    /// 所有文字的 (start, end)，按时间排序（"任意文字"轨道）
    pub fn all_spans(&self) -> Vec<(Timestamp, Timestamp)> {
        let mut spans: Vec<_> = self
            .by_text
            .values()
            .flatten()
            .map(|s| (s.start(), s.end()))
            .collect();
        spans.sort_unstable();
        spans
    }

    pub fn emit(&self, sink: &mut dyn SegmentSink) -> Result<(), SegmentError> {
        for (text, segments) in self.iter() {
            debug!("Emitting {} segments for {:?}", segments.len(), text);
            sink.accept(text, segments)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SegmentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Segment>> {
        self.by_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::text_segments::builder::SegmentBuilder;
    use crate::core::text_segments::model::{Detection, Keyframes, Rectangle};

    const MAX_GAP: u64 = 41;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn r1() -> Rectangle {
        Rectangle::from_xywh(10, 400, 200, 30)
    }

    fn r2() -> Rectangle {
        Rectangle::from_xywh(12, 402, 200, 30)
    }

    fn singletons(text: &str, frames: &[(u64, Rectangle)]) -> Vec<Segment> {
        frames
            .iter()
            .map(|&(ms, region)| Segment::singleton(Detection::new(text, ts(ms), region)))
            .collect()
    }

    fn keyframe_stamps(segment: &Segment) -> Vec<u64> {
        segment.keyframes().iter().map(|(t, _)| t.as_millis()).collect()
    }

    #[test]
    fn test_steady_text_collapses_to_one_keyframe() {
        let run = singletons("A", &[(0, r1()), (40, r1()), (80, r1()), (120, r1())]);
        let merged = merge_run(run, MAX_GAP);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start(), ts(0));
        assert_eq!(merged[0].end(), ts(120));
        assert_eq!(keyframe_stamps(&merged[0]), vec![0]);
        assert_eq!(merged[0].keyframes().get(ts(0)), Some(&[r1()][..]));
    }

    #[test]
    fn test_large_gap_splits() {
        let run = singletons("A", &[(0, r1()), (500, r1())]);
        let merged = merge_run(run, MAX_GAP);

        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].start(), merged[0].end()), (ts(0), ts(0)));
        assert_eq!((merged[1].start(), merged[1].end()), (ts(500), ts(500)));
    }

    #[test]
    fn test_region_change_adds_keyframe() {
        let run = singletons("A", &[(0, r1()), (40, r2())]);
        let merged = merge_run(run, MAX_GAP);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].end(), ts(40));
        let expected = Keyframes::single(ts(0), vec![r1()])
            .union(Keyframes::single(ts(40), vec![r2()]));
        assert_eq!(merged[0].keyframes(), &expected);
    }

    #[test]
    fn test_unchanged_region_compacted() {
        let run = singletons("A", &[(0, r1()), (40, r1()), (80, r2())]);
        let merged = merge_run(run, MAX_GAP);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].end(), ts(80));
        let expected = Keyframes::single(ts(0), vec![r1()])
            .union(Keyframes::single(ts(80), vec![r2()]));
        assert_eq!(merged[0].keyframes(), &expected);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "segments out of order")]
    fn test_out_of_order_run_panics_in_debug() {
        let run = singletons("A", &[(80, r1()), (0, r1())]);
        merge_run(run, MAX_GAP);
    }

    #[test]
    fn test_reversed_gap_saturates_to_zero() {
        let later = Segment::singleton(Detection::new("A", ts(80), r1()));
        let earlier = Segment::singleton(Detection::new("A", ts(0), r1()));

        assert_eq!(gap_ms(&later, &earlier), 0);
        assert_eq!(gap_ms(&earlier, &later), 80);
    }

    #[test]
    fn test_gap_equal_to_tolerance_merges() {
        let merged = merge_run(singletons("A", &[(0, r1()), (41, r1())]), MAX_GAP);
        assert_eq!(merged.len(), 1);

        let merged = merge_run(singletons("A", &[(0, r1()), (42, r1())]), MAX_GAP);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_zero_gap_tolerance() {
        let merged = merge_run(singletons("A", &[(0, r1()), (0, r1()), (1, r1())]), 0);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].end(), ts(0));
        assert_eq!(merged[1].start(), ts(1));
    }

    #[test]
    fn test_same_timestamp_last_write_wins() {
        let run = singletons("A", &[(0, r1()), (40, r1()), (40, r2())]);
        let merged = merge_run(run, MAX_GAP);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].keyframes().get(ts(40)), Some(&[r2()][..]));
        assert_eq!(keyframe_stamps(&merged[0]), vec![0, 40]);
    }

    #[test]
    fn test_single_and_empty_runs() {
        let merged = merge_run(singletons("A", &[(120, r1())]), MAX_GAP);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].keyframes().len(), 1);

        assert!(merge_run(Vec::new(), MAX_GAP).is_empty());
    }

    #[test]
    fn test_returning_shape_is_kept() {
        let run = singletons("A", &[(0, r1()), (40, r2()), (80, r1())]);
        let merged = merge_run(run, MAX_GAP);
        assert_eq!(keyframe_stamps(&merged[0]), vec![0, 40, 80]);
    }

    fn build_groups() -> SegmentGroups {
        let mut builder = SegmentBuilder::new();
        let mut t = 0;
        // "A" 连续出现两段，"B" 偶尔漏帧
        for frame in 0..60u64 {
            if frame < 20 || frame >= 35 {
                let region = if frame % 7 == 0 { r2() } else { r1() };
                builder.push(Detection::new("A", ts(t), region)).unwrap();
            }
            if frame % 3 != 2 {
                builder.push(Detection::new("B", ts(t), r1())).unwrap();
            }
            t += 40;
        }
        builder.finish().0
    }

    #[test]
    fn test_output_invariants() {
        let merged = merge_groups(build_groups(), MAX_GAP);
        assert_eq!(merged.text_count(), 2);

        for (_, segments) in merged.iter() {
            for s in segments {
                assert!(s.start() <= s.end());
                assert!(!s.keyframes().is_empty());
                for (t, _) in s.keyframes().iter() {
                    assert!(t >= s.start() && t <= s.end());
                }
                let regions: Vec<_> = s.keyframes().iter().map(|(_, r)| r.to_vec()).collect();
                assert!(regions.windows(2).all(|w| w[0] != w[1]));
            }
            for pair in segments.windows(2) {
                assert!(pair[0].end() < pair[1].start());
                assert!(pair[1].start().saturating_since(pair[0].end()) > MAX_GAP);
            }
        }

        assert_eq!(merged.get("A").map(<[Segment]>::len), Some(2));
        // 漏一帧 (80ms) 超过 41ms 容差
        assert!(merged.get("B").map(<[Segment]>::len).unwrap_or(0) > 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let merged = merge_groups(build_groups(), MAX_GAP);
        let again = merge_groups(merged.clone().into_inner(), MAX_GAP);
        assert_eq!(merged, again);
    }

    #[test]
    fn test_all_spans_sorted() {
        let merged = merge_groups(build_groups(), MAX_GAP);
        let spans = merged.all_spans();
        assert_eq!(spans.len(), merged.segment_count());
        assert!(spans.windows(2).all(|w| w[0] <= w[1]));
    }

    struct RecordingSink {
        seen: Vec<(String, usize)>,
    }

    impl SegmentSink for RecordingSink {
        fn accept(&mut self, text: &str, segments: &[Segment]) -> Result<(), SegmentError> {
            self.seen.push((text.to_string(), segments.len()));
            Ok(())
        }
    }

    #[test]
    fn test_emit_each_text_once() {
        let merged = merge_groups(build_groups(), MAX_GAP);
        let mut sink = RecordingSink { seen: Vec::new() };
        merged.emit(&mut sink).unwrap();

        let texts: Vec<&str> = sink.seen.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
        assert_eq!(sink.seen[0].1, 2);
    }

    struct FailingSink {
        calls: usize,
    }

    impl SegmentSink for FailingSink {
        fn accept(&mut self, _text: &str, _segments: &[Segment]) -> Result<(), SegmentError> {
            self.calls += 1;
            Err(SegmentError::Sink("disk full".to_string()))
        }
    }

    #[test]
    fn test_emit_stops_at_first_sink_error() {
        let merged = merge_groups(build_groups(), MAX_GAP);
        let mut sink = FailingSink { calls: 0 };

        let result = merged.emit(&mut sink);
        assert!(matches!(result, Err(SegmentError::Sink(ref msg)) if msg == "disk full"));
        assert_eq!(sink.calls, 1);
    }

    #[test]
    fn test_to_json_shape() {
        let mut groups = SegmentGroups::new();
        groups.insert("A".to_string(), singletons("A", &[(0, r1()), (40, r1())]));
        let json = merge_groups(groups, MAX_GAP).to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["A"][0]["start"], 0);
        assert_eq!(value["A"][0]["end"], 40);
        assert_eq!(value["A"][0]["keyframes"]["0"][0]["pos1"]["x"], 10);
    }
}
