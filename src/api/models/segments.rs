use serde::{Deserialize, Serialize};

use crate::core::text_segments::{Point, Rectangle, Segment};

/// 矩形（两个角点）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectDto {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl From<RectDto> for Rectangle {
    fn from(r: RectDto) -> Self {
        Rectangle::new(Point::new(r.x1, r.y1), Point::new(r.x2, r.y2))
    }
}

impl From<&Rectangle> for RectDto {
    fn from(r: &Rectangle) -> Self {
        Self {
            x1: r.pos1.x,
            y1: r.pos1.y,
            x2: r.pos2.x,
            y2: r.pos2.y,
        }
    }
}

/// 识别阶段输出的一条文字
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDetectionDto {
    pub text: String,
    pub region: RectDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeDto {
    pub timestamp_ms: u64,
    pub regions: Vec<RectDto>,
}

/// 合并后的文字片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegmentDto {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub keyframes: Vec<KeyframeDto>,
}

impl From<&Segment> for TextSegmentDto {
    fn from(segment: &Segment) -> Self {
        Self {
            text: segment.text().to_string(),
            start_ms: segment.start().as_millis(),
            end_ms: segment.end().as_millis(),
            keyframes: segment
                .keyframes()
                .iter()
                .map(|(ts, regions)| KeyframeDto {
                    timestamp_ms: ts.as_millis(),
                    regions: regions.iter().map(RectDto::from).collect(),
                })
                .collect(),
        }
    }
}

/// 累计统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub processed_frames: u64,
    pub accepted_detections: u64,
    pub skipped_detections: u64,
    pub distinct_texts: u64,
}

/// `finish` 的返回：片段 + 本轮统计
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerResult {
    pub segments: Vec<TextSegmentDto>,
    pub stats: TrackerStats,
}
