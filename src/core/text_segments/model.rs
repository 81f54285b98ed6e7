//! 文字片段数据模型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 毫秒时间戳
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// 负数时间戳无效
    pub fn from_signed_millis(ms: i64) -> Option<Self> {
        u64::try_from(ms).ok().map(Self)
    }

    /// 按帧号和帧率换算时间戳（向下取整）
    pub fn from_frame(frame_number: u64, fps: f64) -> Option<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        let ms = (frame_number as f64 * 1000.0 / fps).floor();
        if ms.is_finite() && ms >= 0.0 && ms <= u64::MAX as f64 {
            Some(Self(ms as u64))
        } else {
            None
        }
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0;
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            total / 3_600_000,
            total / 60_000 % 60,
            total / 1000 % 60,
            total % 1000
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形，两个角点（源帧像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub pos1: Point,
    pub pos2: Point,
}

impl Rectangle {
    pub fn new(pos1: Point, pos2: Point) -> Self {
        Self { pos1, pos2 }
    }

    /// OCR 文本行组件给出的 (x, y, w, h)
    pub fn from_xywh(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            pos1: Point::new(x, y),
            pos2: Point::new(x.saturating_add(w), y.saturating_add(h)),
        }
    }

    pub fn width(&self) -> u32 {
        self.pos1.x.abs_diff(self.pos2.x)
    }

    pub fn height(&self) -> u32 {
        self.pos1.y.abs_diff(self.pos2.y)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// 单条识别结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub text: String,
    pub timestamp: Timestamp,
    pub region: Rectangle,
}

impl Detection {
    pub fn new(text: impl Into<String>, timestamp: Timestamp, region: Rectangle) -> Self {
        Self {
            text: text.into(),
            timestamp,
            region,
        }
    }
}

/// 关键帧时间线：时间戳 -> 区域序列，按时间升序
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyframes(BTreeMap<Timestamp, Vec<Rectangle>>);

impl Keyframes {
    pub fn single(timestamp: Timestamp, regions: Vec<Rectangle>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(timestamp, regions);
        Self(map)
    }

    /// 合并两条时间线，同一时间戳以 `later` 为准
    pub fn union(mut self, later: Keyframes) -> Self {
        self.0.extend(later.0);
        self
    }

    /// Keeps an entry only when its regions differ from the last kept entry.
    pub fn compact(self) -> Self {
        let mut kept: BTreeMap<Timestamp, Vec<Rectangle>> = BTreeMap::new();
        for (timestamp, regions) in self.0 {
            let unchanged = kept
                .last_key_value()
                .map(|(_, last)| *last == regions)
                .unwrap_or(false);
            if !unchanged {
                kept.insert(timestamp, regions);
            }
        }
        Self(kept)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.0.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.0.keys().next_back().copied()
    }

    pub fn get(&self, timestamp: Timestamp) -> Option<&[Rectangle]> {
        self.0.get(&timestamp).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &[Rectangle])> + '_ {
        self.0.iter().map(|(ts, regions)| (*ts, regions.as_slice()))
    }
}

/// 同一文字在时间上连续出现的片段
///
/// 只能通过 [`Segment::singleton`] 创建，或由合并器折叠得到；
/// 输出后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    text: String,
    start: Timestamp,
    end: Timestamp,
    keyframes: Keyframes,
}

impl Segment {
    pub fn singleton(detection: Detection) -> Self {
        Self {
            text: detection.text,
            start: detection.timestamp,
            end: detection.timestamp,
            keyframes: Keyframes::single(detection.timestamp, vec![detection.region]),
        }
    }

    /// Folds a later segment of the same text into this one.
    pub fn absorb(self, next: Segment) -> Segment {
        debug_assert_eq!(self.text, next.text);
        let keyframes = self.keyframes.union(next.keyframes).compact();
        Segment {
            text: self.text,
            start: self.start,
            end: self.end.max(next.end),
            keyframes,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn keyframes(&self) -> &Keyframes {
        &self.keyframes
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_since(self.start)
    }
}
