//! 文字片段合并 - 把逐帧文字识别结果压缩为按文字分组的时间片段
//!
//! 流程：
//! 1. 检测源 - 外部识别阶段逐帧产出 (文字, 时间戳, 区域)
//! 2. 构建器 - 按文字精确分组，每条检测生成单帧片段，丢弃畸形检测
//! 3. 合并器 - 间隔容差内的片段折叠，关键帧去重
//! 4. 输出 - 每个文字一组互不重叠的有序片段

pub mod builder;
pub mod config;
pub mod error;
pub mod merger;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod source;

pub use builder::{BuildReport, RejectReason, SegmentBuilder, SegmentGroups};
pub use config::SegmentConfig;
pub use error::SegmentError;
pub use merger::{merge_groups, merge_run, MergedSegments, SegmentSink};
pub use model::{Detection, Keyframes, Point, Rectangle, Segment, Timestamp};
pub use pipeline::{PipelineOutput, SegmentPipeline};
pub use progress::{NoProgress, ProgressSink};
pub use source::{DetectionSource, FrameDetections, VecDetectionSource};
