use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Detection source failed: {0}")]
    Source(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),
    #[error("Run cancelled")]
    Cancelled,
    #[error("State lock poisoned")]
    LockPoisoned,
    #[error("Segment sink rejected output: {0}")]
    Sink(String),
}
