use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ToneError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected file header: {0:?}")]
    BadHeader(String),
    #[error("malformed data at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("unsupported curve blob version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown curve type {0}")]
    UnknownCurveType(u8),
    #[error("bit depth mismatch: expected {expected} bytes per sample, found {found}")]
    DepthMismatch { expected: u8, found: u8 },
    #[error("free curve holds {found} segments, expected {expected}")]
    SegmentCountMismatch { expected: u32, found: u32 },
    #[error("curve blob truncated")]
    Truncated,
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parameter {0:?} has the wrong type")]
    ParameterType(String),
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(&'static str),
}

pub type Result<T> = std::result::Result<T, ToneError>;
