// ============================================
// Errors - Ошибки ландшафта
// ============================================

use thiserror::Error;

/// Ошибки работы с ландшафтом
#[derive(Debug, Error)]
pub enum CyLandError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid vertex rect ({x1}, {y1})-({x2}, {y2})")]
    OutOfBounds { x1: i32, y1: i32, x2: i32, y2: i32 },

    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("layer '{0}' is already registered")]
    DuplicateLayer(String),

    #[error("data size mismatch: expected {expected}, got {actual}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("invalid tile file magic")]
    InvalidMagic,

    #[error("unsupported tile file version {0}")]
    UnsupportedVersion(u32),

    #[error("streaming worker has stopped")]
    WorkerDisconnected,
}

pub type Result<T> = std::result::Result<T, CyLandError>;
