// ============================================
// Core Module - Ошибки и настройки ландшафта
// ============================================

pub mod error;
pub mod settings;

pub use error::{CyLandError, Result};
pub use settings::{CyLandSettings, StreamingSettings};
