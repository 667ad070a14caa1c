// ============================================
// LOD Module - Уровни детализации компонентов
// ============================================

mod levels;
mod selector;

pub use levels::{LodSettings, max_lod_for};
pub use selector::{ViewerState, screen_size};
