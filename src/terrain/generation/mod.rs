// ============================================
// Generation Module - Процедурная генерация
// ============================================

pub mod noise;
mod height;

pub use noise::{hash2d, noise2d, fbm2d};
pub use height::ProceduralTerrain;
