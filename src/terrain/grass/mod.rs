// ============================================
// Grass Module - Растительность по слоям
// ============================================

mod random;
mod variety;
mod builder;

pub use random::{RandomStream, halton};
pub use variety::{FloatInterval, GrassScaling, GrassVariety, MAX_SQRT_INSTANCES};
pub use builder::{GrassInstance, build_grass, build_grass_for_store};
