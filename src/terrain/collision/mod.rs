// ============================================
// Collision Module - Коллизии ландшафта
// ============================================

mod heightfield;
mod builder;

pub use heightfield::{CollisionHeightfield, SimpleCollision};
pub use builder::{build_collision, build_collision_all};
