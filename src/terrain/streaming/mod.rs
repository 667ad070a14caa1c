// ============================================
// Streaming Module - Фоновая загрузка компонентов
// ============================================
// Источник тайлов -> планировщик радиуса -> сборка меша и коллизии в rayon

mod types;
mod source;
mod planner;
mod worker;
mod manager;

pub use types::{StreamUpdate, StreamedComponent};
pub use source::{StoreSnapshot, TileSource};
pub use planner::StreamingPlanner;
pub use manager::StreamingManager;
