// ============================================
// CyLand - Тайловый ландшафт на карте высот
// ============================================
// Хранилище высот, слои покраски, LOD стриминг и коллизии

pub mod core;
pub mod terrain;
pub mod save;
pub mod manifest;

// Re-exports
pub use core::{CyLandError, CyLandSettings, Result, StreamingSettings};
pub use terrain::{
    ComponentKey, VertexRect, HeightfieldComponent, HeightfieldStore,
    LayerId, LayerInfo, LayerRegistry, PaintingRestriction,
    LodSettings, ViewerState, CollisionHeightfield, ComponentMesh, TerrainVertex,
    StreamingManager, StreamUpdate, TileSource, StoreSnapshot,
};
pub use save::TileDirectory;
