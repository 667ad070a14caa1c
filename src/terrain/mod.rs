// ============================================
// Terrain Module - Ландшафт на карте высот
// ============================================

pub mod coords;
pub mod bounds;
pub mod heightfield;
pub mod layers;
pub mod lod;
pub mod mesh;
pub mod collision;
pub mod streaming;
pub mod generation;
pub mod grass;

// Re-exports
pub use coords::{ComponentKey, VertexRect, GridShape, MID_VALUE, ZSCALE, height_to_local, local_to_height};
pub use bounds::Aabb;
pub use heightfield::{HeightfieldComponent, HeightfieldStore, MipView};
pub use layers::{LayerId, LayerInfo, LayerRegistry, ComponentWeights, PaintingRestriction, VISIBILITY_LAYER_NAME};
pub use lod::{LodSettings, ViewerState};
pub use mesh::{TerrainVertex, ComponentMesh, build_component_mesh};
pub use collision::{CollisionHeightfield, build_collision, build_collision_all};
pub use streaming::{StreamingManager, StreamUpdate, StreamedComponent, TileSource, StoreSnapshot};
pub use generation::ProceduralTerrain;
pub use grass::{GrassVariety, GrassScaling, GrassInstance, build_grass};
