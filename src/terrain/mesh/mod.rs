// ============================================
// Mesh Module - Меши компонентов
// ============================================

mod vertex;
mod builder;

pub use vertex::TerrainVertex;
pub use builder::{ComponentMesh, build_component_mesh, vertex_layer};
