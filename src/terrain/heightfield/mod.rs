// ============================================
// Heightfield Module - Хранилище карты высот
// ============================================

pub mod mips;
mod component;
mod normals;
mod store;

pub use mips::{MipLevel, MipView, mip_side, mip_subsection_quads};
pub use component::HeightfieldComponent;
pub use normals::{pack_normal, unpack_normal};
pub use store::HeightfieldStore;
