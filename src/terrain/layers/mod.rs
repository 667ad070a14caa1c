// ============================================
// Layers Module - Слои покраски ландшафта
// ============================================

mod layer;
mod weights;
mod paint;

pub use layer::{LayerId, LayerInfo, LayerRegistry, LayersFile, HOLE_THRESHOLD, VISIBILITY_LAYER_NAME};
pub use weights::{ComponentWeights, LayerAllocation};
pub use paint::PaintingRestriction;
