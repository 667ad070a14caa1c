// ============================================
// Terrain Vertex - Структура вершины
// ============================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, Default, PartialEq)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// UV по компоненту (0..1)
    pub uv: [f32; 2],
    /// Доминантный слой, 255 = нет покраски
    pub layer: u32,
    /// Вес доминантного слоя (0..1)
    pub layer_weight: f32,
}

impl TerrainVertex {
    pub const SIZE: usize = std::mem::size_of::<TerrainVertex>();

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv, layer: 255, layer_weight: 0.0 }
    }

    /// Вершина с доминантным слоем
    pub fn with_layer(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], layer: u8, weight: u8) -> Self {
        Self {
            position,
            normal,
            uv,
            layer: layer as u32,
            layer_weight: weight as f32 / 255.0,
        }
    }
}
