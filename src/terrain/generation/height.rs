// ============================================
// Procedural Terrain - Процедурные высоты
// ============================================

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::terrain::coords::{local_to_height, ComponentKey, VertexRect};
use crate::terrain::heightfield::HeightfieldStore;

use super::noise::fbm2d;

/// Параметры генерации высот (в локальных единицах высоты)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralTerrain {
    pub seed: u32,
    pub base_height: f32,
    pub amplitude: f32,
    /// Частота первой октавы на вершину
    pub frequency: f32,
    pub octaves: u32,
}

impl Default for ProceduralTerrain {
    fn default() -> Self {
        Self {
            seed: 1337,
            base_height: 0.0,
            amplitude: 64.0,
            frequency: 0.01,
            octaves: 5,
        }
    }
}

impl ProceduralTerrain {
    /// Локальная высота в глобальной вершине
    #[inline]
    pub fn local_height(&self, gx: i32, gy: i32) -> f32 {
        let n = fbm2d(self.seed, gx as f32 * self.frequency, gy as f32 * self.frequency, self.octaves);
        self.base_height + (n * 2.0 - 1.0) * self.amplitude
    }

    #[inline]
    pub fn encoded_height(&self, gx: i32, gy: i32) -> u16 {
        local_to_height(self.local_height(gx, gy))
    }

    /// Высоты прямоугольника (row-major)
    pub fn rect_heights(&self, rect: &VertexRect) -> Vec<u16> {
        (rect.y1..=rect.y2)
            .into_par_iter()
            .flat_map_iter(|gy| (rect.x1..=rect.x2).map(move |gx| self.encoded_height(gx, gy)))
            .collect()
    }

    /// Заполнить прямоугольник, создав недостающие компоненты
    pub fn populate_store(&self, store: &mut HeightfieldStore, rect: VertexRect) -> Result<Vec<ComponentKey>> {
        rect.validate()?;
        let data = self.rect_heights(&rect);
        let touched = store.set_height_data(rect, &data, true)?;
        log::info!(
            "Generated {} components (seed {}, {}x{} vertices)",
            touched.len(), self.seed, rect.width(), rect.height()
        );
        Ok(touched)
    }

    /// Заполнить компоненты min..=max целиком
    pub fn populate_components(
        &self,
        store: &mut HeightfieldStore,
        min: ComponentKey,
        max: ComponentKey,
    ) -> Result<Vec<ComponentKey>> {
        let cs = store.size_quads();
        let (x1, y1) = min.section_base(cs);
        let (x2, y2) = max.section_base(cs);
        self.populate_store(store, VertexRect::new(x1, y1, x2 + cs, y2 + cs))
    }
}
