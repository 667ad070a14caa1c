// ============================================
// Heightfield Component - Тайл карты высот
// ============================================
// (size_quads + 1)^2 вершин: крайние ряды совпадают с соседями

use ultraviolet::Vec3;

use crate::core::{CyLandError, CyLandSettings, Result};
use crate::terrain::bounds::Aabb;
use crate::terrain::coords::{height_to_local, sample_bilinear, ComponentKey, GridShape, MID_VALUE};
use crate::terrain::layers::ComponentWeights;

use super::mips::{generate_mips, MipLevel, MipView};
use super::normals::compute_normals;

/// Компонент ландшафта: высоты, мипы, нормали и веса слоёв
#[derive(Clone, Debug)]
pub struct HeightfieldComponent {
    key: ComponentKey,
    subsection_quads: u32,
    num_subsections: u32,
    heights: Vec<u16>,
    mips: Vec<MipLevel>,
    normals: Vec<[f32; 3]>,
    weights: ComponentWeights,
    min_height: u16,
    max_height: u16,
    version: u64,
}

impl HeightfieldComponent {
    /// Плоский компонент на нулевом уровне
    pub fn new_flat(key: ComponentKey, settings: &CyLandSettings) -> Self {
        let side = settings.component_size_verts();
        let heights = vec![MID_VALUE; (side * side) as usize];
        let mut component = Self::empty(key, settings, heights);
        component.rebuild_derived();
        component.compute_local_normals(settings.draw_scale);
        component
    }

    /// Компонент из готовых высот (row-major, side x side)
    pub fn from_heights(key: ComponentKey, settings: &CyLandSettings, heights: Vec<u16>) -> Result<Self> {
        let side = settings.component_size_verts() as usize;
        if heights.len() != side * side {
            return Err(CyLandError::DataSizeMismatch { expected: side * side, actual: heights.len() });
        }
        let mut component = Self::empty(key, settings, heights);
        component.rebuild_derived();
        component.compute_local_normals(settings.draw_scale);
        Ok(component)
    }

    fn empty(key: ComponentKey, settings: &CyLandSettings, heights: Vec<u16>) -> Self {
        let side = settings.component_size_verts();
        Self {
            key,
            subsection_quads: settings.subsection_size_quads as u32,
            num_subsections: settings.num_subsections as u32,
            heights,
            mips: Vec::new(),
            normals: vec![[0.0, 0.0, 1.0]; (side * side) as usize],
            weights: ComponentWeights::new(side),
            min_height: MID_VALUE,
            max_height: MID_VALUE,
            version: 0,
        }
    }

    #[inline]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    #[inline]
    pub fn size_quads(&self) -> u32 {
        self.subsection_quads * self.num_subsections
    }

    #[inline]
    pub fn size_verts(&self) -> u32 {
        self.size_quads() + 1
    }

    #[inline]
    pub fn subsection_quads(&self) -> u32 {
        self.subsection_quads
    }

    #[inline]
    pub fn num_subsections(&self) -> u32 {
        self.num_subsections
    }

    pub fn grid(&self) -> GridShape {
        GridShape::square(self.size_verts())
    }

    /// Первая глобальная вершина
    #[inline]
    pub fn section_base(&self) -> (i32, i32) {
        self.key.section_base(self.size_quads() as i32)
    }

    #[inline]
    pub fn heights(&self) -> &[u16] {
        &self.heights
    }

    #[inline]
    pub fn height(&self, lx: u32, ly: u32) -> u16 {
        self.heights[(ly * self.size_verts() + lx) as usize]
    }

    #[inline]
    pub(crate) fn set_height(&mut self, lx: u32, ly: u32, height: u16) {
        let side = self.size_verts();
        self.heights[(ly * side + lx) as usize] = height;
    }

    #[inline]
    pub fn weights(&self) -> &ComponentWeights {
        &self.weights
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> &mut ComponentWeights {
        &mut self.weights
    }

    pub(crate) fn set_weights(&mut self, weights: ComponentWeights) -> Result<()> {
        if weights.side() != self.size_verts() {
            return Err(CyLandError::DataSizeMismatch {
                expected: self.size_verts() as usize,
                actual: weights.side() as usize,
            });
        }
        self.weights = weights;
        Ok(())
    }

    #[inline]
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    #[inline]
    pub fn normal(&self, lx: u32, ly: u32) -> [f32; 3] {
        self.normals[(ly * self.size_verts() + lx) as usize]
    }

    pub(crate) fn set_normals(&mut self, normals: Vec<[f32; 3]>) {
        debug_assert_eq!(normals.len(), self.heights.len());
        self.normals = normals;
    }

    /// Нормали только по своим высотам (края - односторонние разности)
    pub fn compute_local_normals(&mut self, draw_scale: [f32; 3]) {
        let normals = compute_normals(self.section_base(), self.size_verts(), &self.heights, draw_scale, |_, _| None);
        self.normals = normals;
    }

    /// Пересобрать мипы и границы после изменения высот
    pub fn rebuild_derived(&mut self) {
        let max_level = (self.subsection_quads + 1).trailing_zeros().saturating_sub(1);
        self.mips = generate_mips(&self.heights, self.subsection_quads, self.num_subsections, max_level);

        let (min, max) = self.heights.iter().fold((u16::MAX, u16::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        self.min_height = min;
        self.max_height = max;
        self.version += 1;
    }

    /// Количество уровней, включая mip 0
    #[inline]
    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32 + 1
    }

    /// Уровень мипа (0 = исходные высоты)
    pub fn mip(&self, level: u32) -> Option<MipView<'_>> {
        if level == 0 {
            return Some(MipView {
                level: 0,
                side: self.size_verts(),
                heights: &self.heights,
                subsection_quads: self.subsection_quads,
                num_subsections: self.num_subsections,
            });
        }
        self.mips.get(level as usize - 1).map(|mip| MipView {
            level,
            side: mip.side,
            heights: &mip.heights,
            subsection_quads: self.subsection_quads,
            num_subsections: self.num_subsections,
        })
    }

    #[inline]
    pub fn height_range(&self) -> (u16, u16) {
        (self.min_height, self.max_height)
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Отметить изменение весов
    #[inline]
    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    /// Локальная высота в дробных координатах вершин
    pub fn sample_local(&self, fx: f32, fy: f32) -> f32 {
        height_to_local(sample_bilinear(&self.heights, self.size_verts(), fx, fy).round() as u16)
    }

    /// Мировые границы компонента
    pub fn world_bounds(&self, draw_scale: [f32; 3]) -> Aabb {
        let (bx, by) = self.section_base();
        let size = self.size_quads() as f32;
        let min = Vec3::new(
            bx as f32 * draw_scale[0],
            by as f32 * draw_scale[1],
            height_to_local(self.min_height) * draw_scale[2],
        );
        let max = Vec3::new(
            (bx as f32 + size) * draw_scale[0],
            (by as f32 + size) * draw_scale[1],
            height_to_local(self.max_height) * draw_scale[2],
        );
        Aabb::new(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> CyLandSettings {
        CyLandSettings {
            subsection_size_quads: 7,
            num_subsections: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_component() {
        let settings = small_settings();
        let component = HeightfieldComponent::new_flat(ComponentKey::new(1, -1), &settings);
        assert_eq!(component.size_verts(), 15);
        assert_eq!(component.mip_count(), 3);
        assert_eq!(component.section_base(), (14, -14));
        assert_eq!(component.height_range(), (MID_VALUE, MID_VALUE));
        let bounds = component.world_bounds(settings.draw_scale);
        assert_eq!(bounds.min.x, 1400.0);
        assert_eq!(bounds.max.y, 0.0);
    }

    #[test]
    fn test_from_heights_rejects_wrong_size() {
        let settings = small_settings();
        let err = HeightfieldComponent::from_heights(ComponentKey::new(0, 0), &settings, vec![0; 10]).unwrap_err();
        assert!(matches!(err, CyLandError::DataSizeMismatch { expected: 225, actual: 10 }));
    }

    #[test]
    fn test_mip_views() {
        let settings = small_settings();
        let heights: Vec<u16> = (0..225).map(|i| MID_VALUE + i as u16).collect();
        let component = HeightfieldComponent::from_heights(ComponentKey::new(0, 0), &settings, heights).unwrap();
        let mip0 = component.mip(0).unwrap();
        assert_eq!(mip0.side, 15);
        let mip2 = component.mip(2).unwrap();
        assert_eq!(mip2.side, 3);
        assert_eq!(mip2.height(2, 2), component.height(14, 14));
        assert_eq!(mip2.height(1, 0), component.height(7, 0));
        assert!(component.mip(3).is_none());
        assert_eq!(component.height_range(), (MID_VALUE, MID_VALUE + 224));
    }
}
