// ============================================
// Coords - Координаты компонентов и вершин
// ============================================
// Глобальная вершина (gx, gy) живёт в компоненте floor(gx / size),
// а на общем крае ещё и в левом/нижнем соседе

use std::fmt;

use ndshape::{RuntimeShape, Shape};
use serde::{Deserialize, Serialize};

use crate::core::{CyLandError, Result};

/// Нулевой уровень высоты (уровень моря)
pub const MID_VALUE: u16 = 32768;

/// Локальных единиц на шаг u16
pub const ZSCALE: f32 = 1.0 / 128.0;
pub const INV_ZSCALE: f32 = 128.0;

/// u16 высота -> локальная высота
#[inline]
pub fn height_to_local(height: u16) -> f32 {
    (height as f32 - MID_VALUE as f32) * ZSCALE
}

/// Локальная высота -> u16 (с насыщением)
#[inline]
pub fn local_to_height(local: f32) -> u16 {
    (local * INV_ZSCALE + MID_VALUE as f32).round().clamp(0.0, 65535.0) as u16
}

/// Ключ компонента: индекс на сетке компонентов
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    pub x: i32,
    pub y: i32,
}

impl ComponentKey {
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Компонент-владелец глобальной вершины (без учёта общего края)
    #[inline]
    pub fn from_vertex(gx: i32, gy: i32, size_quads: i32) -> Self {
        Self {
            x: gx.div_euclid(size_quads),
            y: gy.div_euclid(size_quads),
        }
    }

    /// Компонент под мировой точкой
    #[inline]
    pub fn from_world(world_x: f32, world_y: f32, size_quads: i32, draw_scale: [f32; 3]) -> Self {
        let gx = (world_x / draw_scale[0]).floor() as i32;
        let gy = (world_y / draw_scale[1]).floor() as i32;
        Self::from_vertex(gx, gy, size_quads)
    }

    /// Первая глобальная вершина компонента
    #[inline]
    pub fn section_base(&self, size_quads: i32) -> (i32, i32) {
        (self.x * size_quads, self.y * size_quads)
    }

    /// Расстояние Chebyshev в компонентах
    #[inline]
    pub fn chebyshev(&self, other: &ComponentKey) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Локальная вершина компонента, None если вершина не его
    #[inline]
    pub fn local_vertex(&self, gx: i32, gy: i32, size_quads: i32) -> Option<(u32, u32)> {
        let (bx, by) = self.section_base(size_quads);
        let (lx, ly) = (gx - bx, gy - by);
        if lx < 0 || ly < 0 || lx > size_quads || ly > size_quads {
            return None;
        }
        Some((lx as u32, ly as u32))
    }

    /// Вершинный прямоугольник, который покрывает компонент
    pub fn vertex_rect(&self, size_quads: i32) -> VertexRect {
        let (bx, by) = self.section_base(size_quads);
        VertexRect::new(bx, by, bx + size_quads, by + size_quads)
    }
}

/// Прямоугольник вершин, границы включительно
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl VertexRect {
    #[inline]
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Ошибка если x2 < x1 или y2 < y1
    pub fn validate(&self) -> Result<()> {
        if self.x2 < self.x1 || self.y2 < self.y1 {
            return Err(CyLandError::OutOfBounds { x1: self.x1, y1: self.y1, x2: self.x2, y2: self.y2 });
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> usize {
        (self.x2 - self.x1 + 1).max(0) as usize
    }

    #[inline]
    pub fn height(&self) -> usize {
        (self.y2 - self.y1 + 1).max(0) as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, gx: i32, gy: i32) -> bool {
        gx >= self.x1 && gx <= self.x2 && gy >= self.y1 && gy <= self.y2
    }

    /// Индекс вершины в row-major буфере прямоугольника
    #[inline]
    pub fn index_of(&self, gx: i32, gy: i32) -> usize {
        (gy - self.y1) as usize * self.width() + (gx - self.x1) as usize
    }

    pub fn intersect(&self, other: &VertexRect) -> Option<VertexRect> {
        let rect = VertexRect::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        if rect.x2 < rect.x1 || rect.y2 < rect.y1 { None } else { Some(rect) }
    }

    /// Все компоненты, чьи вершины пересекают прямоугольник (включая соседей по общему краю)
    pub fn components(&self, size_quads: i32) -> Vec<ComponentKey> {
        let kx1 = (self.x1 - 1).div_euclid(size_quads);
        let ky1 = (self.y1 - 1).div_euclid(size_quads);
        let kx2 = self.x2.div_euclid(size_quads);
        let ky2 = self.y2.div_euclid(size_quads);

        let mut keys = Vec::with_capacity(((kx2 - kx1 + 1) * (ky2 - ky1 + 1)).max(0) as usize);
        for ky in ky1..=ky2 {
            for kx in kx1..=kx2 {
                keys.push(ComponentKey::new(kx, ky));
            }
        }
        keys
    }

    /// Компоненты, которые нужно создать, чтобы покрыть прямоугольник
    /// (без соседей, которым достался бы только общий край)
    pub fn owning_components(&self, size_quads: i32) -> Vec<ComponentKey> {
        let kx1 = self.x1.div_euclid(size_quads);
        let ky1 = self.y1.div_euclid(size_quads);
        let kx2 = (self.x2 - 1).div_euclid(size_quads).max(kx1);
        let ky2 = (self.y2 - 1).div_euclid(size_quads).max(ky1);

        let mut keys = Vec::new();
        for ky in ky1..=ky2 {
            for kx in kx1..=kx2 {
                keys.push(ComponentKey::new(kx, ky));
            }
        }
        keys
    }

    /// Итератор по вершинам (row-major)
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.y1..=self.y2).flat_map(move |y| (self.x1..=self.x2).map(move |x| (x, y)))
    }
}

/// Мировая точка -> дробная глобальная вершина
#[inline]
pub fn world_to_vertex(world_x: f32, world_y: f32, draw_scale: [f32; 3]) -> (f32, f32) {
    (world_x / draw_scale[0], world_y / draw_scale[1])
}

/// Квадратная сетка (side x side), x - быстрый индекс
#[derive(Clone)]
pub struct GridShape {
    shape: RuntimeShape<u32, 2>,
    side: u32,
}

// RuntimeShape без Debug
impl fmt::Debug for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridShape").field("side", &self.side).finish()
    }
}

impl GridShape {
    pub fn square(side: u32) -> Self {
        Self {
            shape: RuntimeShape::<u32, 2>::new([side, side]),
            side,
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shape.size() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        self.shape.linearize([x, y]) as usize
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let [x, y] = self.shape.delinearize(index as u32);
        (x, y)
    }
}

/// Билинейная выборка из квадратной сетки u16
pub fn sample_bilinear(values: &[u16], side: u32, fx: f32, fy: f32) -> f32 {
    let max = (side - 1) as f32;
    let fx = fx.clamp(0.0, max);
    let fy = fy.clamp(0.0, max);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(side - 1);
    let y1 = (y0 + 1).min(side - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let at = |x: u32, y: u32| values[(y * side + x) as usize] as f32;
    let top = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * tx;
    let bottom = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * tx;
    top + (bottom - top) * ty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_encoding() {
        assert_eq!(height_to_local(MID_VALUE), 0.0);
        assert_eq!(height_to_local(MID_VALUE + 128), 1.0);
        assert_eq!(local_to_height(-1.0), MID_VALUE - 128);
        assert_eq!(local_to_height(1.0e9), u16::MAX);
        assert_eq!(local_to_height(-1.0e9), 0);
    }

    #[test]
    fn test_component_of_negative_vertex() {
        assert_eq!(ComponentKey::from_vertex(-1, 0, 63), ComponentKey::new(-1, 0));
        assert_eq!(ComponentKey::from_vertex(63, 62, 63), ComponentKey::new(1, 0));
    }

    #[test]
    fn test_rect_components_include_shared_edges() {
        // Вершина 63 принадлежит компонентам 0 и 1
        let rect = VertexRect::new(63, 10, 63, 10);
        let keys = rect.components(63);
        assert_eq!(keys, vec![ComponentKey::new(0, 0), ComponentKey::new(1, 0)]);

        let rect = VertexRect::new(0, 0, 0, 0);
        assert_eq!(rect.components(63).len(), 4);
    }

    #[test]
    fn test_owning_components_skip_edge_only_neighbours() {
        let rect = VertexRect::new(0, 0, 63, 63);
        assert_eq!(rect.owning_components(63), vec![ComponentKey::new(0, 0)]);
        let rect = VertexRect::new(0, 0, 64, 10);
        assert_eq!(rect.owning_components(63).len(), 2);
        assert_eq!(ComponentKey::new(1, 0).local_vertex(63, 5, 63), Some((0, 5)));
        assert_eq!(ComponentKey::new(1, 0).local_vertex(62, 5, 63), None);
    }

    #[test]
    fn test_rect_intersect_and_index() {
        let a = VertexRect::new(0, 0, 10, 10);
        let b = VertexRect::new(5, 8, 20, 20);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i, VertexRect::new(5, 8, 10, 10));
        assert_eq!(i.len(), 18);
        assert_eq!(i.index_of(6, 9), 7);
        assert!(a.intersect(&VertexRect::new(11, 0, 12, 1)).is_none());
        assert!(VertexRect::new(3, 0, 2, 0).validate().is_err());
    }

    #[test]
    fn test_grid_shape_matches_row_major() {
        let grid = GridShape::square(5);
        assert_eq!(grid.len(), 25);
        assert_eq!(grid.index(3, 2), 13);
        assert_eq!(grid.coords(13), (3, 2));
        assert_eq!(format!("{:?}", grid), "GridShape { side: 5 }");
    }

    #[test]
    fn test_bilinear_sample() {
        let values = [0u16, 100, 200, 300];
        assert_eq!(sample_bilinear(&values, 2, 0.5, 0.0), 50.0);
        assert_eq!(sample_bilinear(&values, 2, 0.5, 0.5), 150.0);
        assert_eq!(sample_bilinear(&values, 2, 5.0, 5.0), 300.0);
    }
}
