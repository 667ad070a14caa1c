// ============================================
// Collision Heightfield - Коллизия компонента
// ============================================
// Сетка высот на collision_mip_level + доминантный слой на вершину
// и маска дыр на квад. Для rapier: X -> X, Y ландшафта -> Z,
// высота -> Y (rapier Y-up)

use rapier3d::prelude::{
    Collider, ColliderBuilder, DMatrix, HeightField, HeightFieldCellStatus, SharedShape, Vector,
};
use ultraviolet::Vec3;

use crate::terrain::bounds::Aabb;
use crate::terrain::coords::{height_to_local, sample_bilinear, ComponentKey};
use crate::terrain::layers::{LayerId, LayerRegistry};

/// Упрощённая коллизия на более грубом мипе
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleCollision {
    pub mip_level: u32,
    pub size_quads: u32,
    pub heights: Vec<u16>,
}

/// Коллизия компонента
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionHeightfield {
    pub key: ComponentKey,
    pub mip_level: u32,
    /// Квадов по стороне
    pub size_quads: u32,
    pub heights: Vec<u16>,
    /// Доминантный слой вершины, 255 = нет слоя
    pub dominant_layers: Vec<u8>,
    /// Дыры по квадам (size_quads x size_quads)
    pub holes: Vec<bool>,
    pub simple: Option<SimpleCollision>,
    pub thickness: f32,
    /// Мировой размер компонента по X/Y
    pub world_size: [f32; 2],
    /// Мировая позиция первой вершины
    pub origin: [f32; 2],
    pub height_scale: f32,
}

impl CollisionHeightfield {
    #[inline]
    pub fn side(&self) -> u32 {
        self.size_quads + 1
    }

    #[inline]
    pub fn height(&self, x: u32, y: u32) -> u16 {
        self.heights[(y * self.side() + x) as usize]
    }

    /// Доминантный слой вершины
    pub fn dominant_layer(&self, x: u32, y: u32) -> Option<LayerId> {
        let id = self.dominant_layers[(y * self.side() + x) as usize];
        (id != LayerId::NONE).then_some(LayerId(id))
    }

    /// Квад вырезан слоем видимости
    #[inline]
    pub fn is_hole(&self, qx: u32, qy: u32) -> bool {
        self.holes.get((qy * self.size_quads + qx) as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn hole_count(&self) -> usize {
        self.holes.iter().filter(|&&h| h).count()
    }

    /// Физический материал ближайшей вершины
    pub fn physical_material<'a>(&self, registry: &'a LayerRegistry, x: u32, y: u32) -> Option<&'a str> {
        let layer = self.dominant_layer(x, y)?;
        registry.get(layer)?.physical_material.as_deref()
    }

    /// Мировая высота в координатах сетки коллизии (билинейно), None в дыре
    pub fn height_at_local(&self, x: f32, y: f32) -> Option<f32> {
        let max = self.size_quads as f32;
        if !(0.0..=max).contains(&x) || !(0.0..=max).contains(&y) {
            return None;
        }
        let last = self.size_quads.saturating_sub(1);
        if self.is_hole((x.floor() as u32).min(last), (y.floor() as u32).min(last)) {
            return None;
        }
        let raw = sample_bilinear(&self.heights, self.side(), x, y);
        Some(height_to_local(raw.round() as u16) * self.height_scale)
    }

    /// Мировая точка -> координаты сетки
    #[inline]
    fn world_to_grid(&self, world_x: f32, world_y: f32) -> (f32, f32) {
        let q = self.size_quads as f32;
        (
            (world_x - self.origin[0]) / self.world_size[0] * q,
            (world_y - self.origin[1]) / self.world_size[1] * q,
        )
    }

    pub fn height_at_world(&self, world_x: f32, world_y: f32) -> Option<f32> {
        let (x, y) = self.world_to_grid(world_x, world_y);
        self.height_at_local(x, y)
    }

    /// Луч сверху вниз: точка попадания на поверхность
    pub fn raycast_down(&self, world_x: f32, world_y: f32) -> Option<Vec3> {
        self.height_at_world(world_x, world_y).map(|z| Vec3::new(world_x, world_y, z))
    }

    pub fn world_bounds(&self) -> Aabb {
        let (lo, hi) = self.heights.iter().fold((u16::MAX, 0u16), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        Aabb::new(
            Vec3::new(self.origin[0], self.origin[1], height_to_local(lo) * self.height_scale - self.thickness),
            Vec3::new(
                self.origin[0] + self.world_size[0],
                self.origin[1] + self.world_size[1],
                height_to_local(hi) * self.height_scale,
            ),
        )
    }

    /// Коллайдер rapier3d (Y-up), центр в середине компонента.
    /// Дыры становятся удалёнными ячейками
    pub fn to_rapier_collider(&self) -> Collider {
        let side = self.side() as usize;
        // Строки - ось Z rapier (Y ландшафта), столбцы - ось X
        let heights = DMatrix::from_fn(side, side, |row, col| {
            height_to_local(self.heights[row * side + col]) * self.height_scale
        });
        let scale = Vector::new(self.world_size[0], 1.0, self.world_size[1]);
        let center = Vector::new(
            self.origin[0] + self.world_size[0] * 0.5,
            0.0,
            self.origin[1] + self.world_size[1] * 0.5,
        );

        let mut heightfield = HeightField::new(heights, scale);
        for qy in 0..self.size_quads {
            for qx in 0..self.size_quads {
                if self.is_hole(qx, qy) {
                    heightfield.set_cell_status(qy as usize, qx as usize, HeightFieldCellStatus::CELL_REMOVED);
                }
            }
        }
        ColliderBuilder::new(SharedShape::new(heightfield))
            .translation(center)
            .build()
    }
}
