// ============================================
// LOD Selector - Выбор LOD по наблюдателю
// ============================================

use ultraviolet::Vec3;

use crate::terrain::bounds::Aabb;

use super::levels::LodSettings;

/// Доля экрана, которую занимает сфера радиуса radius на расстоянии distance
pub fn screen_size(radius: f32, distance: f32, fov_radians: f32) -> f32 {
    if distance <= radius {
        return 1.0;
    }
    let half_tan = (fov_radians * 0.5).tan();
    (radius / (distance * half_tan)).clamp(0.0, 1.0)
}

/// Позиция и FOV наблюдателя
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerState {
    pub position: Vec3,
    pub fov_radians: f32,
}

impl ViewerState {
    pub fn new(position: Vec3, fov_degrees: f32) -> Self {
        Self {
            position,
            fov_radians: fov_degrees.to_radians(),
        }
    }

    /// Размер на экране для бокса компонента
    pub fn screen_size_of(&self, bounds: &Aabb) -> f32 {
        let distance = (bounds.center() - self.position).mag();
        screen_size(bounds.radius(), distance, self.fov_radians)
    }

    pub fn select_lod(&self, lod: &LodSettings, bounds: &Aabb) -> u32 {
        lod.select_lod(self.screen_size_of(bounds))
    }
}
