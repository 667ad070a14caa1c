// ============================================
// Grass Variety - Параметры растительности
// ============================================

use serde::{Deserialize, Serialize};

use super::random::RandomStream;

/// Предел стороны сетки экземпляров на компонент
pub const MAX_SQRT_INSTANCES: u32 = 4096;

/// Интервал min..max
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatInterval {
    pub min: f32,
    pub max: f32,
}

impl FloatInterval {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    #[inline]
    pub fn interpolate(&self, t: f32) -> f32 {
        self.min + self.size() * t
    }
}

impl Default for FloatInterval {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Как масштабируются экземпляры
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrassScaling {
    /// Один масштаб по всем осям (scale_x)
    #[default]
    Uniform,
    /// Независимо по X, Y, Z
    Free,
    /// X и Y одинаковые, Z отдельно
    LockXY,
}

/// Вид растительности на слое
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassVariety {
    /// Экземпляров на 1000x1000 единиц мира
    pub density: f32,
    pub scaling: GrassScaling,
    pub scale_x: FloatInterval,
    pub scale_y: FloatInterval,
    pub scale_z: FloatInterval,
    pub random_rotation: bool,
    pub align_to_surface: bool,
    /// Смещение в сетке (0..0.99), только для сетки без Хальтона
    pub placement_jitter: f32,
    /// Начальный индекс Хальтона, 0 = сетка с джиттером
    pub halton_base_index: u32,
}

impl Default for GrassVariety {
    fn default() -> Self {
        Self {
            density: 400.0,
            scaling: GrassScaling::Uniform,
            scale_x: FloatInterval::default(),
            scale_y: FloatInterval::default(),
            scale_z: FloatInterval::default(),
            random_rotation: true,
            align_to_surface: true,
            placement_jitter: 1.0,
            halton_base_index: 1,
        }
    }
}

impl GrassVariety {
    /// Нужен ли случайный масштаб
    pub fn has_random_scale(&self) -> bool {
        self.scale_x.size() > 0.0 || self.scale_y.size() > 0.0 || self.scale_z.size() > 0.0
    }

    pub fn random_scale(&self, stream: &mut RandomStream) -> [f32; 3] {
        match self.scaling {
            GrassScaling::Uniform => {
                let s = self.scale_x.interpolate(stream.fraction());
                [s, s, s]
            }
            GrassScaling::Free => {
                let x = self.scale_x.interpolate(stream.fraction());
                let y = self.scale_y.interpolate(stream.fraction());
                let z = self.scale_z.interpolate(stream.fraction());
                [x, y, z]
            }
            GrassScaling::LockXY => {
                let xy = self.scale_x.interpolate(stream.fraction());
                let z = self.scale_z.interpolate(stream.fraction());
                [xy, xy, z]
            }
        }
    }

    /// Корень максимального числа экземпляров на площадь extent
    pub fn sqrt_max_instances(&self, extent_x: f32, extent_y: f32) -> u32 {
        let sqrt = (extent_x * extent_y * self.density / 1000.0 / 1000.0).abs().sqrt().ceil();
        (sqrt as u32).min(MAX_SQRT_INSTANCES)
    }
}
