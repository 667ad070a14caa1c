// ============================================
// Settings - Настройки ландшафта из JSON
// ============================================
// Все поля имеют значения по умолчанию, JSON может задавать только часть

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{CyLandError, Result};

/// Настройки стриминга компонентов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Радиус загрузки в компонентах (Chebyshev)
    pub load_radius_components: i32,
    /// Запас перед выгрузкой (гистерезис)
    pub unload_padding_components: i32,
    /// Вертикальный FOV наблюдателя
    pub field_of_view_degrees: f32,
    /// Максимум одновременно загруженных компонентов
    pub max_resident_components: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            load_radius_components: 8,
            unload_padding_components: 2,
            field_of_view_degrees: 90.0,
            max_resident_components: 1024,
        }
    }
}

/// Параметры ландшафта, задаются при создании
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyLandSettings {
    /// Квадов в подсекции, (N + 1) должно быть степенью двойки
    pub subsection_size_quads: i32,
    /// Подсекций по каждой оси (1 или 2)
    pub num_subsections: i32,
    /// Масштаб квада по X/Y и высоты по Z
    pub draw_scale: [f32; 3],
    /// Максимальный LOD, -1 = все доступные
    pub max_lod: i32,
    /// Принудительный LOD, -1 = выключен
    pub forced_lod: i32,
    /// Размер на экране, с которого начинается LOD 0
    pub lod0_screen_size: f32,
    /// Распределение LOD 0 (1.75 - нормальное)
    pub lod0_distribution: f32,
    /// Распределение остальных LOD (2.0 - нормальное)
    pub lod_distribution: f32,
    /// Мип для сложной коллизии
    pub collision_mip_level: i32,
    /// Мип для простой коллизии (если больше collision_mip_level)
    pub simple_collision_mip_level: i32,
    /// Толщина коллизии в единицах мира
    pub collision_thickness: f32,
    /// Лимит слоёв на компонент, 0 = без лимита
    pub max_painted_layers_per_component: usize,
    /// Глубина юбок меша (локальные единицы высоты)
    pub skirt_depth: f32,
    pub streaming: StreamingSettings,
}

impl Default for CyLandSettings {
    fn default() -> Self {
        Self {
            subsection_size_quads: 63,
            num_subsections: 1,
            draw_scale: [100.0, 100.0, 100.0],
            max_lod: -1,
            forced_lod: -1,
            lod0_screen_size: 1.0,
            lod0_distribution: 1.75,
            lod_distribution: 2.0,
            collision_mip_level: 0,
            simple_collision_mip_level: 0,
            collision_thickness: 16.0,
            max_painted_layers_per_component: 0,
            skirt_depth: 8.0,
            streaming: StreamingSettings::default(),
        }
    }
}

impl CyLandSettings {
    /// Квадов в компоненте
    #[inline]
    pub fn component_size_quads(&self) -> i32 {
        self.subsection_size_quads * self.num_subsections
    }

    /// Вершин по стороне компонента (соседи делят крайний ряд)
    #[inline]
    pub fn component_size_verts(&self) -> u32 {
        (self.component_size_quads() + 1) as u32
    }

    /// Максимальный уровень мипа/LOD для подсекции
    pub fn max_lod_level(&self) -> u32 {
        let verts = (self.subsection_size_quads + 1).max(2) as u32;
        verts.trailing_zeros().saturating_sub(1)
    }

    /// Максимальный LOD с учётом ограничения max_lod
    pub fn effective_max_lod(&self) -> u32 {
        let max = self.max_lod_level();
        if self.max_lod < 0 {
            max
        } else {
            (self.max_lod as u32).min(max)
        }
    }

    /// Размер компонента в мире по X/Y
    pub fn component_world_size(&self) -> [f32; 2] {
        let quads = self.component_size_quads() as f32;
        [quads * self.draw_scale[0], quads * self.draw_scale[1]]
    }

    /// Проверка корректности комбинации параметров
    pub fn validate(&self) -> Result<()> {
        let s = self.subsection_size_quads;
        if s < 1 || !((s + 1) as u32).is_power_of_two() {
            return Err(CyLandError::InvalidSettings(format!(
                "subsection_size_quads + 1 must be a power of two, got {}", s
            )));
        }
        if !(1..=2).contains(&self.num_subsections) {
            return Err(CyLandError::InvalidSettings(format!(
                "num_subsections must be 1 or 2, got {}", self.num_subsections
            )));
        }
        if self.draw_scale.iter().any(|v| !(*v > 0.0)) {
            return Err(CyLandError::InvalidSettings("draw_scale must be positive".into()));
        }
        if !(1.0..=10.0).contains(&self.lod0_distribution) || !(1.0..=10.0).contains(&self.lod_distribution) {
            return Err(CyLandError::InvalidSettings("lod distributions must be within 1..10".into()));
        }
        if !(self.lod0_screen_size > 0.0) {
            return Err(CyLandError::InvalidSettings("lod0_screen_size must be positive".into()));
        }
        let max = self.max_lod_level() as i32;
        for (name, mip) in [
            ("collision_mip_level", self.collision_mip_level),
            ("simple_collision_mip_level", self.simple_collision_mip_level),
        ] {
            if mip < 0 || mip > max {
                return Err(CyLandError::InvalidSettings(format!(
                    "{} must be within 0..={}, got {}", name, max, mip
                )));
            }
        }
        if self.forced_lod > max {
            return Err(CyLandError::InvalidSettings(format!("forced_lod must be <= {}", max)));
        }
        if self.collision_thickness < 0.0 || self.skirt_depth < 0.0 {
            return Err(CyLandError::InvalidSettings("thickness and skirt depth must be >= 0".into()));
        }
        let streaming = &self.streaming;
        if streaming.load_radius_components < 0 || streaming.unload_padding_components < 0 {
            return Err(CyLandError::InvalidSettings("streaming radii must be >= 0".into()));
        }
        if !(streaming.field_of_view_degrees > 0.0 && streaming.field_of_view_degrees < 180.0) {
            return Err(CyLandError::InvalidSettings("field_of_view_degrees must be within (0, 180)".into()));
        }
        if streaming.max_resident_components == 0 {
            return Err(CyLandError::InvalidSettings("max_resident_components must be > 0".into()));
        }
        Ok(())
    }

    /// Загрузить настройки из JSON строки
    pub fn load_from_json(json: &str) -> Result<Self> {
        let settings: CyLandSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Загрузить настройки из файла
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::load_from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = CyLandSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.component_size_quads(), 63);
        assert_eq!(settings.component_size_verts(), 64);
        assert_eq!(settings.max_lod_level(), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = CyLandSettings::load_from_json(
            r#"{ "subsection_size_quads": 7, "num_subsections": 2, "streaming": { "load_radius_components": 3 } }"#,
        ).unwrap();
        assert_eq!(settings.component_size_quads(), 14);
        assert_eq!(settings.max_lod_level(), 2);
        assert_eq!(settings.streaming.load_radius_components, 3);
        assert_eq!(settings.streaming.unload_padding_components, 2);
        assert_eq!(settings.draw_scale, [100.0, 100.0, 100.0]);
    }

    #[test]
    fn test_rejects_bad_subsection_size() {
        let err = CyLandSettings::load_from_json(r#"{ "subsection_size_quads": 10 }"#).unwrap_err();
        assert!(matches!(err, CyLandError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_collision_mip_above_max() {
        let mut settings = CyLandSettings::default();
        settings.subsection_size_quads = 7;
        settings.collision_mip_level = 3;
        assert!(settings.validate().is_err());
        settings.collision_mip_level = 2;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_effective_max_lod_clamps() {
        let mut settings = CyLandSettings::default();
        settings.max_lod = 2;
        assert_eq!(settings.effective_max_lod(), 2);
        settings.max_lod = 40;
        assert_eq!(settings.effective_max_lod(), 5);
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyland.json");
        let mut settings = CyLandSettings::default();
        settings.collision_thickness = 4.0;
        fs::write(&path, settings.to_json().unwrap()).unwrap();
        assert_eq!(CyLandSettings::load_from_file(&path).unwrap(), settings);
    }
}
