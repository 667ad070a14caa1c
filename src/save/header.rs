// ============================================
// Tile Header - Заголовок файла компонента
// ============================================

use serde::{Deserialize, Serialize};

use crate::core::CyLandSettings;
use crate::terrain::coords::ComponentKey;

/// Магическое число "CYLD" в ASCII
pub const MAGIC_NUMBER: [u8; 4] = *b"CYLD";

/// Версия формата тайла
pub const TILE_VERSION: u32 = 1;

/// Заголовок тайла (фиксированный размер, 24 байта в bincode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileHeader {
    /// Магическое число для валидации
    pub magic: [u8; 4],
    /// Версия формата
    pub version: u32,
    pub key_x: i32,
    pub key_y: i32,
    pub subsection_size_quads: u32,
    pub num_subsections: u32,
}

impl TileHeader {
    pub fn new(key: ComponentKey, subsection_size_quads: u32, num_subsections: u32) -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: TILE_VERSION,
            key_x: key.x,
            key_y: key.y,
            subsection_size_quads,
            num_subsections,
        }
    }

    #[inline]
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.key_x, self.key_y)
    }

    /// Квадов в компоненте по заголовку
    #[inline]
    pub fn component_size_quads(&self) -> u32 {
        self.subsection_size_quads * self.num_subsections
    }

    /// Совпадает ли раскладка тайла с настройками
    pub fn matches(&self, settings: &CyLandSettings) -> bool {
        self.subsection_size_quads as i32 == settings.subsection_size_quads
            && self.num_subsections as i32 == settings.num_subsections
    }
}

impl Default for TileHeader {
    fn default() -> Self {
        Self::new(ComponentKey::default(), 63, 1)
    }
}
