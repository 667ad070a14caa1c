// ============================================
// Layer Palette - Имена слоёв внутри тайла
// ============================================
// ID слоя зависит от порядка регистрации, поэтому в файле храним имена,
// а веса ссылаются на индекс в палитре

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{CyLandError, Result};
use crate::terrain::layers::{LayerId, LayerRegistry};

/// Палитра слоёв одного тайла
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerPalette {
    /// Индекс = ID в палитре
    names: Vec<String>,
    /// Обратный маппинг: имя -> индекс палитры
    #[serde(skip)]
    reverse_map: HashMap<String, u8>,
}

impl LayerPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Индекс слоя в палитре, добавляет при первом обращении
    pub fn get_or_insert(&mut self, registry: &LayerRegistry, layer: LayerId) -> Result<u8> {
        let name = &registry.require(layer)?.name;
        if let Some(&idx) = self.reverse_map.get(name) {
            return Ok(idx);
        }
        let idx = self.names.len() as u8;
        self.names.push(name.clone());
        self.reverse_map.insert(name.clone(), idx);
        Ok(idx)
    }

    /// Сопоставить палитру с реестром
    pub fn resolve(&self, registry: &LayerRegistry) -> Result<Vec<LayerId>> {
        self.names.iter().map(|name| registry.require_id(name)).collect()
    }

    pub fn name(&self, index: u8) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Индекс палитры -> ID слоя
pub(super) fn lookup(resolved: &[LayerId], index: u8) -> Result<LayerId> {
    resolved.get(index as usize).copied().ok_or_else(|| {
        CyLandError::Deserialize(format!("layer palette index {} out of range", index))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::layers::LayerInfo;

    #[test]
    fn test_palette_resolves_by_name() {
        let mut source = LayerRegistry::new();
        let rock = source.register(LayerInfo::new("rock")).unwrap();
        let grass = source.register(LayerInfo::new("grass")).unwrap();

        let mut palette = LayerPalette::new();
        assert_eq!(palette.get_or_insert(&source, grass).unwrap(), 0);
        assert_eq!(palette.get_or_insert(&source, rock).unwrap(), 1);
        assert_eq!(palette.get_or_insert(&source, grass).unwrap(), 0);
        assert_eq!(palette.name(1), Some("rock"));

        // Другой порядок регистрации
        let mut target = LayerRegistry::new();
        target.register(LayerInfo::new("grass")).unwrap();
        target.register(LayerInfo::new("snow")).unwrap();
        target.register(LayerInfo::new("rock")).unwrap();
        assert_eq!(palette.resolve(&target).unwrap(), vec![LayerId(0), LayerId(2)]);
    }

    #[test]
    fn test_unknown_layer_fails() {
        let mut source = LayerRegistry::new();
        let dirt = source.register(LayerInfo::new("dirt")).unwrap();
        let mut palette = LayerPalette::new();
        palette.get_or_insert(&source, dirt).unwrap();
        let err = palette.resolve(&LayerRegistry::new()).unwrap_err();
        assert!(matches!(err, CyLandError::UnknownLayer(name) if name == "dirt"));
    }
}
