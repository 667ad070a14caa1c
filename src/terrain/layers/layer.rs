// ============================================
// Layer Registry - Слои покраски из JSON
// ============================================
// Числовой ID слоя = порядок регистрации, 255 зарезервирован под "нет слоя"

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{CyLandError, Result};

/// Числовой ID слоя
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u8);

impl LayerId {
    /// Маркер "нет слоя" в картах доминантных слоёв
    pub const NONE: u8 = 255;
}

/// Служебный слой видимости: покрашенные вершины становятся дырами
pub const VISIBILITY_LAYER_NAME: &str = "DataLayer__";

/// Вес видимости, начиная с которого вершина считается дырой
pub const HOLE_THRESHOLD: u8 = 128;

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn default_hardness() -> f32 {
    0.5
}

/// Описание слоя
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    /// Сопротивление эрозии/сглаживанию (0..1)
    #[serde(default = "default_hardness")]
    pub hardness: f32,
    /// Слой не участвует в нормализации весов
    #[serde(default)]
    pub no_weight_blend: bool,
    #[serde(default)]
    pub physical_material: Option<String>,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardness: default_hardness(),
            no_weight_blend: false,
            physical_material: None,
        }
    }

    pub fn non_blended(mut self) -> Self {
        self.no_weight_blend = true;
        self
    }

    /// Слой видимости (дыры), вне нормализации
    pub fn visibility() -> Self {
        Self::new(VISIBILITY_LAYER_NAME).non_blended()
    }

    pub fn with_physical_material(mut self, material: impl Into<String>) -> Self {
        self.physical_material = Some(material.into());
        self
    }
}

/// Формат JSON файла слоёв
#[derive(Debug, Serialize, Deserialize)]
pub struct LayersFile {
    pub layers: Vec<LayerInfo>,
}

/// Реестр слоёв ландшафта
#[derive(Clone, Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<LayerInfo>,
    by_name: HashMap<String, LayerId>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Зарегистрировать слой
    pub fn register(&mut self, info: LayerInfo) -> Result<LayerId> {
        if self.by_name.contains_key(&info.name) {
            return Err(CyLandError::DuplicateLayer(info.name));
        }
        if self.layers.len() >= LayerId::NONE as usize {
            return Err(CyLandError::InvalidSettings(format!(
                "at most {} layers are supported", LayerId::NONE
            )));
        }
        let id = LayerId(self.layers.len() as u8);
        self.by_name.insert(info.name.clone(), id);
        self.layers.push(info);
        Ok(id)
    }

    /// Загрузить слои из JSON строки
    pub fn load_from_json(&mut self, json: &str) -> Result<usize> {
        let file: LayersFile = serde_json::from_str(json)?;
        let count = file.layers.len();
        for layer in file.layers {
            self.register(layer)?;
        }
        Ok(count)
    }

    /// Загрузить слои из файла
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let content = fs::read_to_string(path.as_ref())?;
        self.load_from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = LayersFile { layers: self.layers.clone() };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    #[inline]
    pub fn get(&self, id: LayerId) -> Option<&LayerInfo> {
        self.layers.get(id.0 as usize)
    }

    /// Описание слоя или UnknownLayer
    pub fn require(&self, id: LayerId) -> Result<&LayerInfo> {
        self.get(id).ok_or_else(|| CyLandError::UnknownLayer(id.to_string()))
    }

    #[inline]
    pub fn id_of(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    /// ID по имени или UnknownLayer
    pub fn require_id(&self, name: &str) -> Result<LayerId> {
        self.id_of(name).ok_or_else(|| CyLandError::UnknownLayer(name.to_string()))
    }

    /// ID слоя видимости, если он зарегистрирован
    #[inline]
    pub fn visibility_layer(&self) -> Option<LayerId> {
        self.id_of(VISIBILITY_LAYER_NAME)
    }

    /// Зарегистрировать слой видимости при первом обращении
    pub fn ensure_visibility_layer(&mut self) -> Result<LayerId> {
        match self.visibility_layer() {
            Some(id) => Ok(id),
            None => self.register(LayerInfo::visibility()),
        }
    }

    /// Участвует ли слой в нормализации
    pub fn is_weight_blended(&self, id: LayerId) -> bool {
        self.get(id).map_or(false, |info| !info.no_weight_blend)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &LayerInfo)> {
        self.layers.iter().enumerate().map(|(i, info)| (LayerId(i as u8), info))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
