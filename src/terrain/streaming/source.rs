// ============================================
// Tile Source - Откуда стример берёт компоненты
// ============================================

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::Result;
use crate::terrain::coords::ComponentKey;
use crate::terrain::heightfield::{HeightfieldComponent, HeightfieldStore};
use crate::terrain::layers::LayerId;

/// Источник компонентов для фонового потока
pub trait TileSource: Send + Sync {
    /// Все компоненты, которые можно загрузить
    fn available(&self) -> Vec<ComponentKey>;

    /// Загрузить компонент, Ok(None) если его нет
    fn load(&self, key: ComponentKey) -> Result<Option<Arc<HeightfieldComponent>>>;

    /// Слой видимости для вырезания дыр в меше и коллизии
    fn visibility_layer(&self) -> Option<LayerId> {
        None
    }
}

/// Неизменяемый снимок хранилища в памяти
#[derive(Clone, Debug, Default)]
pub struct StoreSnapshot {
    components: HashMap<ComponentKey, Arc<HeightfieldComponent>>,
    visibility: Option<LayerId>,
    version: u64,
}

impl StoreSnapshot {
    pub fn from_store(store: &HeightfieldStore) -> Self {
        let components = store
            .components()
            .map(|c| (c.key(), Arc::new(c.clone())))
            .collect();
        Self {
            components,
            visibility: store.layers().visibility_layer(),
            version: store.version(),
        }
    }

    /// Версия хранилища на момент снимка
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl TileSource for StoreSnapshot {
    fn available(&self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self.components.keys().copied().collect();
        keys.sort();
        keys
    }

    fn load(&self, key: ComponentKey) -> Result<Option<Arc<HeightfieldComponent>>> {
        Ok(self.components.get(&key).cloned())
    }

    fn visibility_layer(&self) -> Option<LayerId> {
        self.visibility
    }
}
