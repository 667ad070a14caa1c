use std::sync::Arc;

use crate::core::CyLandSettings;
use crate::terrain::collision::CollisionHeightfield;
use crate::terrain::coords::ComponentKey;
use crate::terrain::lod::ViewerState;
use crate::terrain::mesh::ComponentMesh;

use super::source::TileSource;

/// Запрос на обновление загруженных компонентов
pub(super) struct StreamRequest {
    pub viewer: ViewerState,
    pub changes_version: u64,
    /// Изменённые компоненты с прошлого запроса
    pub edited: Vec<ComponentKey>,
    pub source: Option<Arc<dyn TileSource>>,
    pub settings: Option<CyLandSettings>,
}

/// Данные загруженного компонента
#[derive(Clone, Debug)]
pub struct StreamedComponent {
    pub key: ComponentKey,
    pub lod: u32,
    pub mesh: Arc<ComponentMesh>,
    pub collision: Arc<CollisionHeightfield>,
    /// false если изменился только LOD и коллизия прежняя
    pub collision_rebuilt: bool,
}

/// Результат обработки запроса
#[derive(Clone, Debug, Default)]
pub struct StreamUpdate {
    /// Новые или пересобранные компоненты
    pub loaded: Vec<StreamedComponent>,
    /// Выгруженные компоненты
    pub evicted: Vec<ComponentKey>,
    /// Нужные сейчас компоненты и их LOD
    pub required: Vec<(ComponentKey, u32)>,
    /// Компоненты, которые не удалось загрузить
    pub failed: Vec<ComponentKey>,
    pub changes_version: u64,
}

impl StreamUpdate {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.evicted.is_empty()
    }

    /// Склеить с более поздним обновлением
    pub(super) fn absorb(&mut self, later: StreamUpdate) {
        // Загруженные и тут же выгруженные вызывающий не увидит вовсе
        let transient: Vec<ComponentKey> = self
            .loaded
            .iter()
            .map(|c| c.key)
            .filter(|key| later.evicted.contains(key))
            .collect();
        self.loaded.retain(|c| !later.evicted.contains(&c.key) && !later.loaded.iter().any(|l| l.key == c.key));
        for key in later.evicted {
            if !transient.contains(&key) && !self.evicted.contains(&key) {
                self.evicted.push(key);
            }
        }
        self.evicted.retain(|key| !later.loaded.iter().any(|l| l.key == *key));
        self.loaded.extend(later.loaded);
        self.evicted.sort();
        self.required = later.required;
        self.failed = later.failed;
        self.changes_version = later.changes_version;
    }
}
