use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::CyLandSettings;
use crate::terrain::collision::{build_collision, CollisionHeightfield};
use crate::terrain::coords::ComponentKey;
use crate::terrain::heightfield::HeightfieldComponent;
use crate::terrain::lod::{LodSettings, ViewerState};
use crate::terrain::mesh::{build_component_mesh, ComponentMesh};

use super::planner::StreamingPlanner;
use super::source::TileSource;
use super::types::{StreamRequest, StreamUpdate, StreamedComponent};

/// Загруженный компонент с готовыми данными
struct ResidentComponent {
    component: Arc<HeightfieldComponent>,
    lod: u32,
    mesh: Arc<ComponentMesh>,
    collision: Arc<CollisionHeightfield>,
}

/// Что нужно собрать для компонента
enum BuildJob {
    /// Новые данные: меш и коллизия
    Full(Arc<HeightfieldComponent>, u32),
    /// Сменился только LOD
    MeshOnly(Arc<HeightfieldComponent>, u32, Arc<CollisionHeightfield>),
}

/// Фоновый стример с кэшем загруженных компонентов
pub(super) struct StreamingWorker {
    source: Arc<dyn TileSource>,
    settings: CyLandSettings,
    lod: LodSettings,
    planner: StreamingPlanner,
    resident: HashMap<ComponentKey, ResidentComponent>,
    changes_version: u64,
}

impl StreamingWorker {
    pub fn new(source: Arc<dyn TileSource>, settings: CyLandSettings) -> Self {
        Self {
            source,
            lod: LodSettings::from_settings(&settings),
            planner: StreamingPlanner::new(&settings),
            settings,
            resident: HashMap::new(),
            changes_version: 0,
        }
    }

    fn apply_settings(&mut self, settings: CyLandSettings) {
        let geometry_changed = settings.component_size_quads() != self.settings.component_size_quads()
            || settings.draw_scale != self.settings.draw_scale
            || settings.collision_mip_level != self.settings.collision_mip_level
            || settings.simple_collision_mip_level != self.settings.simple_collision_mip_level
            || settings.collision_thickness != self.settings.collision_thickness
            || settings.skirt_depth != self.settings.skirt_depth;

        self.lod = LodSettings::from_settings(&settings);
        self.planner = StreamingPlanner::new(&settings);
        self.settings = settings;
        if geometry_changed {
            // Всё пересобирается при следующем проходе
            self.resident.clear();
        }
    }

    pub fn process(&mut self, request: StreamRequest) -> StreamUpdate {
        let before: HashSet<ComponentKey> = self.resident.keys().copied().collect();

        if let Some(settings) = request.settings {
            self.apply_settings(settings);
        }
        if let Some(source) = request.source {
            self.source = source;
        }
        let edited: HashSet<ComponentKey> = request.edited.into_iter().collect();
        self.changes_version = request.changes_version;

        let available = self.source.available();
        let available_set: HashSet<ComponentKey> = available.iter().copied().collect();
        let center = self.planner.viewer_key(&request.viewer);
        let required = self.planner.required(center, &available);

        // Загрузка новых и изменённых компонентов
        let to_load: Vec<ComponentKey> = required
            .iter()
            .copied()
            .filter(|key| edited.contains(key) || !self.resident.contains_key(key))
            .collect();
        let source = &self.source;
        let loaded: Vec<(ComponentKey, crate::core::Result<Option<Arc<HeightfieldComponent>>>)> = to_load
            .par_iter()
            .map(|key| (*key, source.load(*key)))
            .collect();

        let mut failed = Vec::new();
        let mut fresh: HashMap<ComponentKey, Arc<HeightfieldComponent>> = HashMap::new();
        for (key, result) in loaded {
            match result {
                Ok(Some(component)) => {
                    fresh.insert(key, component);
                }
                Ok(None) => {
                    log::debug!("Component ({}, {}) disappeared from source", key.x, key.y);
                }
                Err(e) => {
                    log::warn!("Failed to load component ({}, {}): {}", key.x, key.y, e);
                    failed.push(key);
                }
            }
        }

        // Изменённые, но не нужные сейчас - выбрасываем, чтобы не держать старые данные
        for key in &edited {
            if !fresh.contains_key(key) {
                self.resident.remove(key);
            }
        }

        let jobs = self.collect_jobs(&request.viewer, &required, fresh);
        let built = self.build_parallel(jobs);

        let mut loaded_components = Vec::with_capacity(built.len());
        for (entry, collision_rebuilt) in built {
            loaded_components.push(StreamedComponent {
                key: entry.component.key(),
                lod: entry.lod,
                mesh: entry.mesh.clone(),
                collision: entry.collision.clone(),
                collision_rebuilt,
            });
            self.resident.insert(entry.component.key(), entry);
        }

        self.evict(center, &required, &available_set);

        let mut evicted: Vec<ComponentKey> = before
            .into_iter()
            .filter(|key| !self.resident.contains_key(key))
            .collect();
        evicted.sort();

        let required_lods = required
            .iter()
            .filter_map(|key| self.resident.get(key).map(|r| (*key, r.lod)))
            .collect();

        if !loaded_components.is_empty() || !evicted.is_empty() {
            log::debug!(
                "Streaming at ({}, {}): {} built, {} evicted, {} resident",
                center.x, center.y, loaded_components.len(), evicted.len(), self.resident.len()
            );
        }

        StreamUpdate {
            loaded: loaded_components,
            evicted,
            required: required_lods,
            failed,
            changes_version: self.changes_version,
        }
    }

    fn collect_jobs(
        &self,
        viewer: &ViewerState,
        required: &[ComponentKey],
        mut fresh: HashMap<ComponentKey, Arc<HeightfieldComponent>>,
    ) -> Vec<BuildJob> {
        let draw_scale = self.settings.draw_scale;
        let mut jobs = Vec::new();
        for key in required {
            if let Some(component) = fresh.remove(key) {
                let lod = viewer.select_lod(&self.lod, &component.world_bounds(draw_scale));
                jobs.push(BuildJob::Full(component, lod));
            } else if let Some(resident) = self.resident.get(key) {
                let lod = viewer.select_lod(&self.lod, &resident.component.world_bounds(draw_scale));
                if lod != resident.lod {
                    jobs.push(BuildJob::MeshOnly(resident.component.clone(), lod, resident.collision.clone()));
                }
            }
        }
        jobs
    }

    fn build_parallel(&self, jobs: Vec<BuildJob>) -> Vec<(ResidentComponent, bool)> {
        let settings = &self.settings;
        let visibility = self.source.visibility_layer();
        jobs.into_par_iter()
            .map(|job| match job {
                BuildJob::Full(component, lod) => {
                    let mesh = Arc::new(build_component_mesh(&component, lod, settings, visibility));
                    let collision = Arc::new(build_collision(&component, settings, visibility));
                    (ResidentComponent { component, lod: mesh.lod, mesh, collision }, true)
                }
                BuildJob::MeshOnly(component, lod, collision) => {
                    let mesh = Arc::new(build_component_mesh(&component, lod, settings, visibility));
                    (ResidentComponent { component, lod: mesh.lod, mesh, collision }, false)
                }
            })
            .collect()
    }

    /// Выгрузка за радиусом, пропавших из источника и сверх лимита
    fn evict(&mut self, center: ComponentKey, required: &[ComponentKey], available: &HashSet<ComponentKey>) {
        let planner = &self.planner;
        self.resident
            .retain(|key, _| available.contains(key) && !planner.should_evict(center, *key));

        let resident: Vec<ComponentKey> = self.resident.keys().copied().collect();
        for key in self.planner.over_capacity(center, &resident, required) {
            self.resident.remove(&key);
        }
    }

    #[cfg(test)]
    pub fn resident_len(&self) -> usize {
        self.resident.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::heightfield::HeightfieldStore;
    use crate::terrain::streaming::StoreSnapshot;
    use ultraviolet::Vec3;

    fn settings() -> CyLandSettings {
        let mut settings = CyLandSettings {
            subsection_size_quads: 7,
            num_subsections: 1,
            ..Default::default()
        };
        settings.streaming.load_radius_components = 1;
        settings.streaming.unload_padding_components = 1;
        settings
    }

    fn worker() -> StreamingWorker {
        let mut store = HeightfieldStore::new(settings()).unwrap();
        store.create_rect(ComponentKey::new(0, 0), ComponentKey::new(9, 0));
        StreamingWorker::new(Arc::new(StoreSnapshot::from_store(&store)), settings())
    }

    fn request(x: f32) -> StreamRequest {
        StreamRequest {
            viewer: ViewerState::new(Vec3::new(x, 350.0, 100.0), 90.0),
            changes_version: 0,
            edited: Vec::new(),
            source: None,
            settings: None,
        }
    }

    #[test]
    fn test_loads_within_radius_and_evicts_beyond_padding() {
        let mut worker = worker();
        // Компонент 7 квадов * 100 = 700 единиц
        let update = worker.process(request(350.0));
        assert_eq!(update.loaded.len(), 2);
        assert!(update.loaded.iter().all(|c| c.collision_rebuilt));
        assert_eq!(update.required.len(), 2);

        // Центр в компоненте 3: нужны 2..=4, компонент 1 в запасе, 0 выгружен
        let update = worker.process(request(3.0 * 700.0 + 350.0));
        assert_eq!(update.evicted, vec![ComponentKey::new(0, 0)]);
        assert_eq!(worker.resident_len(), 4);
        let keys: HashSet<ComponentKey> = update.loaded.iter().map(|c| c.key).collect();
        assert!(keys.contains(&ComponentKey::new(2, 0)) && keys.contains(&ComponentKey::new(4, 0)));
    }

    #[test]
    fn test_second_pass_is_empty() {
        let mut worker = worker();
        worker.process(request(350.0));
        let update = worker.process(request(350.0));
        assert!(update.is_empty());
    }

    #[test]
    fn test_edited_component_is_rebuilt() {
        let mut worker = worker();
        worker.process(request(350.0));
        let mut req = request(350.0);
        req.edited = vec![ComponentKey::new(1, 0)];
        let update = worker.process(req);
        assert_eq!(update.loaded.len(), 1);
        assert_eq!(update.loaded[0].key, ComponentKey::new(1, 0));
        assert!(update.loaded[0].collision_rebuilt);
    }
}
