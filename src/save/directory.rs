// ============================================
// Tile Directory - Ландшафт как папка тайлов
// ============================================
// layers.json + tile_{x}_{y}.cyt на каждый компонент

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::{CyLandSettings, Result};
use crate::terrain::coords::ComponentKey;
use crate::terrain::heightfield::{HeightfieldComponent, HeightfieldStore};
use crate::terrain::layers::{LayerId, LayerRegistry};
use crate::terrain::streaming::TileSource;

use super::tile_file::{load_tile, save_tile};

/// Имя файла реестра слоёв
pub const LAYERS_FILE: &str = "layers.json";

const TILE_PREFIX: &str = "tile_";
const TILE_EXTENSION: &str = ".cyt";

/// Имя файла тайла для компонента
pub fn tile_file_name(key: ComponentKey) -> String {
    format!("{}{}_{}{}", TILE_PREFIX, key.x, key.y, TILE_EXTENSION)
}

/// Разобрать имя файла тайла обратно в ключ
pub fn parse_tile_file_name(name: &str) -> Option<ComponentKey> {
    let coords = name.strip_prefix(TILE_PREFIX)?.strip_suffix(TILE_EXTENSION)?;
    let (x, y) = coords.split_once('_')?;
    Some(ComponentKey::new(x.parse().ok()?, y.parse().ok()?))
}

/// Ключи всех тайлов в папке, отсортированные
fn scan_tiles(dir: &Path) -> Result<Vec<ComponentKey>> {
    let mut keys = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(key) = entry.file_name().to_str().and_then(parse_tile_file_name) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}

/// Реестр слоёв из папки, пустой если файла нет
fn read_layers(dir: &Path) -> Result<LayerRegistry> {
    let mut registry = LayerRegistry::new();
    let path = dir.join(LAYERS_FILE);
    if path.exists() {
        registry.load_from_file(&path)?;
    }
    Ok(registry)
}

/// Сохранить все компоненты и реестр слоёв, вернуть число тайлов
pub fn save_store(dir: impl AsRef<Path>, store: &HeightfieldStore) -> Result<usize> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    fs::write(dir.join(LAYERS_FILE), store.layers().to_json()?)?;

    let components: Vec<&HeightfieldComponent> = store.components().collect();
    let registry = store.layers();
    components
        .par_iter()
        .try_for_each(|component| save_tile(dir.join(tile_file_name(component.key())), component, registry))?;

    log::info!("Saved {} tiles to {}", components.len(), dir.display());
    Ok(components.len())
}

/// Загрузить папку тайлов в новое хранилище.
/// Повреждённые тайлы пропускаются с предупреждением.
pub fn load_store(dir: impl AsRef<Path>, settings: CyLandSettings) -> Result<HeightfieldStore> {
    let dir = dir.as_ref();
    let registry = read_layers(dir)?;
    let keys = scan_tiles(dir)?;

    let loaded: Vec<(ComponentKey, Result<HeightfieldComponent>)> = keys
        .par_iter()
        .map(|&key| (key, load_tile(dir.join(tile_file_name(key)), &settings, &registry)))
        .collect();

    let mut store = HeightfieldStore::with_layers(settings, registry)?;
    let mut skipped = 0;
    for (key, result) in loaded {
        match result.and_then(|component| store.insert_component(component)) {
            Ok(_) => {}
            Err(e) => {
                log::warn!("Skipping tile ({}, {}): {}", key.x, key.y, e);
                skipped += 1;
            }
        }
    }
    store.take_dirty();

    log::info!("Loaded {} tiles from {} ({} skipped)", store.len(), dir.display(), skipped);
    Ok(store)
}

/// Папка тайлов как источник для стриминга
#[derive(Debug)]
pub struct TileDirectory {
    dir: PathBuf,
    settings: CyLandSettings,
    registry: LayerRegistry,
    keys: Vec<ComponentKey>,
}

impl TileDirectory {
    pub fn open(dir: impl Into<PathBuf>, settings: CyLandSettings) -> Result<Self> {
        let dir = dir.into();
        settings.validate()?;
        let registry = read_layers(&dir)?;
        let keys = scan_tiles(&dir)?;
        log::info!("Opened tile directory {} with {} tiles", dir.display(), keys.len());
        Ok(Self { dir, settings, registry, keys })
    }

    /// Перечитать список тайлов и слоёв
    pub fn refresh(&mut self) -> Result<usize> {
        self.registry = read_layers(&self.dir)?;
        self.keys = scan_tiles(&self.dir)?;
        Ok(self.keys.len())
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn layers(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn tile_path(&self, key: ComponentKey) -> PathBuf {
        self.dir.join(tile_file_name(key))
    }
}

impl TileSource for TileDirectory {
    fn available(&self) -> Vec<ComponentKey> {
        self.keys.clone()
    }

    fn load(&self, key: ComponentKey) -> Result<Option<Arc<HeightfieldComponent>>> {
        if self.keys.binary_search(&key).is_err() {
            return Ok(None);
        }
        let component = load_tile(self.tile_path(key), &self.settings, &self.registry)?;
        Ok(Some(Arc::new(component)))
    }

    fn visibility_layer(&self) -> Option<LayerId> {
        self.registry.visibility_layer()
    }
}
