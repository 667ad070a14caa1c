// ============================================
// CyLand Demo - Генерация, покраска, стриминг, сохранение
// ============================================

use std::path::PathBuf;
use std::sync::Arc;

use ultraviolet::Vec3;

use cyland::manifest::{cyland_module, editor_target};
use cyland::save::{save_store, TileDirectory};
use cyland::terrain::grass::{build_grass_for_store, GrassVariety};
use cyland::terrain::{build_collision_all, ComponentKey, ProceduralTerrain, VertexRect};
use cyland::{
    CyLandSettings, HeightfieldStore, LayerRegistry, PaintingRestriction, Result, StoreSnapshot,
    StreamingManager, ViewerState,
};

const USAGE: &str = "usage: cyland [demo [settings.json] [out_dir] | manifest]";

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("demo") => run_demo(args.get(1).map(PathBuf::from), args.get(2).map(PathBuf::from)),
        Some("manifest") => print_manifest(),
        Some(other) => {
            eprintln!("unknown command '{}'\n{}", other, USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn print_manifest() -> Result<()> {
    println!("{}", cyland_module().to_json()?);
    println!("{}", editor_target().to_json()?);
    Ok(())
}

fn default_layers() -> LayerRegistry {
    let mut registry = LayerRegistry::new();
    if let Err(e) = registry.load_from_json(include_str!("../assets/layers/default_layers.json")) {
        log::warn!("Failed to load default layers: {}", e);
    }
    registry
}

fn run_demo(settings_path: Option<PathBuf>, out_dir: Option<PathBuf>) -> Result<()> {
    let settings = match settings_path {
        Some(path) => CyLandSettings::load_from_file(path)?,
        None => CyLandSettings::default(),
    };

    // 1. Генерация 4x4 компонентов
    let mut store = HeightfieldStore::with_layers(settings.clone(), default_layers())?;
    let terrain = ProceduralTerrain::default();
    terrain.populate_components(&mut store, ComponentKey::new(-2, -2), ComponentKey::new(1, 1))?;

    // 2. Покраска: трава везде, камень выше нуля
    let bounds = store.bounds().ok_or_else(|| cyland::CyLandError::InvalidSettings("empty landscape".into()))?;
    let grass = store.layers().require_id("grass")?;
    let rock = store.layers().require_id("rock")?;
    store.set_alpha_data(grass, bounds, &vec![255; bounds.len()], PaintingRestriction::None, true)?;
    let heights = store.get_height_data(bounds)?;
    let rock_mask: Vec<u8> = heights
        .iter()
        .map(|&h| if h > cyland::terrain::MID_VALUE { 180 } else { 0 })
        .collect();
    store.set_alpha_data(rock, bounds, &rock_mask, PaintingRestriction::None, true)?;

    // Колодец: дыра в меше и коллизии
    let hole = store.layers_mut().ensure_visibility_layer()?;
    let well = VertexRect::new(20, 20, 22, 22);
    store.set_alpha_data(hole, well, &vec![255; well.len()], PaintingRestriction::None, true)?;
    store.take_dirty();

    // 3. Коллизии и растительность
    let collisions = build_collision_all(&store);
    let ground_hit = collisions.iter().find_map(|c| c.raycast_down(0.0, 0.0));
    let holes: usize = collisions.iter().map(|c| c.hole_count()).sum();
    println!("Collision heightfields: {}, hole quads: {}, ground at origin: {:?}", collisions.len(), holes, ground_hit);

    let grass_instances = build_grass_for_store(&store, grass, &GrassVariety::default(), 42, &[]);
    let total: usize = grass_instances.iter().map(|(_, instances)| instances.len()).sum();
    println!("Grass instances: {} in {} components", total, grass_instances.len());

    // 4. Стриминг вокруг наблюдателя
    let ground = store.height_at(0.0, 0.0).unwrap_or(0.0);
    let viewer = ViewerState::new(Vec3::new(0.0, 0.0, ground + 500.0), settings.streaming.field_of_view_degrees);
    let mut streaming = StreamingManager::new(Arc::new(StoreSnapshot::from_store(&store)), settings.clone())?;
    let update = streaming.generate_initial(&viewer)?;
    let triangles: usize = update.loaded.iter().map(|c| c.mesh.triangle_count()).sum();
    println!("Streamed {} components, {} triangles", update.loaded.len(), triangles);
    for (key, lod) in &update.required {
        log::debug!("Component ({}, {}) at LOD {}", key.x, key.y, lod);
    }

    // 5. Правка высот и пересборка
    let crater = VertexRect::new(-4, -4, 4, 4);
    let edited = store.set_height_data(crater, &vec![cyland::terrain::MID_VALUE; crater.len()], false)?;
    streaming.notify_edited(Arc::new(StoreSnapshot::from_store(&store)), edited);
    let update = streaming.generate_initial(&viewer)?;
    println!("Rebuilt {} components after edit", update.loaded.len());

    // 6. Сохранение и стриминг с диска
    if let Some(dir) = out_dir {
        let saved = save_store(&dir, &store)?;
        let source = TileDirectory::open(&dir, settings.clone())?;
        let mut from_disk = StreamingManager::new(Arc::new(source), settings)?;
        let update = from_disk.generate_initial(&viewer)?;
        println!("Saved {} tiles to {}, streamed {} back", saved, dir.display(), update.loaded.len());
    }

    Ok(())
}
