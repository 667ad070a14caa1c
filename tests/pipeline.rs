// Генерация -> покраска -> стриминг -> коллизия -> сохранение/загрузка

use std::sync::Arc;
use std::time::{Duration, Instant};

use ultraviolet::Vec3;

use cyland::save::{load_store, save_store, TileDirectory};
use cyland::terrain::{build_component_mesh, height_to_local, ComponentKey, LayerInfo, ProceduralTerrain, VertexRect};
use cyland::{
    CyLandSettings, HeightfieldStore, LayerRegistry, PaintingRestriction, StoreSnapshot, StreamingManager,
    TileSource, ViewerState,
};

fn settings() -> CyLandSettings {
    let mut settings = CyLandSettings {
        subsection_size_quads: 7,
        num_subsections: 2,
        ..Default::default()
    };
    settings.streaming.load_radius_components = 1;
    settings.streaming.unload_padding_components = 1;
    settings
}

fn generated_store() -> HeightfieldStore {
    let mut registry = LayerRegistry::new();
    registry.register(LayerInfo::new("grass")).unwrap();
    registry.register(LayerInfo::new("rock").with_physical_material("PM_Rock")).unwrap();
    let mut store = HeightfieldStore::with_layers(settings(), registry).unwrap();

    let terrain = ProceduralTerrain { seed: 7, ..Default::default() };
    terrain
        .populate_components(&mut store, ComponentKey::new(-2, -2), ComponentKey::new(2, 2))
        .unwrap();

    let bounds = store.bounds().unwrap();
    let rock = store.layers().require_id("rock").unwrap();
    store
        .set_alpha_data(rock, bounds, &vec![255; bounds.len()], PaintingRestriction::None, true)
        .unwrap();
    store
}

fn wait(manager: &mut StreamingManager) -> cyland::StreamUpdate {
    let start = Instant::now();
    loop {
        if let Some(update) = manager.try_get_update() {
            return update;
        }
        assert!(start.elapsed() < Duration::from_secs(10), "streaming timed out");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn shared_edges_match_after_generation() {
    let store = generated_store();
    let cs = store.size_quads();
    let left = store.component(ComponentKey::new(0, 0)).unwrap();
    let right = store.component(ComponentKey::new(1, 0)).unwrap();
    for ly in 0..=cs as u32 {
        assert_eq!(left.height(cs as u32, ly), right.height(0, ly));
    }
}

#[test]
fn streaming_moves_with_viewer() {
    let store = generated_store();
    let mut manager = StreamingManager::new(Arc::new(StoreSnapshot::from_store(&store)), settings()).unwrap();

    // Компонент 14 квадов * 100 = 1400 единиц
    let viewer = ViewerState::new(Vec3::new(700.0, 700.0, 1000.0), 90.0);
    let initial = manager.generate_initial(&viewer).unwrap();
    assert_eq!(initial.loaded.len(), 9);
    for streamed in &initial.loaded {
        assert_eq!(streamed.collision.size_quads, 14);
        let layer = streamed.collision.dominant_layer(3, 3);
        assert_eq!(layer, store.layers().id_of("rock"));
    }

    // На два компонента вправо: колонка x = -1 за пределом радиуса + запаса
    let viewer = ViewerState::new(Vec3::new(2.0 * 1400.0 + 700.0, 700.0, 1000.0), 90.0);
    assert!(manager.update(&viewer));
    let update = wait(&mut manager);
    assert_eq!(update.evicted.len(), 3);
    assert!(update.evicted.iter().all(|key| key.x == -1));
    assert!(update.required.iter().all(|(key, _)| key.x >= 1 && key.x <= 2));
}

#[test]
fn saved_landscape_streams_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = generated_store();
    assert_eq!(save_store(dir.path(), &store).unwrap(), 25);

    let loaded = load_store(dir.path(), settings()).unwrap();
    let rect = VertexRect::new(-28, -28, 42, 42);
    assert_eq!(loaded.get_height_data(rect).unwrap(), store.get_height_data(rect).unwrap());

    let source = TileDirectory::open(dir.path(), settings()).unwrap();
    assert_eq!(source.available(), store.keys());

    let mut manager = StreamingManager::new(Arc::new(source), settings()).unwrap();
    let viewer = ViewerState::new(Vec3::new(-700.0, -700.0, 1000.0), 90.0);
    let update = manager.generate_initial(&viewer).unwrap();
    assert_eq!(update.loaded.len(), 9);
    assert!(update.failed.is_empty());

    let center = update.loaded.iter().find(|c| c.key == ComponentKey::new(-1, -1)).unwrap();
    let original = store.component(ComponentKey::new(-1, -1)).unwrap();
    assert_eq!(center.collision.height(5, 9), original.height(5, 9));
}

#[test]
fn created_components_share_edges_with_neighbours() {
    let mut store = HeightfieldStore::new(settings()).unwrap();
    let left_rect = VertexRect::new(0, 0, 14, 14);
    store.set_height_data(left_rect, &vec![40000; left_rect.len()], true).unwrap();
    let right_rect = VertexRect::new(15, 0, 20, 14);
    store.set_height_data(right_rect, &vec![41000; right_rect.len()], true).unwrap();

    let left = store.component(ComponentKey::new(0, 0)).unwrap();
    let right = store.component(ComponentKey::new(1, 0)).unwrap();
    for ly in 0..=14 {
        assert_eq!(left.height(14, ly), 40000);
        assert_eq!(right.height(0, ly), 40000);
    }
    assert_eq!(store.get_height_data(VertexRect::new(14, 0, 14, 14)).unwrap(), vec![40000; 15]);
}

#[test]
fn edit_rebuilds_neighbour_with_changed_normals() {
    let mut store = generated_store();
    let mut manager = StreamingManager::new(Arc::new(StoreSnapshot::from_store(&store)), settings()).unwrap();
    let viewer = ViewerState::new(Vec3::new(700.0, 700.0, 1000.0), 90.0);
    manager.generate_initial(&viewer).unwrap();

    // Колонка x = 14 общая с (1, 0) и не пишется
    let rect = VertexRect::new(0, 0, 13, 14);
    let edited = store.set_height_data(rect, &vec![45000; rect.len()], false).unwrap();
    assert!(edited.contains(&ComponentKey::new(1, 0)));
    manager.notify_edited(Arc::new(StoreSnapshot::from_store(&store)), edited);

    assert!(manager.update(&viewer));
    let update = wait(&mut manager);
    let neighbour = update
        .loaded
        .iter()
        .find(|c| c.key == ComponentKey::new(1, 0))
        .expect("neighbour rebuilt");
    assert!(neighbour.collision_rebuilt);
    let normal = store.component(ComponentKey::new(1, 0)).unwrap().normal(0, 7);
    assert!(normal[0] > 0.5);
}

#[test]
fn height_at_reaches_far_edge() {
    let store = generated_store();
    // Последняя колонка вершин x = 42 есть только у компонента (2, y)
    let h = store.vertex_height(42, 7).unwrap();
    assert_eq!(store.height_at(4200.0, 700.0), Some(height_to_local(h) * 100.0));
    assert_eq!(store.height_at(4250.0, 700.0), None);
}

#[test]
fn holes_stream_into_mesh_and_collision() {
    let mut store = generated_store();
    let hole = store.layers_mut().ensure_visibility_layer().unwrap();
    store
        .set_alpha_data(hole, VertexRect::new(7, 7, 7, 7), &[255], PaintingRestriction::None, true)
        .unwrap();

    let mut manager = StreamingManager::new(Arc::new(StoreSnapshot::from_store(&store)), settings()).unwrap();
    let viewer = ViewerState::new(Vec3::new(700.0, 700.0, 1000.0), 90.0);
    let update = manager.generate_initial(&viewer).unwrap();
    let streamed = update.loaded.iter().find(|c| c.key == ComponentKey::new(0, 0)).unwrap();

    assert_eq!(streamed.collision.hole_count(), 4);
    assert!(streamed.collision.is_hole(6, 6));
    assert!(streamed.collision.raycast_down(750.0, 750.0).is_none());
    assert!(streamed.collision.raycast_down(350.0, 350.0).is_some());

    let component = store.component(ComponentKey::new(0, 0)).unwrap();
    let solid = build_component_mesh(component, streamed.mesh.lod, store.settings(), None);
    assert!(streamed.mesh.surface_index_count() < solid.surface_index_count());
}
