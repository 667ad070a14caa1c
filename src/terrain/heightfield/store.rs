// ============================================
// Heightfield Store - Все компоненты ландшафта
// ============================================
// Запись по прямоугольнику вершин попадает во все компоненты,
// которые владеют вершиной, поэтому общие края всегда совпадают

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::core::{CyLandError, CyLandSettings, Result};
use crate::terrain::bounds::Aabb;
use crate::terrain::coords::{world_to_vertex, ComponentKey, VertexRect};
use crate::terrain::layers::LayerRegistry;

use super::component::HeightfieldComponent;
use super::normals::compute_normals;

/// Хранилище компонентов ландшафта
#[derive(Clone, Debug)]
pub struct HeightfieldStore {
    pub(crate) settings: CyLandSettings,
    pub(crate) layers: LayerRegistry,
    pub(crate) components: HashMap<ComponentKey, HeightfieldComponent>,
    pub(crate) dirty: HashSet<ComponentKey>,
    pub(crate) version: u64,
}

impl HeightfieldStore {
    pub fn new(settings: CyLandSettings) -> Result<Self> {
        Self::with_layers(settings, LayerRegistry::new())
    }

    pub fn with_layers(settings: CyLandSettings, layers: LayerRegistry) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            layers,
            components: HashMap::new(),
            dirty: HashSet::new(),
            version: 0,
        })
    }

    #[inline]
    pub fn settings(&self) -> &CyLandSettings {
        &self.settings
    }

    #[inline]
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    #[inline]
    pub fn layers_mut(&mut self) -> &mut LayerRegistry {
        &mut self.layers
    }

    #[inline]
    pub fn size_quads(&self) -> i32 {
        self.settings.component_size_quads()
    }

    // ============================================
    // Components
    // ============================================

    /// Создать плоский компонент. false если уже есть.
    /// Общие края копируются у существующих соседей.
    pub fn create_component(&mut self, key: ComponentKey) -> bool {
        if self.components.contains_key(&key) {
            return false;
        }
        let mut component = HeightfieldComponent::new_flat(key, &self.settings);
        let seeded = self.seed_shared_edges(&mut component);
        if seeded > 0 {
            component.rebuild_derived();
        }
        self.components.insert(key, component);

        // Нормали соседей на общем крае тоже меняются
        let cs = self.size_quads();
        let rect = key.vertex_rect(cs);
        let expanded = VertexRect::new(rect.x1 - 1, rect.y1 - 1, rect.x2 + 1, rect.y2 + 1);
        let normal_keys = self.get_components_in_region(&expanded);
        self.recalculate_normals_for(&normal_keys);
        self.mark_dirty(normal_keys);

        log::debug!("Created component ({}, {}), {} edge vertices from neighbours", key.x, key.y, seeded);
        true
    }

    /// Скопировать крайние вершины из соседей, вернуть их количество.
    /// Компонент ещё не в хранилище, поэтому читаются только соседи.
    fn seed_shared_edges(&self, component: &mut HeightfieldComponent) -> usize {
        let cs = self.size_quads();
        let side = cs as u32;
        let (bx, by) = component.section_base();
        let mut seeded = 0;
        for ly in 0..=side {
            let edge_row = ly == 0 || ly == side;
            for lx in 0..=side {
                if !edge_row && lx != 0 && lx != side {
                    continue;
                }
                if let Some(height) = self.vertex_height(bx + lx as i32, by + ly as i32) {
                    component.set_height(lx, ly, height);
                    seeded += 1;
                }
            }
        }
        seeded
    }

    /// Создать несколько компонентов, вернуть количество новых
    pub fn create_components<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = ComponentKey>,
    {
        keys.into_iter().filter(|&key| self.create_component(key)).count()
    }

    /// Создать прямоугольник компонентов min..=max
    pub fn create_rect(&mut self, min: ComponentKey, max: ComponentKey) -> usize {
        let keys: Vec<ComponentKey> = (min.y..=max.y)
            .flat_map(|y| (min.x..=max.x).map(move |x| ComponentKey::new(x, y)))
            .collect();
        self.create_components(keys)
    }

    /// Вставить готовый компонент (например, загруженный с диска)
    pub fn insert_component(&mut self, component: HeightfieldComponent) -> Result<Option<HeightfieldComponent>> {
        let expected = self.settings.component_size_verts();
        if component.size_verts() != expected
            || component.subsection_quads() != self.settings.subsection_size_quads as u32
        {
            return Err(CyLandError::DataSizeMismatch {
                expected: expected as usize,
                actual: component.size_verts() as usize,
            });
        }
        let key = component.key();
        self.mark_dirty([key]);
        Ok(self.components.insert(key, component))
    }

    pub fn remove_component(&mut self, key: ComponentKey) -> Option<HeightfieldComponent> {
        let removed = self.components.remove(&key);
        if removed.is_some() {
            self.mark_dirty([key]);
        }
        removed
    }

    #[inline]
    pub fn component(&self, key: ComponentKey) -> Option<&HeightfieldComponent> {
        self.components.get(&key)
    }

    #[inline]
    pub(crate) fn component_mut(&mut self, key: ComponentKey) -> Option<&mut HeightfieldComponent> {
        self.components.get_mut(&key)
    }

    #[inline]
    pub fn contains(&self, key: ComponentKey) -> bool {
        self.components.contains_key(&key)
    }

    /// Ключи в детерминированном порядке
    pub fn keys(&self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self.components.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn components(&self) -> impl Iterator<Item = &HeightfieldComponent> {
        self.components.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Растёт при каждом изменении данных
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Забрать изменённые компоненты
    pub fn take_dirty(&mut self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self.dirty.drain().collect();
        keys.sort();
        keys
    }

    pub(crate) fn mark_dirty<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = ComponentKey>,
    {
        self.dirty.extend(keys);
        self.version += 1;
    }

    /// Существующие компоненты, чьи вершины пересекают прямоугольник
    pub fn get_components_in_region(&self, rect: &VertexRect) -> Vec<ComponentKey> {
        let cs = self.size_quads();
        rect.components(cs)
            .into_iter()
            .filter(|key| {
                self.components.contains_key(key)
                    && key.vertex_rect(cs).intersect(rect).is_some()
            })
            .collect()
    }

    // ============================================
    // Heights
    // ============================================

    /// Высота глобальной вершины из любого компонента-владельца
    pub fn vertex_height(&self, gx: i32, gy: i32) -> Option<u16> {
        let cs = self.size_quads();
        let owner = ComponentKey::from_vertex(gx, gy, cs);
        let candidates = [
            owner,
            ComponentKey::new(owner.x - 1, owner.y),
            ComponentKey::new(owner.x, owner.y - 1),
            ComponentKey::new(owner.x - 1, owner.y - 1),
        ];
        candidates.iter().find_map(|key| {
            let component = self.components.get(key)?;
            let (lx, ly) = key.local_vertex(gx, gy, cs)?;
            Some(component.height(lx, ly))
        })
    }

    /// Записать высоты прямоугольника (row-major, границы включительно).
    /// Возвращает все компоненты, у которых поменялись высоты или нормали.
    pub fn set_height_data(&mut self, rect: VertexRect, data: &[u16], create_missing: bool) -> Result<Vec<ComponentKey>> {
        rect.validate()?;
        if data.len() != rect.len() {
            return Err(CyLandError::DataSizeMismatch { expected: rect.len(), actual: data.len() });
        }

        let cs = self.size_quads();
        if create_missing {
            let created = self.create_components(rect.owning_components(cs));
            if created > 0 {
                log::debug!("set_height_data created {} components", created);
            }
        }

        let touched = self.get_components_in_region(&rect);
        for key in &touched {
            let Some(component) = self.components.get_mut(key) else { continue };
            let Some(overlap) = key.vertex_rect(cs).intersect(&rect) else { continue };
            let (bx, by) = key.section_base(cs);
            for (gx, gy) in overlap.iter() {
                component.set_height((gx - bx) as u32, (gy - by) as u32, data[rect.index_of(gx, gy)]);
            }
        }

        self.rebuild_components(&touched);

        // Нормали соседей зависят от изменённых краёв
        let expanded = VertexRect::new(rect.x1 - 1, rect.y1 - 1, rect.x2 + 1, rect.y2 + 1);
        let normal_keys = self.get_components_in_region(&expanded);
        self.recalculate_normals_for(&normal_keys);

        self.mark_dirty(normal_keys.iter().copied());
        Ok(normal_keys)
    }

    /// Высоты прямоугольника; вершины без компонента читаются как 0
    pub fn get_height_data(&self, rect: VertexRect) -> Result<Vec<u16>> {
        rect.validate()?;
        Ok(rect.iter().map(|(gx, gy)| self.vertex_height(gx, gy).unwrap_or(0)).collect())
    }

    /// Только существующие вершины прямоугольника
    pub fn get_height_data_sparse(&self, rect: VertexRect) -> Result<HashMap<(i32, i32), u16>> {
        rect.validate()?;
        Ok(rect
            .iter()
            .filter_map(|(gx, gy)| self.vertex_height(gx, gy).map(|h| ((gx, gy), h)))
            .collect())
    }

    /// Мировая высота в точке (билинейно), None вне ландшафта
    pub fn height_at(&self, world_x: f32, world_y: f32) -> Option<f32> {
        let cs = self.size_quads();
        let (fx, fy) = world_to_vertex(world_x, world_y, self.settings.draw_scale);
        let (gx, gy) = (fx.floor() as i32, fy.floor() as i32);
        // Дальний край последнего компонента принадлежит левому/нижнему соседу
        let owner = ComponentKey::from_vertex(gx, gy, cs);
        let candidates = [
            owner,
            ComponentKey::new(owner.x - 1, owner.y),
            ComponentKey::new(owner.x, owner.y - 1),
            ComponentKey::new(owner.x - 1, owner.y - 1),
        ];
        let (key, component) = candidates.iter().find_map(|key| {
            let component = self.components.get(key)?;
            let (bx, by) = key.section_base(cs);
            let (lx, ly) = (fx - bx as f32, fy - by as f32);
            (lx >= 0.0 && ly >= 0.0 && lx <= cs as f32 && ly <= cs as f32).then_some((*key, component))
        })?;
        let (bx, by) = key.section_base(cs);
        let local = component.sample_local(fx - bx as f32, fy - by as f32);
        Some(local * self.settings.draw_scale[2])
    }

    // ============================================
    // Derived data
    // ============================================

    /// Мипы и границы компонентов (параллельно)
    fn rebuild_components(&mut self, keys: &[ComponentKey]) {
        let keys: HashSet<ComponentKey> = keys.iter().copied().collect();
        self.components
            .par_iter_mut()
            .filter(|(key, _)| keys.contains(*key))
            .for_each(|(_, component)| component.rebuild_derived());
    }

    /// Пересчитать все нормали с учётом соседей
    pub fn recalculate_normals(&mut self) {
        let keys = self.keys();
        self.recalculate_normals_for(&keys);
    }

    fn recalculate_normals_for(&mut self, keys: &[ComponentKey]) {
        let draw_scale = self.settings.draw_scale;
        let results: Vec<(ComponentKey, Vec<[f32; 3]>)> = keys
            .par_iter()
            .filter_map(|key| {
                let component = self.components.get(key)?;
                let normals = compute_normals(
                    component.section_base(),
                    component.size_verts(),
                    component.heights(),
                    draw_scale,
                    |gx, gy| self.vertex_height(gx, gy),
                );
                Some((*key, normals))
            })
            .collect();

        for (key, normals) in results {
            if let Some(component) = self.components.get_mut(&key) {
                component.set_normals(normals);
            }
        }
    }

    /// Прямоугольник вершин, который покрывают все компоненты
    pub fn bounds(&self) -> Option<VertexRect> {
        let cs = self.size_quads();
        self.components.keys().fold(None, |acc: Option<VertexRect>, key| {
            let rect = key.vertex_rect(cs);
            Some(match acc {
                None => rect,
                Some(acc) => VertexRect::new(
                    acc.x1.min(rect.x1),
                    acc.y1.min(rect.y1),
                    acc.x2.max(rect.x2),
                    acc.y2.max(rect.y2),
                ),
            })
        })
    }

    /// Мировые границы всех компонентов
    pub fn world_bounds(&self) -> Option<Aabb> {
        let draw_scale = self.settings.draw_scale;
        self.components.values().map(|c| c.world_bounds(draw_scale)).reduce(|a, b| {
            Aabb::new(a.min.min_by_component(b.min), a.max.max_by_component(b.max))
        })
    }
}
