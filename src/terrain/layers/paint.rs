// ============================================
// Paint - Покраска слоёв по прямоугольнику
// ============================================
// Смешиваемые слои в текселе дают в сумме 255 после покраски с weight_adjust.
// Несмешиваемые (no_weight_blend) слои хранятся независимо.

use serde::{Deserialize, Serialize};

use crate::core::{CyLandError, Result};
use crate::terrain::coords::{ComponentKey, VertexRect};
use crate::terrain::heightfield::HeightfieldStore;

use super::layer::{LayerId, LayerRegistry};
use super::weights::ComponentWeights;

/// Ограничение покраски компонентов
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaintingRestriction {
    #[default]
    None,
    /// Не добавлять слой, если в компоненте уже max_painted_layers_per_component слоёв
    UseMaxLayers,
    /// Красить только слоями, которые уже есть в компоненте
    ExistingOnly,
    /// Красить только слоями из белого списка компонента
    UseComponentWhitelist,
}

/// Разложить target по весам пропорционально (метод наибольшего остатка)
fn distribute(weights: &[u8], target: u32) -> Vec<u8> {
    let sum: u32 = weights.iter().map(|&w| w as u32).sum();
    if sum == 0 {
        return vec![0; weights.len()];
    }

    let mut result: Vec<u32> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(u32, usize)> = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        let num = w as u32 * target;
        result.push(num / sum);
        remainders.push((num % sum, i));
    }

    let assigned: u32 = result.iter().sum();
    let mut left = target - assigned;
    // Больший остаток первым, при равенстве - меньший индекс
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(rem, i) in &remainders {
        if left == 0 {
            break;
        }
        if rem > 0 {
            result[i] += 1;
            left -= 1;
        }
    }

    result.into_iter().map(|w| w.min(255) as u8).collect()
}

/// Смешиваемый слой с наибольшим влиянием, кроме exclude
fn replacement_layer(weights: &ComponentWeights, registry: &LayerRegistry, exclude: LayerId) -> Option<LayerId> {
    let mut best: Option<(LayerId, u64)> = None;
    for alloc in weights.allocations() {
        if alloc.layer == exclude || !registry.is_weight_blended(alloc.layer) {
            continue;
        }
        let influence = alloc.total_influence();
        if influence > 0 && best.map_or(true, |(_, b)| influence > b) {
            best = Some((alloc.layer, influence));
        }
    }
    best.map(|(layer, _)| layer)
}

/// Записать вес слоя в тексель с перераспределением остальных смешиваемых слоёв
fn write_blended_texel(
    weights: &mut ComponentWeights,
    registry: &LayerRegistry,
    layer: LayerId,
    index: usize,
    value: u8,
    replacement: Option<LayerId>,
) {
    let old = weights.weights_of(layer).map_or(0, |w| w[index]);
    let others: Vec<usize> = weights
        .allocations()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.layer != layer && registry.is_weight_blended(a.layer))
        .map(|(i, _)| i)
        .collect();
    let other_weights: Vec<u8> = others.iter().map(|&i| weights.allocations()[i].weights[index]).collect();
    let other_sum: u32 = other_weights.iter().map(|&w| w as u32).sum();

    if value > 0 {
        weights.ensure_allocation(layer)[index] = value;
    } else if let Some(w) = weights.allocations_mut().iter_mut().find(|a| a.layer == layer) {
        w.weights[index] = 0;
    }

    let remaining = 255 - value as u32;
    if other_sum == 0 {
        // Слой держал всё влияние и уменьшается: остаток уходит замене
        if value < old {
            if let Some(replacement) = replacement {
                weights.ensure_allocation(replacement)[index] = remaining as u8;
            }
        }
        return;
    }

    let scaled = distribute(&other_weights, remaining);
    let allocations = weights.allocations_mut();
    for (&alloc_index, &w) in others.iter().zip(scaled.iter()) {
        allocations[alloc_index].weights[index] = w;
    }
}

impl HeightfieldStore {
    /// Можно ли красить слой в компоненте при данном ограничении
    pub fn can_paint(&self, key: ComponentKey, layer: LayerId, restriction: PaintingRestriction) -> bool {
        let Some(component) = self.component(key) else { return false };
        let weights = component.weights();
        match restriction {
            PaintingRestriction::None => true,
            PaintingRestriction::UseComponentWhitelist => weights.is_whitelisted(layer),
            PaintingRestriction::ExistingOnly => weights.has_layer(layer),
            PaintingRestriction::UseMaxLayers => {
                let max = self.settings.max_painted_layers_per_component;
                weights.has_layer(layer) || max == 0 || weights.layer_count() < max
            }
        }
    }

    /// Записать веса слоя по прямоугольнику вершин
    pub fn set_alpha_data(
        &mut self,
        layer: LayerId,
        rect: VertexRect,
        data: &[u8],
        restriction: PaintingRestriction,
        weight_adjust: bool,
    ) -> Result<Vec<ComponentKey>> {
        rect.validate()?;
        if data.len() != rect.len() {
            return Err(CyLandError::DataSizeMismatch { expected: rect.len(), actual: data.len() });
        }
        let blended = !self.layers.require(layer)?.no_weight_blend;
        let adjust = blended && weight_adjust;

        let cs = self.size_quads();
        let keys: Vec<ComponentKey> = self
            .get_components_in_region(&rect)
            .into_iter()
            .filter(|&key| {
                let allowed = self.can_paint(key, layer, restriction);
                if !allowed {
                    log::trace!("Painting {} skipped in ({}, {}) by {:?}", layer, key.x, key.y, restriction);
                }
                allowed
            })
            .collect();

        let registry = &self.layers;
        for key in &keys {
            let Some(component) = self.components.get_mut(key) else { continue };
            let Some(overlap) = key.vertex_rect(cs).intersect(&rect) else { continue };
            let (bx, by) = key.section_base(cs);
            let side = component.size_verts();
            let weights = component.weights_mut();
            let replacement = if adjust { replacement_layer(weights, registry, layer) } else { None };

            for (gx, gy) in overlap.iter() {
                let (lx, ly) = ((gx - bx) as u32, (gy - by) as u32);
                let value = data[rect.index_of(gx, gy)];
                if adjust {
                    write_blended_texel(weights, registry, layer, (ly * side + lx) as usize, value, replacement);
                } else {
                    weights.set_weight(layer, lx, ly, value);
                }
            }
            weights.remove_empty();
            component.touch();
        }

        self.mark_dirty(keys.iter().copied());
        Ok(keys)
    }

    /// Веса слоя по прямоугольнику; без компонента - 0
    pub fn get_weight_data(&self, layer: LayerId, rect: VertexRect) -> Result<Vec<u8>> {
        rect.validate()?;
        self.layers.require(layer)?;
        Ok(rect.iter().map(|(gx, gy)| self.texel_weight(layer, gx, gy).unwrap_or(0)).collect())
    }

    /// Вес слоя в глобальной вершине из любого компонента-владельца
    pub fn texel_weight(&self, layer: LayerId, gx: i32, gy: i32) -> Option<u8> {
        let cs = self.size_quads();
        let owner = ComponentKey::from_vertex(gx, gy, cs);
        [
            owner,
            ComponentKey::new(owner.x - 1, owner.y),
            ComponentKey::new(owner.x, owner.y - 1),
            ComponentKey::new(owner.x - 1, owner.y - 1),
        ]
        .iter()
        .find_map(|key| {
            let component = self.component(*key)?;
            let (lx, ly) = key.local_vertex(gx, gy, cs)?;
            Some(component.weights().weight(layer, lx, ly))
        })
    }

    /// Удалить слой из всех компонентов и перенормировать остальные
    pub fn delete_layer(&mut self, layer: LayerId) -> Result<Vec<ComponentKey>> {
        let blended = !self.layers.require(layer)?.no_weight_blend;
        let registry = &self.layers;
        let mut touched = Vec::new();

        for (key, component) in self.components.iter_mut() {
            let weights = component.weights_mut();
            weights.remove_from_whitelist(layer);
            let Some(removed) = weights.remove_layer(layer) else { continue };

            if blended {
                let others: Vec<usize> = weights
                    .allocations()
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| registry.is_weight_blended(a.layer))
                    .map(|(i, _)| i)
                    .collect();
                for (index, &w) in removed.weights.iter().enumerate() {
                    if w == 0 {
                        continue;
                    }
                    let current: Vec<u8> = others.iter().map(|&i| weights.allocations()[i].weights[index]).collect();
                    let target = current.iter().map(|&v| v as u32).sum::<u32>() + w as u32;
                    let scaled = distribute(&current, target.min(255));
                    let allocations = weights.allocations_mut();
                    for (&i, &v) in others.iter().zip(scaled.iter()) {
                        allocations[i].weights[index] = v;
                    }
                }
            }
            weights.remove_empty();
            component.touch();
            touched.push(*key);
        }

        touched.sort();
        log::debug!("Deleted layer {} from {} components", layer, touched.len());
        self.mark_dirty(touched.iter().copied());
        Ok(touched)
    }

    /// Залить слой во всех компонентах (остальные смешиваемые обнуляются)
    pub fn fill_layer(&mut self, layer: LayerId) -> Result<Vec<ComponentKey>> {
        let blended = !self.layers.require(layer)?.no_weight_blend;
        let registry = &self.layers;

        for component in self.components.values_mut() {
            let weights = component.weights_mut();
            weights.ensure_allocation(layer).iter_mut().for_each(|w| *w = 255);
            if blended {
                weights
                    .allocations_mut()
                    .retain(|a| a.layer == layer || !registry.is_weight_blended(a.layer));
            }
            component.touch();
        }

        let keys = self.keys();
        self.mark_dirty(keys.iter().copied());
        Ok(keys)
    }

    /// Перенести веса слоя from в слой to (с насыщением)
    pub fn replace_layer(&mut self, from: LayerId, to: LayerId) -> Result<Vec<ComponentKey>> {
        self.layers.require(from)?;
        self.layers.require(to)?;
        if from == to {
            return Ok(Vec::new());
        }

        let mut touched = Vec::new();
        for (key, component) in self.components.iter_mut() {
            let weights = component.weights_mut();
            let Some(removed) = weights.remove_layer(from) else { continue };
            let target = weights.ensure_allocation(to);
            for (dst, src) in target.iter_mut().zip(removed.weights.iter()) {
                *dst = dst.saturating_add(*src);
            }
            if weights.is_whitelisted(from) {
                weights.remove_from_whitelist(from);
                weights.add_to_whitelist(to);
            }
            weights.remove_empty();
            component.touch();
            touched.push(*key);
        }

        touched.sort();
        self.mark_dirty(touched.iter().copied());
        Ok(touched)
    }

    /// Слой с наибольшим весом в локальной вершине компонента
    pub fn dominant_layer(&self, key: ComponentKey, lx: u32, ly: u32) -> Option<LayerId> {
        self.component(key)?.weights().dominant(lx, ly)
    }

    /// Доля покрытия каждого слоя в компоненте (0..1)
    pub fn layer_usage(&self, key: ComponentKey) -> Vec<(LayerId, f32)> {
        let Some(component) = self.component(key) else { return Vec::new() };
        let texels = (component.size_verts() * component.size_verts()) as f32;
        component
            .weights()
            .allocations()
            .iter()
            .map(|a| (a.layer, a.total_influence() as f32 / (255.0 * texels)))
            .collect()
    }

    /// Добавить слой в белый список компонента
    pub fn add_to_whitelist(&mut self, key: ComponentKey, layer: LayerId) -> Result<bool> {
        self.layers.require(layer)?;
        let Some(component) = self.component_mut(key) else { return Ok(false) };
        component.weights_mut().add_to_whitelist(layer);
        Ok(true)
    }

    /// Внести в белые списки все уже нарисованные слои
    pub fn update_component_whitelists(&mut self) {
        for component in self.components.values_mut() {
            let weights = component.weights_mut();
            let layers: Vec<LayerId> = weights.layers().collect();
            for layer in layers {
                weights.add_to_whitelist(layer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CyLandSettings;
    use crate::terrain::layers::LayerInfo;

    fn store() -> (HeightfieldStore, LayerId, LayerId, LayerId) {
        let settings = CyLandSettings {
            subsection_size_quads: 7,
            num_subsections: 1,
            ..Default::default()
        };
        let mut store = HeightfieldStore::new(settings).unwrap();
        let grass = store.layers_mut().register(LayerInfo::new("grass")).unwrap();
        let rock = store.layers_mut().register(LayerInfo::new("rock")).unwrap();
        let puddles = store.layers_mut().register(LayerInfo::new("puddles").non_blended()).unwrap();
        store.create_rect(ComponentKey::new(0, 0), ComponentKey::new(1, 0));
        (store, grass, rock, puddles)
    }

    fn blended_sum(store: &HeightfieldStore, key: ComponentKey, lx: u32, ly: u32) -> u32 {
        let weights = store.component(key).unwrap().weights();
        weights
            .allocations()
            .iter()
            .filter(|a| store.layers().is_weight_blended(a.layer))
            .map(|a| weights.weight(a.layer, lx, ly) as u32)
            .sum()
    }

    #[test]
    fn test_distribute_keeps_total() {
        assert_eq!(distribute(&[100, 100, 55], 200).iter().map(|&w| w as u32).sum::<u32>(), 200);
        assert_eq!(distribute(&[1, 1, 1], 2), vec![1, 1, 0]);
        assert_eq!(distribute(&[0, 0], 100), vec![0, 0]);
    }

    #[test]
    fn test_weight_adjust_keeps_sum() {
        let (mut store, grass, rock, _) = store();
        let rect = VertexRect::new(0, 0, 14, 7);
        store.fill_layer(grass).unwrap();

        let data = vec![100u8; rect.len()];
        store.set_alpha_data(rock, rect, &data, PaintingRestriction::None, true).unwrap();
        let key = ComponentKey::new(0, 0);
        assert_eq!(blended_sum(&store, key, 3, 3), 255);
        assert_eq!(store.component(key).unwrap().weights().weight(grass, 3, 3), 155);
    }

    #[test]
    fn test_reduction_goes_to_replacement_layer() {
        let (mut store, grass, rock, _) = store();
        let key = ComponentKey::new(0, 0);
        store.fill_layer(grass).unwrap();
        // rock присутствует в компоненте, но не в текселе (2, 2)
        store.set_alpha_data(rock, VertexRect::new(5, 5, 5, 5), &[255], PaintingRestriction::None, true).unwrap();

        store.set_alpha_data(grass, VertexRect::new(2, 2, 2, 2), &[55], PaintingRestriction::None, true).unwrap();
        let weights = store.component(key).unwrap().weights();
        assert_eq!(weights.weight(grass, 2, 2), 55);
        assert_eq!(weights.weight(rock, 2, 2), 200);
    }

    #[test]
    fn test_non_blended_layer_leaves_others() {
        let (mut store, grass, _, puddles) = store();
        store.fill_layer(grass).unwrap();
        store.set_alpha_data(puddles, VertexRect::new(0, 0, 3, 3), &[128; 16], PaintingRestriction::None, true).unwrap();
        let key = ComponentKey::new(0, 0);
        let weights = store.component(key).unwrap().weights();
        assert_eq!(weights.weight(grass, 1, 1), 255);
        assert_eq!(weights.weight(puddles, 1, 1), 128);
    }

    #[test]
    fn test_restrictions() {
        let (mut store, grass, rock, _) = store();
        let a = ComponentKey::new(0, 0);
        let b = ComponentKey::new(1, 0);
        store.set_alpha_data(grass, VertexRect::new(0, 0, 1, 1), &[255; 4], PaintingRestriction::None, true).unwrap();

        assert!(store.can_paint(a, grass, PaintingRestriction::ExistingOnly));
        assert!(!store.can_paint(b, grass, PaintingRestriction::ExistingOnly));
        assert!(!store.can_paint(a, rock, PaintingRestriction::UseComponentWhitelist));
        store.add_to_whitelist(a, rock).unwrap();
        assert!(store.can_paint(a, rock, PaintingRestriction::UseComponentWhitelist));

        store.settings.max_painted_layers_per_component = 1;
        assert!(!store.can_paint(a, rock, PaintingRestriction::UseMaxLayers));
        assert!(store.can_paint(a, grass, PaintingRestriction::UseMaxLayers));
        assert!(store.can_paint(b, rock, PaintingRestriction::UseMaxLayers));

        let touched = store
            .set_alpha_data(rock, VertexRect::new(0, 0, 14, 0), &[255; 15], PaintingRestriction::ExistingOnly, true)
            .unwrap();
        assert!(touched.is_empty());
    }

    #[test]
    fn test_delete_layer_renormalises() {
        let (mut store, grass, rock, _) = store();
        store.fill_layer(grass).unwrap();
        let rect = VertexRect::new(0, 0, 14, 7);
        store.set_alpha_data(rock, rect, &vec![51u8; rect.len()], PaintingRestriction::None, true).unwrap();
        let touched = store.delete_layer(rock).unwrap();
        assert_eq!(touched.len(), 2);
        let key = ComponentKey::new(1, 0);
        let weights = store.component(key).unwrap().weights();
        assert!(!weights.has_layer(rock));
        assert_eq!(weights.weight(grass, 4, 4), 255);
    }

    #[test]
    fn test_replace_layer_merges() {
        let (mut store, grass, rock, _) = store();
        store.set_alpha_data(grass, VertexRect::new(0, 0, 0, 0), &[200], PaintingRestriction::None, false).unwrap();
        store.set_alpha_data(rock, VertexRect::new(0, 0, 0, 0), &[100], PaintingRestriction::None, false).unwrap();
        store.replace_layer(rock, grass).unwrap();
        let key = ComponentKey::new(0, 0);
        assert_eq!(store.dominant_layer(key, 0, 0), Some(grass));
        assert_eq!(store.component(key).unwrap().weights().weight(grass, 0, 0), 255);
        assert!(!store.component(key).unwrap().weights().has_layer(rock));
        assert_eq!(store.get_weight_data(grass, VertexRect::new(0, 0, 1, 0)).unwrap(), vec![255, 0]);
    }

    #[test]
    fn test_layer_usage_after_fill() {
        let (mut store, grass, _, _) = store();
        store.fill_layer(grass).unwrap();
        let usage = store.layer_usage(ComponentKey::new(0, 0));
        assert_eq!(usage, vec![(grass, 1.0)]);
    }
}
