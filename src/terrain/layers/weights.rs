// ============================================
// Component Weights - Веса слоёв в компоненте
// ============================================
// Одна аллокация на слой: side x side байт, 255 = полностью закрашено

use serde::{Deserialize, Serialize};

use super::layer::{LayerId, HOLE_THRESHOLD};

/// Веса одного слоя в компоненте
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAllocation {
    pub layer: LayerId,
    pub weights: Vec<u8>,
}

impl LayerAllocation {
    /// Суммарное влияние слоя в компоненте
    pub fn total_influence(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.iter().all(|&w| w == 0)
    }
}

/// Аллокации слоёв и белый список компонента
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentWeights {
    side: u32,
    allocations: Vec<LayerAllocation>,
    whitelist: Vec<LayerId>,
}

impl ComponentWeights {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            allocations: Vec::new(),
            whitelist: Vec::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    fn index(&self, lx: u32, ly: u32) -> usize {
        (ly * self.side + lx) as usize
    }

    #[inline]
    pub fn allocations(&self) -> &[LayerAllocation] {
        &self.allocations
    }

    pub(crate) fn allocations_mut(&mut self) -> &mut Vec<LayerAllocation> {
        &mut self.allocations
    }

    /// Слои в порядке аллокации
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.allocations.iter().map(|a| a.layer)
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.allocations.len()
    }

    #[inline]
    pub fn has_layer(&self, layer: LayerId) -> bool {
        self.allocations.iter().any(|a| a.layer == layer)
    }

    pub fn weights_of(&self, layer: LayerId) -> Option<&[u8]> {
        self.allocations.iter().find(|a| a.layer == layer).map(|a| a.weights.as_slice())
    }

    /// Вес слоя в текселе (0 если слоя нет)
    pub fn weight(&self, layer: LayerId, lx: u32, ly: u32) -> u8 {
        let index = self.index(lx, ly);
        self.weights_of(layer).map_or(0, |w| w[index])
    }

    /// Вершина закрашена слоем видимости выше порога
    #[inline]
    pub fn is_hole(&self, visibility: Option<LayerId>, lx: u32, ly: u32) -> bool {
        visibility.map_or(false, |layer| self.weight(layer, lx, ly) >= HOLE_THRESHOLD)
    }

    /// Аллокация слоя, создаётся нулевой при отсутствии
    pub fn ensure_allocation(&mut self, layer: LayerId) -> &mut Vec<u8> {
        let len = (self.side * self.side) as usize;
        let pos = match self.allocations.iter().position(|a| a.layer == layer) {
            Some(pos) => pos,
            None => {
                self.allocations.push(LayerAllocation { layer, weights: vec![0; len] });
                self.allocations.len() - 1
            }
        };
        &mut self.allocations[pos].weights
    }

    /// Записать вес; нулевой вес не создаёт новую аллокацию
    pub fn set_weight(&mut self, layer: LayerId, lx: u32, ly: u32, value: u8) {
        let index = self.index(lx, ly);
        if value == 0 {
            if let Some(alloc) = self.allocations.iter_mut().find(|a| a.layer == layer) {
                alloc.weights[index] = 0;
            }
            return;
        }
        self.ensure_allocation(layer)[index] = value;
    }

    pub fn remove_layer(&mut self, layer: LayerId) -> Option<LayerAllocation> {
        let pos = self.allocations.iter().position(|a| a.layer == layer)?;
        Some(self.allocations.remove(pos))
    }

    /// Удалить аллокации без веса, вернуть их количество
    pub fn remove_empty(&mut self) -> usize {
        let before = self.allocations.len();
        self.allocations.retain(|a| !a.is_empty());
        before - self.allocations.len()
    }

    pub fn total_influence(&self, layer: LayerId) -> u64 {
        self.allocations
            .iter()
            .find(|a| a.layer == layer)
            .map_or(0, |a| a.total_influence())
    }

    /// Слой с наибольшим весом в текселе
    pub fn dominant(&self, lx: u32, ly: u32) -> Option<LayerId> {
        let index = self.index(lx, ly);
        let mut best: Option<(LayerId, u8)> = None;
        for alloc in &self.allocations {
            let w = alloc.weights[index];
            if w > 0 && best.map_or(true, |(_, b)| w > b) {
                best = Some((alloc.layer, w));
            }
        }
        best.map(|(layer, _)| layer)
    }

    #[inline]
    pub fn whitelist(&self) -> &[LayerId] {
        &self.whitelist
    }

    #[inline]
    pub fn is_whitelisted(&self, layer: LayerId) -> bool {
        self.whitelist.contains(&layer)
    }

    pub fn add_to_whitelist(&mut self, layer: LayerId) {
        if !self.whitelist.contains(&layer) {
            self.whitelist.push(layer);
        }
    }

    pub fn remove_from_whitelist(&mut self, layer: LayerId) {
        self.whitelist.retain(|&l| l != layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_write_does_not_allocate() {
        let mut weights = ComponentWeights::new(3);
        weights.set_weight(LayerId(1), 1, 1, 0);
        assert_eq!(weights.layer_count(), 0);
        weights.set_weight(LayerId(1), 1, 1, 200);
        assert_eq!(weights.weight(LayerId(1), 1, 1), 200);
        assert_eq!(weights.total_influence(LayerId(1)), 200);
    }

    #[test]
    fn test_dominant_prefers_first_on_tie() {
        let mut weights = ComponentWeights::new(2);
        weights.set_weight(LayerId(4), 0, 0, 100);
        weights.set_weight(LayerId(2), 0, 0, 100);
        weights.set_weight(LayerId(2), 1, 0, 5);
        assert_eq!(weights.dominant(0, 0), Some(LayerId(4)));
        assert_eq!(weights.dominant(1, 0), Some(LayerId(2)));
        assert_eq!(weights.dominant(1, 1), None);
    }

    #[test]
    fn test_remove_empty_allocations() {
        let mut weights = ComponentWeights::new(2);
        weights.set_weight(LayerId(0), 0, 0, 10);
        weights.set_weight(LayerId(1), 0, 0, 10);
        weights.set_weight(LayerId(1), 0, 0, 0);
        assert_eq!(weights.remove_empty(), 1);
        assert_eq!(weights.layers().collect::<Vec<_>>(), vec![LayerId(0)]);
    }

    #[test]
    fn test_hole_threshold() {
        let mut weights = ComponentWeights::new(2);
        weights.set_weight(LayerId(3), 0, 0, HOLE_THRESHOLD);
        weights.set_weight(LayerId(3), 1, 0, HOLE_THRESHOLD - 1);
        assert!(weights.is_hole(Some(LayerId(3)), 0, 0));
        assert!(!weights.is_hole(Some(LayerId(3)), 1, 0));
        assert!(!weights.is_hole(Some(LayerId(3)), 1, 1));
        assert!(!weights.is_hole(None, 0, 0));
    }
}
