// ============================================
// Streaming Planner - Какие компоненты держать
// ============================================
// Загрузка в радиусе load_radius (Chebyshev), выгрузка только
// за load_radius + unload_padding

use crate::core::{CyLandSettings, StreamingSettings};
use crate::terrain::coords::ComponentKey;
use crate::terrain::lod::ViewerState;

#[derive(Clone, Debug)]
pub struct StreamingPlanner {
    streaming: StreamingSettings,
    size_quads: i32,
    draw_scale: [f32; 3],
}

impl StreamingPlanner {
    pub fn new(settings: &CyLandSettings) -> Self {
        Self {
            streaming: settings.streaming.clone(),
            size_quads: settings.component_size_quads(),
            draw_scale: settings.draw_scale,
        }
    }

    /// Компонент под наблюдателем
    #[inline]
    pub fn viewer_key(&self, viewer: &ViewerState) -> ComponentKey {
        ComponentKey::from_world(viewer.position.x, viewer.position.y, self.size_quads, self.draw_scale)
    }

    #[inline]
    pub fn unload_radius(&self) -> i32 {
        self.streaming.load_radius_components + self.streaming.unload_padding_components
    }

    /// Ключ для сортировки по удалённости от центра
    #[inline]
    fn distance_key(center: ComponentKey, key: ComponentKey) -> (i32, i64, ComponentKey) {
        let dx = (key.x - center.x) as i64;
        let dy = (key.y - center.y) as i64;
        (center.chebyshev(&key), dx * dx + dy * dy, key)
    }

    /// Нужные компоненты, ближние первыми, не больше max_resident_components
    pub fn required(&self, center: ComponentKey, available: &[ComponentKey]) -> Vec<ComponentKey> {
        let radius = self.streaming.load_radius_components;
        let mut keys: Vec<ComponentKey> = available
            .iter()
            .copied()
            .filter(|key| center.chebyshev(key) <= radius)
            .collect();
        keys.sort_by_key(|&key| Self::distance_key(center, key));
        keys.truncate(self.streaming.max_resident_components);
        keys
    }

    /// Выгружать ли загруженный компонент
    #[inline]
    pub fn should_evict(&self, center: ComponentKey, key: ComponentKey) -> bool {
        center.chebyshev(&key) > self.unload_radius()
    }

    /// Лишние компоненты сверх лимита (дальние первыми), кроме нужных
    pub fn over_capacity(
        &self,
        center: ComponentKey,
        resident: &[ComponentKey],
        required: &[ComponentKey],
    ) -> Vec<ComponentKey> {
        let max = self.streaming.max_resident_components;
        if resident.len() <= max {
            return Vec::new();
        }
        let mut optional: Vec<ComponentKey> = resident
            .iter()
            .copied()
            .filter(|key| !required.contains(key))
            .collect();
        optional.sort_by_key(|&key| std::cmp::Reverse(Self::distance_key(center, key)));
        optional.truncate(resident.len() - max);
        optional
    }
}
