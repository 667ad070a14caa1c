// ============================================
// LOD Levels - Пороги размера на экране
// ============================================
// threshold[0] = lod0_screen_size, threshold[1] = threshold[0] / lod0_distribution,
// дальше каждый следующий делится на lod_distribution

use crate::core::CyLandSettings;

/// Максимальный LOD подсекции: log2(s + 1) - 1
#[inline]
pub fn max_lod_for(subsection_quads: u32) -> u32 {
    (subsection_quads + 1).max(2).trailing_zeros().saturating_sub(1)
}

/// Пороги выбора LOD для ландшафта
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    /// Пороги по уровням 0..=max_level
    pub thresholds: Vec<f32>,
    /// Ограничение сверху (max_lod настроек)
    pub max_lod: u32,
    pub forced_lod: Option<u32>,
}

impl LodSettings {
    pub fn from_settings(settings: &CyLandSettings) -> Self {
        let max_level = max_lod_for(settings.subsection_size_quads as u32);

        let mut thresholds = Vec::with_capacity(max_level as usize + 1);
        thresholds.push(settings.lod0_screen_size);
        for level in 1..=max_level {
            let prev = thresholds[level as usize - 1];
            let divisor = if level == 1 { settings.lod0_distribution } else { settings.lod_distribution };
            thresholds.push(prev / divisor);
        }

        let forced_lod = (settings.forced_lod >= 0).then(|| (settings.forced_lod as u32).min(max_level));

        Self {
            thresholds,
            max_lod: settings.effective_max_lod(),
            forced_lod,
        }
    }

    /// Самый грубый доступный уровень
    #[inline]
    pub fn max_level(&self) -> u32 {
        self.thresholds.len() as u32 - 1
    }

    /// LOD по размеру на экране (0..1)
    pub fn select_lod(&self, screen_size: f32) -> u32 {
        if let Some(forced) = self.forced_lod {
            return forced;
        }
        let lod = self.thresholds[1..].iter().filter(|&&t| screen_size < t).count() as u32;
        lod.min(self.max_lod)
    }
}
