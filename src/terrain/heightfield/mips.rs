// ============================================
// Mips - Уровни детализации карты высот
// ============================================
// Каждая подсекция уменьшается отдельно: (s + 1) >> level вершин.
// Края подсекций и компонента берутся из mip 0 без интерполяции,
// поэтому соседние компоненты совпадают на любом уровне.

use crate::terrain::coords::sample_bilinear;

/// Квадов в подсекции на уровне мипа
#[inline]
pub fn mip_subsection_quads(subsection_quads: u32, level: u32) -> u32 {
    ((subsection_quads + 1) >> level).max(2) - 1
}

/// Вершин по стороне компонента на уровне мипа
#[inline]
pub fn mip_side(subsection_quads: u32, num_subsections: u32, level: u32) -> u32 {
    mip_subsection_quads(subsection_quads, level) * num_subsections + 1
}

/// Координата вершины мипа -> координата в mip 0 (дробная)
#[inline]
pub fn mip_to_base(mip_coord: u32, subsection_quads: u32, mip_quads: u32, num_subsections: u32) -> f32 {
    let sub = (mip_coord / mip_quads).min(num_subsections - 1);
    let local = mip_coord - sub * mip_quads;
    (sub * subsection_quads) as f32 + local as f32 * subsection_quads as f32 / mip_quads as f32
}

/// Один уровень мипа
#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub level: u32,
    pub side: u32,
    pub heights: Vec<u16>,
}

/// Представление уровня (включая mip 0) без копирования
#[derive(Clone, Copy, Debug)]
pub struct MipView<'a> {
    pub level: u32,
    pub side: u32,
    pub heights: &'a [u16],
    pub(crate) subsection_quads: u32,
    pub(crate) num_subsections: u32,
}

impl<'a> MipView<'a> {
    #[inline]
    pub fn height(&self, x: u32, y: u32) -> u16 {
        self.heights[(y * self.side + x) as usize]
    }

    /// Квадов по стороне
    #[inline]
    pub fn quads(&self) -> u32 {
        self.side - 1
    }

    /// Координата вершины уровня в mip 0
    #[inline]
    pub fn to_base(&self, coord: u32) -> f32 {
        let mip_quads = mip_subsection_quads(self.subsection_quads, self.level);
        mip_to_base(coord, self.subsection_quads, mip_quads, self.num_subsections)
    }
}

/// Построить один уровень из mip 0
pub fn generate_mip(base: &[u16], subsection_quads: u32, num_subsections: u32, level: u32) -> MipLevel {
    let base_side = subsection_quads * num_subsections + 1;
    let mip_quads = mip_subsection_quads(subsection_quads, level);
    let side = mip_quads * num_subsections + 1;

    let coords: Vec<f32> = (0..side)
        .map(|m| mip_to_base(m, subsection_quads, mip_quads, num_subsections))
        .collect();

    let mut heights = Vec::with_capacity((side * side) as usize);
    for &fy in &coords {
        for &fx in &coords {
            heights.push(sample_bilinear(base, base_side, fx, fy).round() as u16);
        }
    }

    MipLevel { level, side, heights }
}

/// Все уровни 1..=max_level
pub fn generate_mips(base: &[u16], subsection_quads: u32, num_subsections: u32, max_level: u32) -> Vec<MipLevel> {
    (1..=max_level)
        .map(|level| generate_mip(base, subsection_quads, num_subsections, level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(side: u32) -> Vec<u16> {
        (0..side * side).map(|i| ((i % side) * 100 + (i / side) * 7) as u16).collect()
    }

    #[test]
    fn test_mip_sizes() {
        assert_eq!(mip_subsection_quads(63, 0), 63);
        assert_eq!(mip_subsection_quads(63, 1), 31);
        assert_eq!(mip_subsection_quads(63, 5), 1);
        assert_eq!(mip_side(7, 2, 1), 7);
        assert_eq!(mip_side(7, 2, 2), 3);
    }

    #[test]
    fn test_mip_keeps_corners_and_subsection_edges() {
        let base = ramp(15);
        let mip = generate_mip(&base, 7, 2, 1);
        assert_eq!(mip.side, 7);
        // Углы
        assert_eq!(mip.heights[0], base[0]);
        assert_eq!(mip.heights[6], base[14]);
        assert_eq!(mip.heights[6 * 7 + 6], base[14 * 15 + 14]);
        // Граница подсекций: mip x=3 -> base x=7
        assert_eq!(mip.heights[3], base[7]);
    }

    #[test]
    fn test_mip_to_base_spans_component() {
        assert_eq!(mip_to_base(0, 63, 31, 1), 0.0);
        assert_eq!(mip_to_base(31, 63, 31, 1), 63.0);
        assert!((mip_to_base(4, 7, 3, 2) - 28.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_generate_all_levels() {
        let base = vec![1000u16; 64 * 64];
        let mips = generate_mips(&base, 63, 1, 5);
        assert_eq!(mips.len(), 5);
        assert_eq!(mips[4].side, 2);
        assert!(mips.iter().all(|m| m.heights.iter().all(|&h| h == 1000)));
    }
}
