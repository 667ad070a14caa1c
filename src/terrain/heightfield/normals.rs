// ============================================
// Normals - Нормали по разностям высот
// ============================================
// Z - вверх. Нормаль хранится упакованной в 2 байта (x, y),
// z восстанавливается, так как нормаль ландшафта всегда смотрит вверх

use ultraviolet::Vec3;

use crate::terrain::coords::height_to_local;

/// Нормали сетки side x side. lookup отдаёт высоты соседей за краем компонента
pub fn compute_normals<F>(
    base: (i32, i32),
    side: u32,
    heights: &[u16],
    draw_scale: [f32; 3],
    lookup: F,
) -> Vec<[f32; 3]>
where
    F: Fn(i32, i32) -> Option<u16>,
{
    let own = |lx: i32, ly: i32| -> Option<u16> {
        if lx >= 0 && ly >= 0 && (lx as u32) < side && (ly as u32) < side {
            Some(heights[(ly as u32 * side + lx as u32) as usize])
        } else {
            lookup(base.0 + lx, base.1 + ly)
        }
    };

    let mut normals = Vec::with_capacity((side * side) as usize);
    for ly in 0..side as i32 {
        for lx in 0..side as i32 {
            let center = own(lx, ly).unwrap_or(0);
            let (left, span_l) = own(lx - 1, ly).map_or((center, 0.0), |h| (h, 1.0));
            let (right, span_r) = own(lx + 1, ly).map_or((center, 0.0), |h| (h, 1.0));
            let (down, span_d) = own(lx, ly - 1).map_or((center, 0.0), |h| (h, 1.0));
            let (up, span_u) = own(lx, ly + 1).map_or((center, 0.0), |h| (h, 1.0));

            let span_x = span_l + span_r;
            let span_y = span_d + span_u;
            let dzdx = if span_x > 0.0 {
                (height_to_local(right) - height_to_local(left)) * draw_scale[2] / (span_x * draw_scale[0])
            } else {
                0.0
            };
            let dzdy = if span_y > 0.0 {
                (height_to_local(up) - height_to_local(down)) * draw_scale[2] / (span_y * draw_scale[1])
            } else {
                0.0
            };

            let n = Vec3::new(-dzdx, -dzdy, 1.0).normalized();
            normals.push([n.x, n.y, n.z]);
        }
    }
    normals
}

#[inline]
pub fn pack_normal(n: [f32; 3]) -> [u8; 2] {
    let pack = |v: f32| (v.clamp(-1.0, 1.0) * 127.5 + 127.5).round() as u8;
    [pack(n[0]), pack(n[1])]
}

#[inline]
pub fn unpack_normal(packed: [u8; 2]) -> [f32; 3] {
    let x = packed[0] as f32 / 127.5 - 1.0;
    let y = packed[1] as f32 / 127.5 - 1.0;
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    [x, y, z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::coords::MID_VALUE;

    #[test]
    fn test_flat_normals_point_up() {
        let heights = vec![MID_VALUE; 9];
        let normals = compute_normals((0, 0), 3, &heights, [100.0, 100.0, 100.0], |_, _| None);
        assert!(normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_slope_normal_tilts_against_gradient() {
        // Высота растёт по X на 1 локальную единицу за квад
        let heights: Vec<u16> = (0..9).map(|i| MID_VALUE + (i % 3) as u16 * 128).collect();
        let normals = compute_normals((0, 0), 3, &heights, [1.0, 1.0, 1.0], |_, _| None);
        let n = normals[4];
        assert!(n[0] < 0.0);
        assert!(n[1].abs() < 1e-6);
        assert!((n[0] + std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_pack_unpack_close() {
        let n = Vec3::new(0.3, -0.2, 1.0).normalized();
        let back = unpack_normal(pack_normal([n.x, n.y, n.z]));
        assert!((back[0] - n.x).abs() < 0.01);
        assert!((back[1] - n.y).abs() < 0.01);
        assert!((back[2] - n.z).abs() < 0.01);
    }
}
