// ============================================
// Grass Builder - Расстановка растительности
// ============================================
// Точка остаётся, если вес слоя >= случайной доли и она не внутри
// исключённых боксов. Точки - Хальтон (2, 3) или сетка с джиттером.

use rayon::prelude::*;
use ultraviolet::Vec3;

use crate::core::CyLandSettings;
use crate::terrain::bounds::Aabb;
use crate::terrain::coords::ComponentKey;
use crate::terrain::heightfield::{HeightfieldComponent, HeightfieldStore};
use crate::terrain::layers::LayerId;

use super::random::{halton, RandomStream};
use super::variety::GrassVariety;

/// Экземпляр растительности
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrassInstance {
    pub position: Vec3,
    pub scale: [f32; 3],
    /// Поворот вокруг Z в градусах
    pub yaw: f32,
    /// Ось Z экземпляра (вверх без выравнивания)
    pub normal: Vec3,
    /// Случайное значение для шейдера
    pub random: f32,
}

/// Выборка весов и высот компонента в мировых координатах
struct ComponentSampler<'a> {
    component: &'a HeightfieldComponent,
    weights: Option<&'a [u8]>,
    draw_scale: [f32; 3],
    base: (i32, i32),
}

impl<'a> ComponentSampler<'a> {
    fn new(component: &'a HeightfieldComponent, layer: LayerId, draw_scale: [f32; 3]) -> Self {
        Self {
            component,
            weights: component.weights().weights_of(layer),
            draw_scale,
            base: component.section_base(),
        }
    }

    #[inline]
    fn local(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.draw_scale[0] - self.base.0 as f32, y / self.draw_scale[1] - self.base.1 as f32)
    }

    /// Вес слоя (0..1)
    fn weight(&self, x: f32, y: f32) -> f32 {
        let Some(weights) = self.weights else { return 0.0 };
        let (tx, ty) = self.local(x, y);
        let side = self.component.size_verts();
        let max = (side - 1) as f32;
        let (tx, ty) = (tx.clamp(0.0, max), ty.clamp(0.0, max));
        let (x0, y0) = (tx.floor() as u32, ty.floor() as u32);
        let (x1, y1) = ((x0 + 1).min(side - 1), (y0 + 1).min(side - 1));
        let (lx, ly) = (tx - x0 as f32, ty - y0 as f32);
        let at = |x: u32, y: u32| weights[(y * side + x) as usize] as f32;
        let top = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * lx;
        let bottom = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * lx;
        (top + (bottom - top) * ly) / 255.0
    }

    /// Точка на поверхности
    fn surface(&self, x: f32, y: f32) -> Vec3 {
        let (tx, ty) = self.local(x, y);
        Vec3::new(x, y, self.component.sample_local(tx, ty) * self.draw_scale[2])
    }
}

/// Нормаль по трём точкам поверхности, всегда вверх
fn surface_normal(a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    if a == b || a == c {
        return None;
    }
    let n = (a - b).cross(a - c);
    if n.mag_sq() <= f32::EPSILON {
        return None;
    }
    let n = n.normalized();
    Some(if n.z < 0.0 { -n } else { n })
}

fn is_excluded(excluded: &[Aabb], point: Vec3) -> bool {
    excluded.iter().any(|b| b.contains(point))
}

/// Расставить растительность по слою компонента
pub fn build_grass(
    component: &HeightfieldComponent,
    settings: &CyLandSettings,
    layer: LayerId,
    variety: &GrassVariety,
    seed: i32,
    excluded: &[Aabb],
) -> Vec<GrassInstance> {
    let ds = settings.draw_scale;
    let (bx, by) = component.section_base();
    let size = component.size_quads() as f32;
    let origin = (bx as f32 * ds[0], by as f32 * ds[1]);
    let extent = (size * ds[0], size * ds[1]);

    let sqrt_max = variety.sqrt_max_instances(extent.0, extent.1);
    if sqrt_max == 0 {
        return Vec::new();
    }

    let sampler = ComponentSampler::new(component, layer, ds);
    if sampler.weights.is_none() {
        return Vec::new();
    }

    let mut stream = RandomStream::new(seed);
    let instances = if variety.halton_base_index > 0 {
        build_halton(&sampler, variety, &mut stream, sqrt_max, origin, extent, excluded)
    } else {
        build_grid(&sampler, variety, &mut stream, sqrt_max, origin, extent, excluded)
    };

    log::trace!(
        "Grass for ({}, {}): {} of {} instances",
        component.key().x, component.key().y, instances.len(), sqrt_max.saturating_mul(sqrt_max)
    );
    instances
}

fn orient(variety: &GrassVariety, stream: &mut RandomStream) -> ([f32; 3], f32) {
    let scale = if variety.has_random_scale() { variety.random_scale(stream) } else { [1.0; 3] };
    let yaw = if variety.random_rotation { stream.fraction() * 360.0 } else { 0.0 };
    (scale, yaw)
}

fn build_halton(
    sampler: &ComponentSampler<'_>,
    variety: &GrassVariety,
    stream: &mut RandomStream,
    sqrt_max: u32,
    origin: (f32, f32),
    extent: (f32, f32),
    excluded: &[Aabb],
) -> Vec<GrassInstance> {
    let div = 1.0 / sqrt_max as f32;
    let div_extent = (extent.0 * div, extent.1 * div);
    let max_num = sqrt_max.saturating_mul(sqrt_max);

    let mut instances = Vec::with_capacity(max_num as usize);
    for index in 0..max_num {
        let halton_index = index.wrapping_add(variety.halton_base_index);
        let hx = halton(halton_index, 2);
        let hy = halton(halton_index, 3);
        let x = origin.0 + hx * extent.0;
        let y = origin.1 + hy * extent.1;

        let weight = sampler.weight(x, y);
        let position = sampler.surface(x, y);
        let keep = weight > 0.0 && weight >= stream.fraction() && !is_excluded(excluded, position);
        if !keep {
            continue;
        }

        let (scale, yaw) = orient(variety, stream);
        let mut normal = Vec3::unit_z();
        if variety.align_to_surface {
            let dx = (x + if hx < 0.5 { div_extent.0 } else { -div_extent.0 }).clamp(origin.0, origin.0 + extent.0);
            let dy = (y + if hy < 0.5 { div_extent.1 } else { -div_extent.1 }).clamp(origin.1, origin.1 + extent.1);
            let px = sampler.surface(dx, y);
            let py = sampler.surface(x, dy);
            if let Some(n) = surface_normal(position, px, py) {
                normal = n;
            }
        }

        instances.push(GrassInstance { position, scale, yaw, normal, random: 0.0 });
    }

    for instance in &mut instances {
        instance.random = stream.fraction();
    }
    instances
}

fn build_grid(
    sampler: &ComponentSampler<'_>,
    variety: &GrassVariety,
    stream: &mut RandomStream,
    sqrt_max: u32,
    origin: (f32, f32),
    extent: (f32, f32),
    excluded: &[Aabb],
) -> Vec<GrassInstance> {
    let n = sqrt_max as usize;
    let div = 1.0 / sqrt_max as f32;
    let max_jitter = variety.placement_jitter.clamp(0.0, 0.99) * div * 0.5;
    let jitter = (max_jitter * extent.0, max_jitter * extent.1);
    let start = (origin.0 + extent.0 * div * 0.5, origin.1 + extent.1 * div * 0.5);

    // Первый проход: позиции и решение оставить (x - внешний цикл)
    let mut cells: Vec<(Vec3, bool)> = Vec::with_capacity(n * n);
    for xi in 0..n {
        for yi in 0..n {
            let r1 = stream.fraction();
            let r2 = stream.fraction();
            let x = start.0 + xi as f32 * div * extent.0 + (r1 * 2.0 - 1.0) * jitter.0;
            let y = start.1 + yi as f32 * div * extent.1 + (r2 * 2.0 - 1.0) * jitter.1;
            let weight = sampler.weight(x, y);
            let position = sampler.surface(x, y);
            let keep = weight > 0.0 && weight >= stream.fraction() && !is_excluded(excluded, position);
            cells.push((position, keep));
        }
    }

    let mut instances = Vec::new();
    for xi in 0..n {
        for yi in 0..n {
            let index = xi * n + yi;
            let (position, keep) = cells[index];
            if !keep {
                continue;
            }

            let (scale, yaw) = orient(variety, stream);
            let mut normal = Vec3::unit_z();
            if variety.align_to_surface {
                let x1 = if xi > 0 { cells[index - n].0 } else { position };
                let x2 = if xi + 1 < n { cells[index + n].0 } else { position };
                let y1 = if yi > 0 { cells[index - 1].0 } else { position };
                let y2 = if yi + 1 < n { cells[index + 1].0 } else { position };
                if x1 != x2 && y1 != y2 {
                    let cross = (x1 - x2).cross(y1 - y2);
                    if cross.mag_sq() > f32::EPSILON {
                        let cross = cross.normalized();
                        normal = if cross.z < 0.0 { -cross } else { cross };
                    }
                }
            }
            let random = stream.fraction();
            instances.push(GrassInstance { position, scale, yaw, normal, random });
        }
    }
    instances
}

/// Растительность для всех компонентов хранилища (параллельно)
pub fn build_grass_for_store(
    store: &HeightfieldStore,
    layer: LayerId,
    variety: &GrassVariety,
    seed: i32,
    excluded: &[Aabb],
) -> Vec<(ComponentKey, Vec<GrassInstance>)> {
    let settings = store.settings();
    store
        .keys()
        .par_iter()
        .filter_map(|key| {
            let component = store.component(*key)?;
            let component_seed = seed
                .wrapping_add(key.x.wrapping_mul(7919))
                .wrapping_add(key.y.wrapping_mul(104729));
            let instances = build_grass(component, settings, layer, variety, component_seed, excluded);
            (!instances.is_empty()).then_some((*key, instances))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::coords::{VertexRect, MID_VALUE};
    use crate::terrain::grass::{FloatInterval, GrassScaling};
    use crate::terrain::layers::LayerInfo;

    fn painted_store() -> (HeightfieldStore, LayerId, LayerId) {
        let settings = CyLandSettings {
            subsection_size_quads: 7,
            num_subsections: 1,
            ..Default::default()
        };
        let mut store = HeightfieldStore::new(settings).unwrap();
        let grass = store.layers_mut().register(LayerInfo::new("grass")).unwrap();
        let rock = store.layers_mut().register(LayerInfo::new("rock")).unwrap();
        store.create_component(ComponentKey::new(0, 0));
        let rect = VertexRect::new(0, 0, 7, 7);
        let heights: Vec<u16> = rect.iter().map(|(x, _)| MID_VALUE + x as u16 * 64).collect();
        store.set_height_data(rect, &heights, false).unwrap();
        store.fill_layer(grass).unwrap();
        (store, grass, rock)
    }

    #[test]
    fn test_sqrt_max_instances() {
        let variety = GrassVariety::default();
        assert_eq!(variety.sqrt_max_instances(700.0, 700.0), 14);
        assert_eq!(GrassVariety { density: 0.0, ..Default::default() }.sqrt_max_instances(700.0, 700.0), 0);
        let dense = GrassVariety { density: 1.0e12, ..Default::default() };
        let sqrt_max = dense.sqrt_max_instances(700.0, 700.0);
        assert_eq!(sqrt_max, crate::terrain::grass::MAX_SQRT_INSTANCES);
        assert_eq!(sqrt_max.saturating_mul(sqrt_max), 1 << 24);
    }

    #[test]
    fn test_full_weight_keeps_every_halton_point() {
        let (store, grass, rock) = painted_store();
        let component = store.component(ComponentKey::new(0, 0)).unwrap();
        let variety = GrassVariety::default();
        let instances = build_grass(component, store.settings(), grass, &variety, 5, &[]);
        assert_eq!(instances.len(), 196);
        for instance in &instances {
            let p = instance.position;
            assert!((0.0..=700.0).contains(&p.x) && (0.0..=700.0).contains(&p.y));
            assert!(instance.normal.z > 0.0);
            assert!(instance.normal.x < 0.0);
        }
        assert!(build_grass(component, store.settings(), rock, &variety, 5, &[]).is_empty());
    }

    #[test]
    fn test_same_seed_same_layout() {
        let (store, grass, _) = painted_store();
        let component = store.component(ComponentKey::new(0, 0)).unwrap();
        let variety = GrassVariety {
            scaling: GrassScaling::LockXY,
            scale_x: FloatInterval::new(0.5, 1.5),
            scale_z: FloatInterval::new(1.0, 3.0),
            ..Default::default()
        };
        let a = build_grass(component, store.settings(), grass, &variety, 9, &[]);
        let b = build_grass(component, store.settings(), grass, &variety, 9, &[]);
        assert_eq!(a, b);
        assert!(a.iter().all(|i| i.scale[0] == i.scale[1] && (1.0..=3.0).contains(&i.scale[2])));
    }

    #[test]
    fn test_excluded_box_removes_instances() {
        let (store, grass, _) = painted_store();
        let component = store.component(ComponentKey::new(0, 0)).unwrap();
        let everything = Aabb::new(Vec3::new(-1.0, -1.0, -1.0e6), Vec3::new(701.0, 701.0, 1.0e6));
        let instances = build_grass(component, store.settings(), grass, &GrassVariety::default(), 1, &[everything]);
        assert!(instances.is_empty());
    }

    #[test]
    fn test_jittered_grid_path() {
        let (store, grass, _) = painted_store();
        let variety = GrassVariety { halton_base_index: 0, placement_jitter: 0.5, ..Default::default() };
        let all = build_grass_for_store(&store, grass, &variety, 3, &[]);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1.len(), 196);
    }
}
