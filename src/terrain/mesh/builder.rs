// ============================================
// Mesh Builder - Меш компонента на уровне LOD
// ============================================
// Сетка по мипу (два треугольника на квад) + юбки по 4 краям,
// которые закрывают щели между соседями с разным LOD.
// Квад с дырой хотя бы в одном углу не попадает в индексы

use crate::core::CyLandSettings;
use crate::terrain::bounds::Aabb;
use crate::terrain::coords::{height_to_local, ComponentKey};
use crate::terrain::heightfield::HeightfieldComponent;
use crate::terrain::layers::LayerId;

use super::vertex::TerrainVertex;

/// Готовый меш компонента
#[derive(Clone, Debug)]
pub struct ComponentMesh {
    pub key: ComponentKey,
    pub lod: u32,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    /// Индексы юбок начинаются с этой позиции
    pub skirt_start: usize,
    pub bounds: Aabb,
}

impl ComponentMesh {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn surface_index_count(&self) -> usize {
        self.skirt_start
    }

    /// Байты вершин для GPU буфера
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Построить меш компонента (lod ограничивается доступными мипами).
/// visibility - слой видимости, его вершины выше порога вырезаются
pub fn build_component_mesh(
    component: &HeightfieldComponent,
    lod: u32,
    settings: &CyLandSettings,
    visibility: Option<LayerId>,
) -> ComponentMesh {
    let lod = lod.min(component.mip_count() - 1);
    let mip = match component.mip(lod) {
        Some(mip) => mip,
        None => return empty_mesh(component, lod, settings),
    };

    let ds = settings.draw_scale;
    let side = mip.side;
    let size_quads = component.size_quads() as f32;
    let base_side = component.size_verts();
    let (bx, by) = component.section_base();
    let weights = component.weights();

    // Координаты вершин мипа в mip 0
    let base_coords: Vec<f32> = (0..side).map(|m| mip.to_base(m)).collect();

    let mut vertices = Vec::with_capacity((side * side + side * 4) as usize);
    let mut holes = Vec::with_capacity((side * side) as usize);
    let mut indices = Vec::with_capacity(((side - 1) * (side - 1) * 6 + (side - 1) * 24) as usize);

    for my in 0..side {
        for mx in 0..side {
            let fx = base_coords[mx as usize];
            let fy = base_coords[my as usize];
            let nx = (fx.round() as u32).min(base_side - 1);
            let ny = (fy.round() as u32).min(base_side - 1);

            let position = [
                (bx as f32 + fx) * ds[0],
                (by as f32 + fy) * ds[1],
                height_to_local(mip.height(mx, my)) * ds[2],
            ];
            let uv = [fx / size_quads, fy / size_quads];
            let normal = component.normal(nx, ny);

            let vertex = match weights.dominant(nx, ny) {
                Some(layer) => TerrainVertex::with_layer(position, normal, uv, layer.0, weights.weight(layer, nx, ny)),
                None => TerrainVertex::new(position, normal, uv),
            };
            vertices.push(vertex);
            holes.push(weights.is_hole(visibility, nx, ny));
        }
    }

    for my in 0..side - 1 {
        for mx in 0..side - 1 {
            let i00 = my * side + mx;
            let i10 = i00 + 1;
            let i01 = i00 + side;
            let i11 = i01 + 1;
            if [i00, i10, i01, i11].iter().any(|&i| holes[i as usize]) {
                continue;
            }
            // CCW при взгляде сверху (Z вверх)
            indices.extend_from_slice(&[i00, i10, i11, i00, i11, i01]);
        }
    }

    let skirt_start = indices.len();
    add_skirts(&mut vertices, &mut indices, side, settings.skirt_depth * ds[2]);

    ComponentMesh {
        key: component.key(),
        lod,
        vertices,
        indices,
        skirt_start,
        bounds: component.world_bounds(ds),
    }
}

fn empty_mesh(component: &HeightfieldComponent, lod: u32, settings: &CyLandSettings) -> ComponentMesh {
    ComponentMesh {
        key: component.key(),
        lod,
        vertices: Vec::new(),
        indices: Vec::new(),
        skirt_start: 0,
        bounds: component.world_bounds(settings.draw_scale),
    }
}

/// Юбки по краям: копия краевой вершины, опущенная на depth
fn add_skirts(vertices: &mut Vec<TerrainVertex>, indices: &mut Vec<u32>, side: u32, depth: f32) {
    let last = side - 1;
    // (индексы краевых вершин по порядку, внешняя нормаль)
    let edges: [(Vec<u32>, [f32; 3]); 4] = [
        ((0..side).collect(), [0.0, -1.0, 0.0]),
        ((0..side).map(|x| last * side + x).collect(), [0.0, 1.0, 0.0]),
        ((0..side).map(|y| y * side).collect(), [-1.0, 0.0, 0.0]),
        ((0..side).map(|y| y * side + last).collect(), [1.0, 0.0, 0.0]),
    ];

    for (edge, normal) in edges.iter() {
        let bottom_start = vertices.len() as u32;
        for &top in edge {
            let mut v = vertices[top as usize];
            v.position[2] -= depth;
            v.normal = *normal;
            vertices.push(v);
        }

        // Порядок обхода зависит от стороны, чтобы юбка смотрела наружу
        let flip = normal[0] < 0.0 || normal[1] > 0.0;
        for i in 0..edge.len() - 1 {
            let t0 = edge[i];
            let t1 = edge[i + 1];
            let b0 = bottom_start + i as u32;
            let b1 = b0 + 1;
            if flip {
                indices.extend_from_slice(&[t0, b1, b0, t0, t1, b1]);
            } else {
                indices.extend_from_slice(&[t0, b0, b1, t0, b1, t1]);
            }
        }
    }
}

/// Доминантный слой вершины меша (None = нет покраски)
#[inline]
pub fn vertex_layer(vertex: &TerrainVertex) -> Option<LayerId> {
    (vertex.layer != LayerId::NONE as u32).then(|| LayerId(vertex.layer as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::heightfield::HeightfieldStore;
    use crate::terrain::coords::{VertexRect, MID_VALUE};
    use crate::terrain::layers::{LayerInfo, PaintingRestriction};

    fn settings() -> CyLandSettings {
        CyLandSettings {
            subsection_size_quads: 7,
            num_subsections: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_index_counts_per_lod() {
        let settings = settings();
        let component = HeightfieldComponent::new_flat(ComponentKey::new(0, 0), &settings);
        for (lod, quads) in [(0u32, 14usize), (1, 6), (2, 2)] {
            let mesh = build_component_mesh(&component, lod, &settings, None);
            assert_eq!(mesh.surface_index_count(), 6 * quads * quads);
            assert_eq!(mesh.indices.len(), 6 * quads * quads + 24 * quads);
            assert_eq!(mesh.vertices.len(), (quads + 1) * (quads + 1) + 4 * (quads + 1));
        }
        let clamped = build_component_mesh(&component, 9, &settings, None);
        assert_eq!(clamped.lod, 2);
    }

    #[test]
    fn test_corner_positions_and_skirt_depth() {
        let settings = settings();
        let component = HeightfieldComponent::new_flat(ComponentKey::new(1, 2), &settings);
        let mesh = build_component_mesh(&component, 1, &settings, None);
        let first = mesh.vertices[0];
        assert_eq!(first.position, [1400.0, 2800.0, 0.0]);
        let corner = mesh.vertices[6 * 7 + 6];
        assert_eq!(corner.position, [2800.0, 4200.0, 0.0]);
        assert_eq!(corner.uv, [1.0, 1.0]);
        let skirt = mesh.vertices[49];
        assert_eq!(skirt.position[2], -800.0);
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * TerrainVertex::SIZE);
    }

    #[test]
    fn test_neighbour_edges_line_up() {
        let mut store = HeightfieldStore::new(settings()).unwrap();
        store.create_rect(ComponentKey::new(0, 0), ComponentKey::new(1, 0));
        let rect = VertexRect::new(0, 0, 28, 14);
        let data: Vec<u16> = rect.iter().map(|(x, y)| MID_VALUE + ((x * 37 + y * 11) % 500) as u16).collect();
        store.set_height_data(rect, &data, false).unwrap();

        let a = build_component_mesh(store.component(ComponentKey::new(0, 0)).unwrap(), 1, store.settings(), None);
        let b = build_component_mesh(store.component(ComponentKey::new(1, 0)).unwrap(), 1, store.settings(), None);
        for y in 0..7 {
            assert_eq!(a.vertices[y * 7 + 6].position, b.vertices[y * 7].position);
        }
    }

    #[test]
    fn test_dominant_layer_in_vertices() {
        let mut store = HeightfieldStore::new(settings()).unwrap();
        let rock = store.layers_mut().register(LayerInfo::new("rock")).unwrap();
        store.create_component(ComponentKey::new(0, 0));
        store
            .set_alpha_data(rock, VertexRect::new(0, 0, 0, 0), &[255], PaintingRestriction::None, true)
            .unwrap();
        let mesh = build_component_mesh(store.component(ComponentKey::new(0, 0)).unwrap(), 0, store.settings(), None);
        assert_eq!(vertex_layer(&mesh.vertices[0]), Some(rock));
        assert_eq!(mesh.vertices[0].layer_weight, 1.0);
        assert_eq!(vertex_layer(&mesh.vertices[1]), None);
    }

    #[test]
    fn test_visibility_layer_cuts_quads() {
        let mut store = HeightfieldStore::new(settings()).unwrap();
        let grass = store.layers_mut().register(LayerInfo::new("grass")).unwrap();
        let hole = store.layers_mut().ensure_visibility_layer().unwrap();
        store.create_component(ComponentKey::new(0, 0));
        let all = VertexRect::new(0, 0, 14, 14);
        store.set_alpha_data(grass, all, &vec![255; all.len()], PaintingRestriction::None, true).unwrap();
        store
            .set_alpha_data(hole, VertexRect::new(5, 5, 5, 5), &[255], PaintingRestriction::None, true)
            .unwrap();

        let component = store.component(ComponentKey::new(0, 0)).unwrap();
        // Слой видимости не сдвигает веса остальных слоёв
        assert_eq!(component.weights().weight(grass, 5, 5), 255);

        let full = build_component_mesh(component, 0, store.settings(), None);
        let cut = build_component_mesh(component, 0, store.settings(), Some(hole));
        assert_eq!(full.surface_index_count(), 6 * 14 * 14);
        // Вершина (5, 5) - угол четырёх квадов
        assert_eq!(cut.surface_index_count(), 6 * (14 * 14 - 4));
        assert_eq!(cut.indices.len() - cut.skirt_start, full.indices.len() - full.skirt_start);
        assert_eq!(cut.vertices.len(), full.vertices.len());
    }
}
