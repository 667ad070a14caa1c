// ============================================
// Collision Builder - Сборка коллизий
// ============================================
// Размер: ((s + 1) >> mip) - 1) * num_subsections квадов.
// Простая коллизия только если её мип грубее основного.
// Квад - дыра, если хотя бы один его угол закрашен слоем видимости.

use rayon::prelude::*;

use crate::core::CyLandSettings;
use crate::terrain::heightfield::{HeightfieldComponent, HeightfieldStore, MipView};
use crate::terrain::layers::LayerId;

use super::heightfield::{CollisionHeightfield, SimpleCollision};

/// Вершины мипа -> ближайшие вершины mip 0
fn base_coords(component: &HeightfieldComponent, mip: &MipView<'_>) -> Vec<u32> {
    let last = component.size_verts() - 1;
    (0..mip.side).map(|m| (mip.to_base(m).round() as u32).min(last)).collect()
}

fn dominant_layers(component: &HeightfieldComponent, mip: &MipView<'_>) -> Vec<u8> {
    let weights = component.weights();
    let coords = base_coords(component, mip);

    let mut layers = Vec::with_capacity((mip.side * mip.side) as usize);
    for &y in &coords {
        for &x in &coords {
            layers.push(weights.dominant(x, y).map_or(LayerId::NONE, |l| l.0));
        }
    }
    layers
}

fn hole_quads(component: &HeightfieldComponent, mip: &MipView<'_>, visibility: Option<LayerId>) -> Vec<bool> {
    let quads = mip.quads() as usize;
    if visibility.is_none() {
        return vec![false; quads * quads];
    }
    let weights = component.weights();
    let coords = base_coords(component, mip);
    let side = coords.len();
    let vertex_holes: Vec<bool> = coords
        .iter()
        .flat_map(|&y| coords.iter().map(move |&x| (x, y)))
        .map(|(x, y)| weights.is_hole(visibility, x, y))
        .collect();

    let mut holes = Vec::with_capacity(quads * quads);
    for qy in 0..quads {
        for qx in 0..quads {
            let i00 = qy * side + qx;
            let corners = [i00, i00 + 1, i00 + side, i00 + side + 1];
            holes.push(corners.iter().any(|&i| vertex_holes[i]));
        }
    }
    holes
}

/// Коллизия одного компонента. visibility - слой видимости (дыры)
pub fn build_collision(
    component: &HeightfieldComponent,
    settings: &CyLandSettings,
    visibility: Option<LayerId>,
) -> CollisionHeightfield {
    let max_mip = component.mip_count() - 1;
    let mip_level = (settings.collision_mip_level.max(0) as u32).min(max_mip);
    let simple_level = (settings.simple_collision_mip_level.max(0) as u32).min(max_mip);

    // mip_level <= max_mip, уровень всегда есть
    let (size_quads, heights, dominant, holes) = match component.mip(mip_level) {
        Some(mip) => (
            mip.quads(),
            mip.heights.to_vec(),
            dominant_layers(component, &mip),
            hole_quads(component, &mip, visibility),
        ),
        None => (0, vec![0], vec![LayerId::NONE], Vec::new()),
    };

    let simple = if simple_level > mip_level {
        component.mip(simple_level).map(|mip| SimpleCollision {
            mip_level: simple_level,
            size_quads: mip.quads(),
            heights: mip.heights.to_vec(),
        })
    } else {
        None
    };

    let ds = settings.draw_scale;
    let (bx, by) = component.section_base();
    let world_size = settings.component_world_size();

    CollisionHeightfield {
        key: component.key(),
        mip_level,
        size_quads,
        heights,
        dominant_layers: dominant,
        holes,
        simple,
        thickness: settings.collision_thickness,
        world_size,
        origin: [bx as f32 * ds[0], by as f32 * ds[1]],
        height_scale: ds[2],
    }
}

/// Коллизии всех компонентов хранилища (параллельно)
pub fn build_collision_all(store: &HeightfieldStore) -> Vec<CollisionHeightfield> {
    let settings = store.settings();
    let visibility = store.layers().visibility_layer();
    let keys = store.keys();
    keys.par_iter()
        .filter_map(|key| store.component(*key))
        .map(|component| build_collision(component, settings, visibility))
        .collect()
}
