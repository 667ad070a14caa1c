// ============================================
// Tile File - Чтение/запись компонента
// ============================================
// [заголовок bincode, 24 байта][тело bincode + ZSTD]
// Тело: высоты, упакованные нормали (2 байта), палитра слоёв и их веса

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::core::{CyLandError, CyLandSettings, Result};
use crate::terrain::heightfield::{pack_normal, unpack_normal, HeightfieldComponent};
use crate::terrain::layers::{ComponentWeights, LayerId, LayerRegistry};

use super::header::{TileHeader, MAGIC_NUMBER, TILE_VERSION};
use super::palette::{lookup, LayerPalette};

/// Уровень ZSTD: карты высот хорошо жмутся уже на низких уровнях
const COMPRESSION_LEVEL: i32 = 3;

/// Запас на палитру, длины векторов и белый список
const BODY_SLACK_BYTES: u64 = 1 << 20;

/// Верхняя граница распакованного тела для раскладки компонента:
/// высоты, нормали и по байту на вершину для каждого возможного слоя
fn max_body_bytes(settings: &CyLandSettings) -> u64 {
    let side = settings.component_size_verts() as u64;
    side * side * (2 + 2 + LayerId::NONE as u64) + BODY_SLACK_BYTES
}

/// Веса одного слоя
#[derive(Debug, Serialize, Deserialize)]
struct SavedLayer {
    /// Индекс в палитре тайла
    palette_index: u8,
    weights: Vec<u8>,
}

/// Тело файла (сжимается ZSTD)
#[derive(Debug, Serialize, Deserialize)]
struct TileBody {
    heights: Vec<u16>,
    normals: Vec<[u8; 2]>,
    palette: LayerPalette,
    layers: Vec<SavedLayer>,
    whitelist: Vec<u8>,
}

/// Сериализовать компонент в байты тайла
pub fn encode_tile(component: &HeightfieldComponent, registry: &LayerRegistry) -> Result<Vec<u8>> {
    let header = TileHeader::new(component.key(), component.subsection_quads(), component.num_subsections());
    let mut bytes = bincode::serialize(&header).map_err(|e| CyLandError::Serialize(e.to_string()))?;

    let mut palette = LayerPalette::new();
    let mut layers = Vec::with_capacity(component.weights().layer_count());
    for alloc in component.weights().allocations() {
        layers.push(SavedLayer {
            palette_index: palette.get_or_insert(registry, alloc.layer)?,
            weights: alloc.weights.clone(),
        });
    }
    let whitelist = component
        .weights()
        .whitelist()
        .iter()
        .map(|&layer| palette.get_or_insert(registry, layer))
        .collect::<Result<Vec<u8>>>()?;

    let body = TileBody {
        heights: component.heights().to_vec(),
        normals: component.normals().iter().map(|&n| pack_normal(n)).collect(),
        palette,
        layers,
        whitelist,
    };
    let body_bytes = bincode::serialize(&body).map_err(|e| CyLandError::Serialize(e.to_string()))?;
    let compressed = zstd::encode_all(&body_bytes[..], COMPRESSION_LEVEL)
        .map_err(|e| CyLandError::Compression(e.to_string()))?;
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Прочитать и проверить заголовок
pub fn read_header(reader: &mut impl Read) -> Result<TileHeader> {
    let header_size = bincode::serialized_size(&TileHeader::default())
        .map_err(|e| CyLandError::Serialize(e.to_string()))? as usize;
    let mut header_bytes = vec![0u8; header_size];
    reader.read_exact(&mut header_bytes)?;

    let header: TileHeader =
        bincode::deserialize(&header_bytes).map_err(|e| CyLandError::Deserialize(e.to_string()))?;
    if header.magic != MAGIC_NUMBER {
        return Err(CyLandError::InvalidMagic);
    }
    if header.version != TILE_VERSION {
        return Err(CyLandError::UnsupportedVersion(header.version));
    }
    Ok(header)
}

/// Восстановить компонент из байтов тайла
pub fn decode_tile(bytes: &[u8], settings: &CyLandSettings, registry: &LayerRegistry) -> Result<HeightfieldComponent> {
    let mut reader = bytes;
    let header = read_header(&mut reader)?;
    if !header.matches(settings) {
        return Err(CyLandError::DataSizeMismatch {
            expected: settings.component_size_quads() as usize,
            actual: header.component_size_quads() as usize,
        });
    }

    // Повреждённый тайл не должен раздувать память
    let limit = max_body_bytes(settings);
    let decoder = zstd::stream::read::Decoder::new(reader).map_err(|e| CyLandError::Compression(e.to_string()))?;
    let mut body_bytes = Vec::new();
    decoder
        .take(limit + 1)
        .read_to_end(&mut body_bytes)
        .map_err(|e| CyLandError::Compression(e.to_string()))?;
    if body_bytes.len() as u64 > limit {
        return Err(CyLandError::Compression(format!("tile body exceeds {} bytes", limit)));
    }

    // Та же раскладка, что у bincode::serialize
    let body: TileBody = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
        .deserialize(&body_bytes)
        .map_err(|e| CyLandError::Deserialize(e.to_string()))?;

    let mut component = HeightfieldComponent::from_heights(header.key(), settings, body.heights)?;
    let vertex_count = component.heights().len();

    if body.normals.len() != vertex_count {
        return Err(CyLandError::DataSizeMismatch { expected: vertex_count, actual: body.normals.len() });
    }
    // Сохранённые нормали учитывают соседей, локальный пересчёт их бы испортил
    component.set_normals(body.normals.iter().map(|&n| unpack_normal(n)).collect());

    let resolved = body.palette.resolve(registry)?;
    let mut weights = ComponentWeights::new(component.size_verts());
    for layer in body.layers {
        if layer.weights.len() != vertex_count {
            return Err(CyLandError::DataSizeMismatch { expected: vertex_count, actual: layer.weights.len() });
        }
        *weights.ensure_allocation(lookup(&resolved, layer.palette_index)?) = layer.weights;
    }
    for index in body.whitelist {
        weights.add_to_whitelist(lookup(&resolved, index)?);
    }
    component.set_weights(weights)?;

    Ok(component)
}

/// Сохранить компонент в файл
pub fn save_tile(path: impl AsRef<Path>, component: &HeightfieldComponent, registry: &LayerRegistry) -> Result<()> {
    let bytes = encode_tile(component, registry)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Загрузить компонент из файла
pub fn load_tile(path: impl AsRef<Path>, settings: &CyLandSettings, registry: &LayerRegistry) -> Result<HeightfieldComponent> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_tile(&bytes, settings, registry)
}
