// ============================================
// Save System - Хранение ландшафта на диске
// ============================================
// Один файл на компонент: заголовок + тело с ZSTD сжатием

mod header;
mod palette;
mod tile_file;
mod directory;

pub use header::{TileHeader, MAGIC_NUMBER, TILE_VERSION};
pub use palette::LayerPalette;
pub use tile_file::{decode_tile, encode_tile, load_tile, read_header, save_tile};
pub use directory::{load_store, parse_tile_file_name, save_store, tile_file_name, TileDirectory, LAYERS_FILE};
