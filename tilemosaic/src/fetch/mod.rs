//! Tile fetching
//!
//! A [`FetchWorker`] downloads one tile with bounded retries, decodes it to
//! a 256×256 RGB block and writes it into a [`TileSink`]: a canvas row band
//! or the on-disk tile cache.

mod sink;
mod types;
mod worker;

pub use sink::{
    canvas_bands, parse_tile_file_name, tile_file_name, CanvasBand, TileCache,
    TileFormat, TileSink,
};
pub(crate) use sink::write_atomic;
pub use types::{FetchError, FetchTask, SinkError, TaskStatus};
pub use worker::{decode_tile, fetch_tile_bytes, FetchWorker, DEFAULT_RETRY_LIMIT};
