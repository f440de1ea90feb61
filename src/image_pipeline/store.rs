//! Raster store module
//!
//! Boundary to the storage that supplies native band data and georeferences
//! and persists finished composites. `GeoTiffStore` works on files,
//! `MemoryStore` keeps everything in process.

mod raster_store;
mod geotiff_store;
mod memory_store;
pub mod types;

#[cfg(test)]
mod tests;

pub use raster_store::{Georeference, OutputRaster, RasterStore, SpatialReference};
pub use geotiff_store::GeoTiffStore;
pub use memory_store::MemoryStore;
pub use types::{StoreConfig, StoreConfigBuilder, TiffCompression};
