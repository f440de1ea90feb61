//! Raster store configuration types

use std::path::PathBuf;

/// Compression applied to composite planes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// zlib Deflate, fast level
    Deflate,
}

/// Configuration for the GeoTIFF raster store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Relative dataset references are resolved against this directory
    pub data_root: PathBuf,
    /// Directory receiving `<id>.tif` composites
    pub output_dir: PathBuf,
    /// Compression method to use for output planes
    pub compression: TiffCompression,
    /// Value written as GDAL_NODATA so tilers treat clipped pixels as transparent
    pub nodata: Option<u8>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            compression: TiffCompression::None,
            nodata: Some(0),
        }
    }
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    data_root: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    compression: Option<TiffCompression>,
    nodata: Option<Option<u8>>,
}

impl StoreConfigBuilder {
    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn nodata(mut self, nodata: Option<u8>) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn build(self) -> StoreConfig {
        let default = StoreConfig::default();
        StoreConfig {
            data_root: self.data_root.unwrap_or(default.data_root),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            compression: self.compression.unwrap_or(default.compression),
            nodata: self.nodata.unwrap_or(default.nodata),
        }
    }
}
