use crate::image_pipeline::band::{BandBuffer, BandSelector, DatasetRef};
use crate::image_pipeline::common::error::Result;

/// Storage collaborator of the compositor.
///
/// Implementations are shared across the channel read fan-out, hence `Sync`.
pub trait RasterStore: Send + Sync {
    /// Reads one band of `dataset` at its native resolution.
    fn open_band(&self, dataset: &DatasetRef, band: &BandSelector) -> Result<BandBuffer>;

    /// Georeference of `dataset`, copied onto composites.
    fn reference_georeference(&self, dataset: &DatasetRef) -> Result<Georeference>;

    /// Persists `raster` under `output_id` and returns where it was written.
    fn write_raster(
        &self,
        output_id: &str,
        raster: &OutputRaster,
        georeference: &Georeference,
    ) -> Result<String>;
}

/// GeoTIFF key directory and its parameter blocks, carried verbatim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpatialReference {
    pub geo_key_directory: Vec<u16>,
    pub geo_double_params: Vec<f64>,
    pub geo_ascii_params: String,
}

/// Placement of a raster: origin of the upper-left corner, pixel size,
/// rotation terms, and spatial reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Georeference {
    pub origin: (f64, f64),
    /// Pixel width and height; height is negative for north-up rasters.
    pub pixel_size: (f64, f64),
    /// Row and column rotation terms.
    pub rotation: (f64, f64),
    pub spatial_reference: SpatialReference,
}

impl Georeference {
    /// From an affine transform in `[x0, dx, rx, y0, ry, dy]` order.
    pub fn from_geo_transform(gt: [f64; 6], spatial_reference: SpatialReference) -> Self {
        Self {
            origin: (gt[0], gt[3]),
            pixel_size: (gt[1], gt[5]),
            rotation: (gt[2], gt[4]),
            spatial_reference,
        }
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.origin.0,
            self.pixel_size.0,
            self.rotation.0,
            self.origin.1,
            self.rotation.1,
            self.pixel_size.1,
        ]
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation.0 != 0.0 || self.rotation.1 != 0.0
    }
}

/// 8-bit composite in banded layout: `channels` contiguous planes of
/// `resolution`² bytes each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRaster {
    resolution: usize,
    channels: usize,
    data: Vec<u8>,
}

impl OutputRaster {
    /// Zero-filled raster.
    pub fn new(resolution: usize, channels: usize) -> Self {
        Self {
            resolution,
            channels,
            data: vec![0u8; resolution * resolution * channels],
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn plane_len(&self) -> usize {
        self.resolution * self.resolution
    }

    /// Plane of channel `index`, starting at byte `index × resolution²`.
    pub fn plane(&self, index: usize) -> &[u8] {
        let len = self.plane_len();
        &self.data[index * len..(index + 1) * len]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        let len = self.plane_len();
        &mut self.data[index * len..(index + 1) * len]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
