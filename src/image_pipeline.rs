//! Band compositing pipeline module
//!
//! Turns one or three 16-bit satellite bands, possibly at different native
//! resolutions, into a single georeferenced 8-bit raster ready for tiling.
//! Band data, resolution alignment, quantization, storage, and the
//! orchestrating compositor each live in their own module.

pub mod band;
pub mod resample;
pub mod quantize;
pub mod store;
pub mod conversions;
pub mod common;

pub use common::{
    CompositeError,
    Result,
    Stage,
};

pub use band::{
    BandBuffer,
    BandSelector,
    ClipBounds,
    DatasetRef,
    IntensityRange,
};

pub use resample::{
    resample,
    ResolutionTiers,
    Resampled,
};

pub use quantize::Quantizer;

pub use store::{
    GeoTiffStore,
    Georeference,
    MemoryStore,
    OutputRaster,
    RasterStore,
    SpatialReference,
    StoreConfig,
    StoreConfigBuilder,
    TiffCompression,
};

pub use conversions::{
    CancelToken,
    ChannelMode,
    ChannelSpec,
    CompositeConfig,
    CompositeConfigBuilder,
    CompositeOutput,
    CompositePipeline,
    CompositeRequest,
    CompositeTimings,
};
