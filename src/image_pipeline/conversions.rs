//! Pipeline conversions module
//!
//! Orchestrates a composite: channel reads, resolution alignment,
//! quantization into banded planes, and persistence through a raster store.

mod composite;
mod cancel;
pub mod timing;
pub mod types;


pub use composite::CompositePipeline;
pub use cancel::CancelToken;
pub use timing::{CompositeTimings, StepTiming, Timer};
pub use types::{
    ChannelMode, ChannelSpec, CompositeConfig, CompositeConfigBuilder, CompositeOutput,
    CompositeRequest,
};
