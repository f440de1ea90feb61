//! Band data module
//!
//! Native-resolution intensity samples for one channel, the caller's clip
//! window, and the observed intensity range used as the quantization denominator.

pub mod types;
mod range;

pub use types::{BandBuffer, BandSelector, ClipBounds, DatasetRef};
pub use range::IntensityRange;
