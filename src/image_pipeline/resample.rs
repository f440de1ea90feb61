//! Resolution alignment module
//!
//! Integer-ratio nearest-neighbour upsampling of a band onto the composite's
//! output grid, restricted to a table of supported replication factors.

mod tiers;
mod nearest;

pub use tiers::ResolutionTiers;
pub use nearest::{resample, Replicate, Resampled};
