//! Band data types

use std::fmt;

use crate::image_pipeline::common::error::{CompositeError, Result};

/// Square raster of unsigned 16-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandBuffer {
    side: usize,
    samples: Vec<u16>,
}

impl BandBuffer {
    /// Wraps `samples`, rejecting sample counts that are not a perfect square.
    pub fn new(samples: Vec<u16>) -> Result<Self> {
        let side = samples.len().isqrt();
        if side * side != samples.len() {
            return Err(CompositeError::InvalidBandBuffer(samples.len()));
        }
        Ok(Self { side, samples })
    }

    /// A `side`×`side` buffer with every sample set to `value`.
    pub fn filled(side: usize, value: u16) -> Self {
        Self {
            side,
            samples: vec![value; side * side],
        }
    }

    pub fn from_fn(side: usize, mut f: impl FnMut(usize, usize) -> u16) -> Self {
        let mut samples = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                samples.push(f(row, col));
            }
        }
        Self { side, samples }
    }

    /// Native resolution (side length in pixels).
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<u16> {
        self.samples
    }
}

/// Intensity window for one channel. Samples strictly outside it quantize to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBounds {
    pub min: f64,
    pub max: f64,
}

impl ClipBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whole u16 domain; nothing is clipped.
    pub fn unclipped() -> Self {
        Self {
            min: 0.0,
            max: u16::MAX as f64,
        }
    }

    #[inline]
    pub fn contains(&self, sample: f64) -> bool {
        !(sample < self.min || self.max < sample)
    }
}

/// Which band of a dataset feeds a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandSelector {
    /// 1-based band index.
    Index(usize),
    /// Descriptive band name (e.g. `B04`), resolved by the raster store.
    Name(String),
}

impl Default for BandSelector {
    fn default() -> Self {
        BandSelector::Index(1)
    }
}

impl fmt::Display for BandSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandSelector::Index(index) => write!(f, "band {}", index),
            BandSelector::Name(name) => write!(f, "band '{}'", name),
        }
    }
}

/// Opaque dataset reference understood by a raster store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef(String);

impl DatasetRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetRef {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

impl From<String> for DatasetRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}
