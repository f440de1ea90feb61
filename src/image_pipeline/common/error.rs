use std::fmt;

use thiserror::Error;

/// Pipeline step in which a channel failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Resample,
    Quantize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Resample => "resample",
            Stage::Quantize => "quantize",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Failed to read channel data: {0}")]
    ChannelRead(String),

    #[error("Unsupported resolution ratio: {native}px cannot be aligned to {target}px")]
    UnsupportedResolutionRatio { native: usize, target: usize },

    #[error("Degenerate dynamic range: every sample equals {value}")]
    DegenerateRange { value: u16 },

    #[error("Georeference unavailable: {0}")]
    GeoreferenceUnavailable(String),

    #[error("Band buffer of {0} samples is not a square raster")]
    InvalidBandBuffer(usize),

    #[error("Invalid raster dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("{mode} composite expects {expected} channel(s), got {actual}")]
    ChannelCount {
        mode: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Channel {index} failed during {stage}: {source}")]
    Channel {
        index: usize,
        stage: Stage,
        #[source]
        source: Box<CompositeError>,
    },

    #[error("Failed to write output raster: {0}")]
    OutputWrite(String),

    #[error("Composite cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CompositeError {
    /// Wraps `self` with the channel index and stage it came from.
    pub fn in_channel(self, index: usize, stage: Stage) -> Self {
        CompositeError::Channel {
            index,
            stage,
            source: Box::new(self),
        }
    }

    /// Index of the failing channel, if the error is channel-scoped.
    pub fn channel(&self) -> Option<usize> {
        match self {
            CompositeError::Channel { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            CompositeError::Channel { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with any channel wrapping removed.
    pub fn root(&self) -> &CompositeError {
        match self {
            CompositeError::Channel { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;
