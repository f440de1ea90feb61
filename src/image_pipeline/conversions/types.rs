//! Composite request and configuration types

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::band::{BandSelector, ClipBounds, DatasetRef};
use crate::image_pipeline::common::error::{CompositeError, Result};
use crate::image_pipeline::conversions::timing::CompositeTimings;
use crate::image_pipeline::resample::ResolutionTiers;

/// Output colour mode of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// One channel, one plane
    Grayscale,
    /// Red, green and blue channels, in that order
    Rgb,
}

impl ChannelMode {
    pub fn expected_channels(&self) -> usize {
        match self {
            ChannelMode::Grayscale => 1,
            ChannelMode::Rgb => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Grayscale => "grayscale",
            ChannelMode::Rgb => "rgb",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(ChannelMode::Grayscale),
            "rgb" => Ok(ChannelMode::Rgb),
            other => Err(format!("unknown channel mode '{}', expected grayscale or rgb", other)),
        }
    }
}

/// One input channel: where its band lives and its clip window
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub dataset: DatasetRef,
    pub band: BandSelector,
    pub bounds: ClipBounds,
}

impl ChannelSpec {
    pub fn new(dataset: impl Into<DatasetRef>, band: BandSelector, bounds: ClipBounds) -> Self {
        Self {
            dataset: dataset.into(),
            band,
            bounds,
        }
    }
}

/// A caller's composite request
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRequest {
    pub channels: Vec<ChannelSpec>,
    /// Dataset whose georeference is copied onto the output
    pub reference: DatasetRef,
    pub mode: ChannelMode,
}

impl CompositeRequest {
    pub fn grayscale(channel: ChannelSpec, reference: impl Into<DatasetRef>) -> Self {
        Self {
            channels: vec![channel],
            reference: reference.into(),
            mode: ChannelMode::Grayscale,
        }
    }

    pub fn rgb(
        red: ChannelSpec,
        green: ChannelSpec,
        blue: ChannelSpec,
        reference: impl Into<DatasetRef>,
    ) -> Self {
        Self {
            channels: vec![red, green, blue],
            reference: reference.into(),
            mode: ChannelMode::Rgb,
        }
    }

    /// Checks the channel count against the mode.
    pub fn validate(&self) -> Result<()> {
        let expected = self.mode.expected_channels();
        if self.channels.len() != expected {
            return Err(CompositeError::ChannelCount {
                mode: self.mode.as_str(),
                expected,
                actual: self.channels.len(),
            });
        }
        Ok(())
    }
}

/// Result of a successful composite
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    /// Fresh identifier the output was persisted under
    pub id: String,
    /// Store-specific location of the persisted raster
    pub location: String,
    /// Side length of the output planes
    pub resolution: usize,
    pub channels: usize,
    pub timings: CompositeTimings,
}

/// Configuration for the compositor
#[derive(Debug, Clone)]
pub struct CompositeConfig {
    /// Replication factors accepted when aligning channels
    pub tiers: ResolutionTiers,
    /// Whether to check the output resolution before allocating planes
    pub validate_dimensions: bool,
    /// Largest accepted output side length
    pub max_resolution: Option<usize>,
    /// Read and render channels concurrently
    pub parallel: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            tiers: ResolutionTiers::default(),
            validate_dimensions: true,
            max_resolution: Some(20_000),
            parallel: true,
        }
    }
}

impl CompositeConfig {
    pub fn builder() -> CompositeConfigBuilder {
        CompositeConfigBuilder::default()
    }
}

/// Builder for CompositeConfig
#[derive(Default)]
pub struct CompositeConfigBuilder {
    tiers: Option<ResolutionTiers>,
    validate_dimensions: Option<bool>,
    max_resolution: Option<Option<usize>>,
    parallel: Option<bool>,
}

impl CompositeConfigBuilder {
    pub fn tiers(mut self, tiers: ResolutionTiers) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_resolution(mut self, max: Option<usize>) -> Self {
        self.max_resolution = Some(max);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn build(self) -> CompositeConfig {
        let default = CompositeConfig::default();
        CompositeConfig {
            tiers: self.tiers.unwrap_or(default.tiers),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_resolution: self.max_resolution.unwrap_or(default.max_resolution),
            parallel: self.parallel.unwrap_or(default.parallel),
        }
    }
}
