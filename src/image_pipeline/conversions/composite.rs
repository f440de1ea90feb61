use rayon::prelude::*;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::image_pipeline::{
    band::{BandBuffer, ClipBounds, IntensityRange},
    common::error::{CompositeError, Result, Stage},
    conversions::{
        cancel::CancelToken,
        timing::{CompositeTimings, Timer},
        types::{ChannelSpec, CompositeConfig, CompositeOutput, CompositeRequest},
    },
    quantize::Quantizer,
    resample::resample,
    store::{GeoTiffStore, OutputRaster, RasterStore, StoreConfig},
};

/// Band compositor over a raster store.
///
/// Reads one or three channels, aligns them to the highest native resolution
/// among them, quantizes each into its own plane of a banded 8-bit raster,
/// and persists the result with the reference dataset's georeference. Any
/// failure aborts the whole composite before anything is written.
pub struct CompositePipeline<S: RasterStore> {
    store: S,
    config: CompositeConfig,
}

impl CompositePipeline<GeoTiffStore> {
    pub fn new(store_config: StoreConfig, config: CompositeConfig) -> Self {
        Self {
            store: GeoTiffStore::new(store_config),
            config,
        }
    }
}

impl<S: RasterStore> CompositePipeline<S> {
    pub fn with_store(store: S, config: CompositeConfig) -> Self {
        Self { store, config }
    }

    pub fn composite(&self, request: &CompositeRequest) -> Result<CompositeOutput> {
        self.composite_cancellable(request, &CancelToken::new())
    }

    /// Like [`composite`](Self::composite), abandoning the work once `cancel` is set.
    #[instrument(
        skip(self, request, cancel),
        fields(mode = %request.mode, channels = request.channels.len())
    )]
    pub fn composite_cancellable(
        &self,
        request: &CompositeRequest,
        cancel: &CancelToken,
    ) -> Result<CompositeOutput> {
        request.validate()?;
        let mut timings = CompositeTimings::new();
        info!(reference = %request.reference, "Starting composite");

        let georeference = {
            let _span = tracing::info_span!("georeference").entered();
            let timer = Timer::start("georeference");
            let georeference = self.store.reference_georeference(&request.reference)?;
            timings.record(timer);
            georeference
        };

        let buffers = {
            let _span = tracing::info_span!("read_channels").entered();
            let timer = Timer::start("read_channels");
            let buffers = self.read_channels(&request.channels, cancel)?;
            timings.record(timer);
            buffers
        };
        cancel.check()?;

        let resolution = output_resolution(&buffers);
        self.validate_resolution(resolution)?;

        let raster = {
            let _span = tracing::info_span!("align_and_quantize", resolution).entered();
            let timer = Timer::start("align_and_quantize");
            let raster = self.render(&request.channels, &buffers, resolution)?;
            timings.record(timer);
            raster
        };
        drop(buffers);
        cancel.check()?;

        let id = Uuid::new_v4().to_string();
        let location = {
            let _span = tracing::info_span!("write_output", %id).entered();
            let timer = Timer::start("write_output");
            let location = self.store.write_raster(&id, &raster, &georeference)?;
            timings.record(timer);
            location
        };

        info!(
            %id,
            resolution,
            channels = raster.channels(),
            "Composite complete in {:.3}ms",
            timings.total_duration().as_secs_f64() * 1000.0
        );

        Ok(CompositeOutput {
            id,
            location,
            resolution,
            channels: raster.channels(),
            timings,
        })
    }

    /// Fan-out read of every channel; the first failure wins.
    fn read_channels(
        &self,
        channels: &[ChannelSpec],
        cancel: &CancelToken,
    ) -> Result<Vec<BandBuffer>> {
        let read = |(index, spec): (usize, &ChannelSpec)| -> Result<BandBuffer> {
            cancel.check()?;
            let buffer = self
                .store
                .open_band(&spec.dataset, &spec.band)
                .map_err(|e| e.in_channel(index, Stage::Read))?;
            debug!(channel = index, side = buffer.side(), dataset = %spec.dataset, "Channel read");
            Ok(buffer)
        };

        if self.config.parallel {
            channels.par_iter().enumerate().map(read).collect()
        } else {
            channels.iter().enumerate().map(read).collect()
        }
    }

    fn validate_resolution(&self, resolution: usize) -> Result<()> {
        if resolution == 0 {
            return Err(CompositeError::InvalidDimensions(0, 0));
        }

        if !self.config.validate_dimensions {
            return Ok(());
        }

        if let Some(max) = self.config.max_resolution {
            if resolution > max {
                debug!(resolution, max, "Resolution limit exceeded");
                return Err(CompositeError::InvalidDimensions(resolution, resolution));
            }
        }

        Ok(())
    }

    /// Fills one plane per channel. Planes are disjoint, so channels render
    /// independently; the lowest-index failure is reported.
    fn render(
        &self,
        channels: &[ChannelSpec],
        buffers: &[BandBuffer],
        resolution: usize,
    ) -> Result<OutputRaster> {
        let mut raster = OutputRaster::new(resolution, buffers.len());
        let plane_len = raster.plane_len();

        let results: Vec<Result<()>> = if self.config.parallel {
            raster
                .data_mut()
                .par_chunks_exact_mut(plane_len)
                .zip(buffers.par_iter())
                .zip(channels.par_iter())
                .enumerate()
                .map(|(index, ((plane, buffer), spec))| {
                    self.render_channel(index, buffer, spec.bounds, resolution, plane)
                })
                .collect()
        } else {
            raster
                .data_mut()
                .chunks_exact_mut(plane_len)
                .zip(buffers)
                .zip(channels)
                .enumerate()
                .map(|(index, ((plane, buffer), spec))| {
                    self.render_channel(index, buffer, spec.bounds, resolution, plane)
                })
                .collect()
        };

        results.into_iter().collect::<Result<()>>()?;
        Ok(raster)
    }

    fn render_channel(
        &self,
        index: usize,
        buffer: &BandBuffer,
        bounds: ClipBounds,
        resolution: usize,
        plane: &mut [u8],
    ) -> Result<()> {
        let samples = resample(buffer, resolution, &self.config.tiers)
            .map_err(|e| e.in_channel(index, Stage::Resample))?;

        let range = IntensityRange::of(buffer);
        debug!(
            channel = index,
            min = range.min,
            max = range.max,
            native = buffer.side(),
            "Quantizing channel"
        );

        Quantizer::new(bounds, range)
            .and_then(|quantizer| quantizer.quantize_into(samples, plane))
            .map_err(|e| e.in_channel(index, Stage::Quantize))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CompositeConfig) {
        self.config = config;
    }
}

/// Output side length: the largest native side among the channels.
pub(crate) fn output_resolution(buffers: &[BandBuffer]) -> usize {
    buffers.iter().map(BandBuffer::side).max().unwrap_or(0)
}
