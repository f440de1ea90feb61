use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::image_pipeline::band::{BandBuffer, BandSelector, DatasetRef};
use crate::image_pipeline::common::error::{CompositeError, Result};
use crate::image_pipeline::store::raster_store::{Georeference, OutputRaster, RasterStore};

#[derive(Default)]
struct Dataset {
    bands: Vec<BandBuffer>,
    names: HashMap<String, usize>,
    georeference: Option<Georeference>,
}

/// In-process raster store.
///
/// Datasets are registered up front; composites written to it can be
/// inspected with [`MemoryStore::written`].
#[derive(Default)]
pub struct MemoryStore {
    datasets: HashMap<DatasetRef, Dataset>,
    outputs: Mutex<HashMap<String, (OutputRaster, Georeference)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `buffer` as the next band of `dataset` and returns its 1-based index.
    pub fn insert_band(&mut self, dataset: impl Into<DatasetRef>, buffer: BandBuffer) -> usize {
        let entry = self.datasets.entry(dataset.into()).or_default();
        entry.bands.push(buffer);
        entry.bands.len()
    }

    pub fn insert_named_band(
        &mut self,
        dataset: impl Into<DatasetRef>,
        name: impl Into<String>,
        buffer: BandBuffer,
    ) -> usize {
        let entry = self.datasets.entry(dataset.into()).or_default();
        entry.bands.push(buffer);
        let index = entry.bands.len();
        entry.names.insert(name.into(), index);
        index
    }

    pub fn set_georeference(&mut self, dataset: impl Into<DatasetRef>, georeference: Georeference) {
        self.datasets.entry(dataset.into()).or_default().georeference = Some(georeference);
    }

    /// Composite written under `output_id`, if any.
    pub fn written(&self, output_id: &str) -> Option<(OutputRaster, Georeference)> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(output_id)
            .cloned()
    }

    pub fn output_count(&self) -> usize {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RasterStore for MemoryStore {
    fn open_band(&self, dataset: &DatasetRef, band: &BandSelector) -> Result<BandBuffer> {
        let entry = self.datasets.get(dataset).ok_or_else(|| {
            CompositeError::ChannelRead(format!("dataset {} not found", dataset))
        })?;

        let index = match band {
            BandSelector::Index(index) => *index,
            BandSelector::Name(name) => entry.names.get(name).copied().unwrap_or(0),
        };

        index
            .checked_sub(1)
            .and_then(|i| entry.bands.get(i))
            .cloned()
            .ok_or_else(|| {
                CompositeError::ChannelRead(format!("{} does not exist in dataset {}", band, dataset))
            })
    }

    fn reference_georeference(&self, dataset: &DatasetRef) -> Result<Georeference> {
        self.datasets
            .get(dataset)
            .and_then(|entry| entry.georeference.clone())
            .ok_or_else(|| {
                CompositeError::GeoreferenceUnavailable(format!("dataset {} has none", dataset))
            })
    }

    fn write_raster(
        &self,
        output_id: &str,
        raster: &OutputRaster,
        georeference: &Georeference,
    ) -> Result<String> {
        debug!(output_id, channels = raster.channels(), "Storing composite in memory");
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(output_id.to_string(), (raster.clone(), georeference.clone()));
        Ok(format!("memory://{}", output_id))
    }
}
