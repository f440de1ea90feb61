use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use band_composite_rs::image_pipeline::{
    resample, BandBuffer, BandSelector, ChannelSpec, ClipBounds, CompositeConfig,
    CompositePipeline, CompositeRequest, DatasetRef, Georeference, IntensityRange, MemoryStore,
    OutputRaster, Quantizer, RasterStore, ResolutionTiers, Result, SpatialReference,
};

/// Serves bands from memory and drops composites instead of keeping them.
struct DiscardingStore(MemoryStore);

impl RasterStore for DiscardingStore {
    fn open_band(&self, dataset: &DatasetRef, band: &BandSelector) -> Result<BandBuffer> {
        self.0.open_band(dataset, band)
    }

    fn reference_georeference(&self, dataset: &DatasetRef) -> Result<Georeference> {
        self.0.reference_georeference(dataset)
    }

    fn write_raster(&self, output_id: &str, raster: &OutputRaster, _: &Georeference) -> Result<String> {
        black_box(raster.data().len());
        Ok(output_id.to_string())
    }
}

fn generate_mock_band(side: usize) -> BandBuffer {
    BandBuffer::from_fn(side, |row, col| ((row * 31 + col * 17) % 10_000) as u16)
}

fn mock_store(sides: [usize; 3]) -> DiscardingStore {
    let mut store = MemoryStore::new();
    for (name, side) in ["red", "green", "blue"].into_iter().zip(sides) {
        store.insert_band(name, generate_mock_band(side));
    }
    store.set_georeference(
        "red",
        Georeference::from_geo_transform(
            [600000.0, 10.0, 0.0, 5000040.0, 0.0, -10.0],
            SpatialReference::default(),
        ),
    );
    DiscardingStore(store)
}

fn rgb_request() -> CompositeRequest {
    let spec = |name: &str| ChannelSpec::new(name, BandSelector::Index(1), ClipBounds::new(0.0, 10_000.0));
    CompositeRequest::rgb(spec("red"), spec("green"), spec("blue"), "red")
}

fn benchmark_resample_ratios(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_by_ratio");
    let tiers = ResolutionTiers::default();
    let target = 1098;

    for ratio in [1, 2, 3, 6] {
        let band = generate_mock_band(target / ratio);
        group.bench_with_input(BenchmarkId::from_parameter(ratio), &band, |b, band| {
            b.iter(|| {
                let sum: u64 = resample(black_box(band), target, &tiers)
                    .unwrap()
                    .map(u64::from)
                    .sum();
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn benchmark_quantize(c: &mut Criterion) {
    let band = generate_mock_band(1098);
    let quantizer = Quantizer::new(ClipBounds::new(0.0, 8_000.0), IntensityRange::of(&band)).unwrap();
    let mut plane = vec![0u8; band.len()];

    c.bench_function("quantize_1098", |b| {
        b.iter(|| {
            quantizer
                .quantize_into(black_box(band.samples()).iter().copied(), &mut plane)
                .unwrap();
        });
    });
}

fn benchmark_composite_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_mixed_tiers");

    for (parallel, label) in [(true, "parallel"), (false, "sequential")] {
        let config = CompositeConfig::builder().parallel(parallel).build();
        let pipeline = CompositePipeline::with_store(mock_store([183, 549, 1098]), config);
        let request = rgb_request();

        group.bench_function(label, |b| {
            b.iter(|| {
                let _ = pipeline.composite(black_box(&request));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_resample_ratios,
    benchmark_quantize,
    benchmark_composite_modes
);
criterion_main!(benches);
