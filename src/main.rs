use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use band_composite_rs::image_pipeline::{
    BandSelector, ChannelMode, ChannelSpec, ClipBounds, CompositeConfig, CompositePipeline,
    CompositeRequest, DatasetRef, StoreConfig, TiffCompression,
};
use band_composite_rs::logger;

use tracing::{error, info};

/// Composite 16-bit satellite bands into a georeferenced 8-bit GeoTIFF
#[derive(Parser, Debug)]
#[command(name = "band-composite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output mode: grayscale (one channel) or rgb (red, green, blue)
    #[arg(long, default_value = "rgb")]
    mode: ChannelMode,

    /// Channel as <dataset>:<band>:<min>:<max>; band is an index or a name
    #[arg(long = "channel", required = true)]
    channels: Vec<String>,

    /// Dataset whose georeference is copied onto the output
    #[arg(long)]
    reference: String,

    /// Directory relative dataset references are resolved against
    #[arg(long, env = "COMPOSITE_DATA_ROOT", default_value = ".")]
    data_root: PathBuf,

    /// Directory receiving <id>.tif composites
    #[arg(long, env = "COMPOSITE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Deflate-compress output planes
    #[arg(long)]
    deflate: bool,

    /// Read and render channels one at a time
    #[arg(long)]
    sequential: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Parses `<dataset>:<band>:<min>:<max>`, splitting from the right so dataset
/// references may themselves contain colons.
fn parse_channel(raw: &str) -> Result<ChannelSpec> {
    let mut parts = raw.rsplitn(4, ':');
    let (Some(max), Some(min), Some(band), Some(dataset)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("channel '{}' is not <dataset>:<band>:<min>:<max>", raw);
    };

    let band = match band.parse::<usize>() {
        Ok(index) => BandSelector::Index(index),
        Err(_) => BandSelector::Name(band.to_string()),
    };
    let min: f64 = min
        .parse()
        .with_context(|| format!("invalid clip minimum in '{}'", raw))?;
    let max: f64 = max
        .parse()
        .with_context(|| format!("invalid clip maximum in '{}'", raw))?;

    Ok(ChannelSpec::new(DatasetRef::new(dataset), band, ClipBounds::new(min, max)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    info!("Starting band-composite...");

    let channels = cli
        .channels
        .iter()
        .map(|raw| parse_channel(raw))
        .collect::<Result<Vec<_>>>()?;
    let request = CompositeRequest {
        channels,
        reference: DatasetRef::new(cli.reference.as_str()),
        mode: cli.mode,
    };

    let store_config = StoreConfig::builder()
        .data_root(&cli.data_root)
        .output_dir(&cli.output_dir)
        .compression(if cli.deflate {
            TiffCompression::Deflate
        } else {
            TiffCompression::None
        })
        .build();
    let config = CompositeConfig::builder().parallel(!cli.sequential).build();
    let pipeline = CompositePipeline::new(store_config, config);

    info!("Data root: {}", cli.data_root.display());
    info!("Output directory: {}", cli.output_dir.display());

    match pipeline.composite(&request) {
        Ok(output) => {
            output.timings.log_summary();
            info!(location = %output.location, "Composite written");
            println!("{}", output.id);
            Ok(())
        }
        Err(e) => {
            match (e.channel(), e.stage()) {
                (Some(channel), Some(stage)) => {
                    error!(channel, %stage, "Composite failed: {}", e.root())
                }
                _ => error!("Composite failed: {}", e),
            }
            Err(e).context("composite failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_with_index() {
        let spec = parse_channel("T31UCT_B04.tif:1:0:10000").unwrap();
        assert_eq!(spec.dataset, DatasetRef::new("T31UCT_B04.tif"));
        assert_eq!(spec.band, BandSelector::Index(1));
        assert_eq!(spec.bounds, ClipBounds::new(0.0, 10000.0));
    }

    #[test]
    fn test_parse_channel_with_name_and_colon_dataset() {
        let spec = parse_channel("SENTINEL2_L1C:MTD.xml:10m:B08:100:4000.5").unwrap();
        assert_eq!(spec.dataset, DatasetRef::new("SENTINEL2_L1C:MTD.xml:10m"));
        assert_eq!(spec.band, BandSelector::Name("B08".to_string()));
        assert_eq!(spec.bounds, ClipBounds::new(100.0, 4000.5));
    }

    #[test]
    fn test_parse_channel_rejects_short_spec() {
        assert!(parse_channel("b04.tif:0:1").is_err());
        assert!(parse_channel("b04.tif:1:low:high").is_err());
    }
}
