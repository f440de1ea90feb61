//! GeoTIFF-backed raster store.
//!
//! Reads 16-bit bands and their georeference with the `tiff` crate and writes
//! composites as 8-bit GeoTIFFs with one strip per band plane
//! (`PlanarConfiguration = 2`), which is what GDAL calls `INTERLEAVE=BAND`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::image_pipeline::band::{BandBuffer, BandSelector, DatasetRef};
use crate::image_pipeline::common::error::{CompositeError, Result};
use crate::image_pipeline::store::raster_store::{
    Georeference, OutputRaster, RasterStore, SpatialReference,
};
use crate::image_pipeline::store::types::{StoreConfig, TiffCompression};

// GeoTIFF and GDAL private tags
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_DEFLATE: u16 = 8;
const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_RGB: u16 = 2;
const PLANAR_SEPARATE: u16 = 2;
const SAMPLE_FORMAT_UINT: u16 = 1;

/// Band description item names GDAL uses in its metadata tag.
const BAND_NAME_ITEMS: [&str; 2] = ["BANDNAME", "DESCRIPTION"];

pub struct GeoTiffStore {
    config: StoreConfig,
}

impl GeoTiffStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Absolute references are used as-is; relative ones live under the data root.
    pub fn resolve(&self, dataset: &DatasetRef) -> PathBuf {
        let path = Path::new(dataset.as_str());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.data_root.join(path)
        }
    }

    pub fn output_path(&self, output_id: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}.tif", output_id))
    }

    fn open_decoder(path: &Path) -> std::result::Result<Decoder<BufReader<File>>, String> {
        let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        Ok(decoder.with_limits(Limits::unlimited()))
    }

    fn encode_planes(&self, raster: &OutputRaster) -> Result<Vec<Vec<u8>>> {
        (0..raster.channels())
            .map(|index| -> Result<Vec<u8>> {
                let plane = raster.plane(index);
                match self.config.compression {
                    TiffCompression::None => Ok(plane.to_vec()),
                    TiffCompression::Deflate => {
                        let mut encoder =
                            ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
                        encoder.write_all(plane)?;
                        Ok(encoder.finish()?)
                    }
                }
            })
            .collect()
    }

    fn write_geotiff(
        &self,
        path: &Path,
        raster: &OutputRaster,
        georeference: &Georeference,
    ) -> Result<()> {
        let channels = raster.channels();
        let side = u32::try_from(raster.resolution())
            .map_err(|_| CompositeError::InvalidDimensions(raster.resolution(), raster.resolution()))?;
        let planes = self.encode_planes(raster)?;

        let file = File::create(path)
            .map_err(|e| CompositeError::OutputWrite(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);

        {
            let mut encoder = TiffEncoder::new(&mut writer).map_err(encode_err)?;
            let mut dir = encoder.image_directory().map_err(encode_err)?;

            let mut offsets = Vec::with_capacity(channels);
            let mut byte_counts = Vec::with_capacity(channels);
            for plane in &planes {
                let offset = dir.write_data(plane.as_slice()).map_err(encode_err)?;
                offsets.push(classic_offset(offset)?);
                byte_counts.push(classic_offset(plane.len() as u64)?);
            }

            let compression = match self.config.compression {
                TiffCompression::None => COMPRESSION_NONE,
                TiffCompression::Deflate => COMPRESSION_DEFLATE,
            };
            let photometric = if channels == 3 {
                PHOTOMETRIC_RGB
            } else {
                PHOTOMETRIC_BLACK_IS_ZERO
            };

            dir.write_tag(Tag::ImageWidth, side).map_err(encode_err)?;
            dir.write_tag(Tag::ImageLength, side).map_err(encode_err)?;
            dir.write_tag(Tag::BitsPerSample, vec![8u16; channels].as_slice())
                .map_err(encode_err)?;
            dir.write_tag(Tag::Compression, compression).map_err(encode_err)?;
            dir.write_tag(Tag::PhotometricInterpretation, photometric)
                .map_err(encode_err)?;
            dir.write_tag(Tag::SamplesPerPixel, channels as u16)
                .map_err(encode_err)?;
            dir.write_tag(Tag::RowsPerStrip, side).map_err(encode_err)?;
            dir.write_tag(Tag::StripOffsets, offsets.as_slice())
                .map_err(encode_err)?;
            dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())
                .map_err(encode_err)?;
            dir.write_tag(Tag::PlanarConfiguration, PLANAR_SEPARATE)
                .map_err(encode_err)?;
            dir.write_tag(Tag::SampleFormat, vec![SAMPLE_FORMAT_UINT; channels].as_slice())
                .map_err(encode_err)?;

            let extra = if channels == 3 { 0 } else { channels.saturating_sub(1) };
            if extra > 0 {
                dir.write_tag(Tag::ExtraSamples, vec![0u16; extra].as_slice())
                    .map_err(encode_err)?;
            }

            if georeference.is_rotated() {
                let [x0, dx, rx, y0, ry, dy] = georeference.geo_transform();
                let matrix = [
                    dx, rx, 0.0, x0,
                    ry, dy, 0.0, y0,
                    0.0, 0.0, 0.0, 0.0,
                    0.0, 0.0, 0.0, 1.0,
                ];
                dir.write_tag(geo_tag(MODEL_TRANSFORMATION), &matrix[..])
                    .map_err(encode_err)?;
            } else {
                let scale = [georeference.pixel_size.0, -georeference.pixel_size.1, 0.0];
                let tiepoint = [0.0, 0.0, 0.0, georeference.origin.0, georeference.origin.1, 0.0];
                dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])
                    .map_err(encode_err)?;
                dir.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])
                    .map_err(encode_err)?;
            }

            let srs = &georeference.spatial_reference;
            dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), srs.geo_key_directory.as_slice())
                .map_err(encode_err)?;
            if !srs.geo_double_params.is_empty() {
                dir.write_tag(geo_tag(GEO_DOUBLE_PARAMS), srs.geo_double_params.as_slice())
                    .map_err(encode_err)?;
            }
            if !srs.geo_ascii_params.is_empty() {
                dir.write_tag(geo_tag(GEO_ASCII_PARAMS), srs.geo_ascii_params.as_str())
                    .map_err(encode_err)?;
            }

            if let Some(nodata) = self.config.nodata {
                dir.write_tag(geo_tag(GDAL_NODATA), nodata.to_string().as_str())
                    .map_err(encode_err)?;
            }

            dir.finish().map_err(encode_err)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl RasterStore for GeoTiffStore {
    fn open_band(&self, dataset: &DatasetRef, band: &BandSelector) -> Result<BandBuffer> {
        let path = self.resolve(dataset);
        debug!(path = %path.display(), %band, "Opening band");

        let mut decoder = Self::open_decoder(&path).map_err(CompositeError::ChannelRead)?;
        let read_err = |e: tiff::TiffError| {
            CompositeError::ChannelRead(format!("{}: {}", path.display(), e))
        };

        let (width, height) = decoder.dimensions().map_err(read_err)?;
        if width != height {
            return Err(CompositeError::InvalidDimensions(width as usize, height as usize));
        }

        let samples_per_pixel = match decoder.colortype().map_err(read_err)? {
            ColorType::Gray(16) => 1,
            ColorType::GrayA(16) => 2,
            ColorType::RGB(16) => 3,
            ColorType::RGBA(16) => 4,
            ColorType::Multiband { bit_depth: 16, num_samples } => num_samples as usize,
            other => {
                return Err(CompositeError::ChannelRead(format!(
                    "{}: unsupported sample layout {:?}, expected 16-bit samples",
                    path.display(),
                    other
                )));
            }
        };

        let band_index = match band {
            BandSelector::Index(index) => *index,
            BandSelector::Name(name) => {
                let metadata = decoder
                    .find_tag(geo_tag(GDAL_METADATA))
                    .map_err(read_err)?
                    .map(|value| value.into_string())
                    .transpose()
                    .map_err(read_err)?
                    .unwrap_or_default();
                band_index_by_name(&metadata, name).ok_or_else(|| {
                    CompositeError::ChannelRead(format!(
                        "band '{}' does not exist in dataset {}",
                        name, dataset
                    ))
                })?
            }
        };
        if band_index == 0 || band_index > samples_per_pixel {
            return Err(CompositeError::ChannelRead(format!(
                "{}: {} out of range, dataset has {} band(s)",
                path.display(),
                band,
                samples_per_pixel
            )));
        }

        let samples = match decoder.read_image().map_err(read_err)? {
            DecodingResult::U16(data) => data,
            _ => {
                return Err(CompositeError::ChannelRead(format!(
                    "{}: expected unsigned 16-bit samples",
                    path.display()
                )));
            }
        };

        let samples = if samples_per_pixel == 1 {
            samples
        } else {
            samples
                .into_iter()
                .skip(band_index - 1)
                .step_by(samples_per_pixel)
                .collect()
        };

        debug!(path = %path.display(), side = width, "Band loaded");
        BandBuffer::new(samples)
    }

    fn reference_georeference(&self, dataset: &DatasetRef) -> Result<Georeference> {
        let path = self.resolve(dataset);
        let mut decoder =
            Self::open_decoder(&path).map_err(CompositeError::GeoreferenceUnavailable)?;
        let geo_err = |e: tiff::TiffError| {
            CompositeError::GeoreferenceUnavailable(format!("{}: {}", path.display(), e))
        };

        let transformation = f64_tag(&mut decoder, MODEL_TRANSFORMATION).map_err(geo_err)?;
        let tiepoint = f64_tag(&mut decoder, MODEL_TIEPOINT).map_err(geo_err)?;
        let scale = f64_tag(&mut decoder, MODEL_PIXEL_SCALE).map_err(geo_err)?;

        let geo_transform = match (transformation, tiepoint, scale) {
            (Some(m), _, _) if m.len() >= 16 => [m[3], m[0], m[1], m[7], m[4], m[5]],
            (_, Some(tp), Some(sc)) if tp.len() >= 6 && sc.len() >= 2 => [
                tp[3] - tp[0] * sc[0],
                sc[0],
                0.0,
                tp[4] + tp[1] * sc[1],
                0.0,
                -sc[1],
            ],
            _ => {
                return Err(CompositeError::GeoreferenceUnavailable(format!(
                    "{}: no model transformation or tiepoint/pixel scale",
                    path.display()
                )));
            }
        };

        let geo_key_directory = decoder
            .find_tag(geo_tag(GEO_KEY_DIRECTORY))
            .map_err(geo_err)?
            .map(|value| value.into_u16_vec())
            .transpose()
            .map_err(geo_err)?
            .ok_or_else(|| {
                CompositeError::GeoreferenceUnavailable(format!(
                    "{}: no GeoKey directory",
                    path.display()
                ))
            })?;
        let geo_double_params = f64_tag(&mut decoder, GEO_DOUBLE_PARAMS)
            .map_err(geo_err)?
            .unwrap_or_default();
        let geo_ascii_params = decoder
            .find_tag(geo_tag(GEO_ASCII_PARAMS))
            .map_err(geo_err)?
            .map(|value| value.into_string())
            .transpose()
            .map_err(geo_err)?
            .unwrap_or_default();

        Ok(Georeference::from_geo_transform(
            geo_transform,
            SpatialReference {
                geo_key_directory,
                geo_double_params,
                geo_ascii_params,
            },
        ))
    }

    fn write_raster(
        &self,
        output_id: &str,
        raster: &OutputRaster,
        georeference: &Georeference,
    ) -> Result<String> {
        if raster.channels() == 0 || raster.resolution() == 0 {
            return Err(CompositeError::InvalidDimensions(
                raster.resolution(),
                raster.resolution(),
            ));
        }

        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            CompositeError::OutputWrite(format!("{}: {}", self.config.output_dir.display(), e))
        })?;
        let path = self.output_path(output_id);

        debug!(
            path = %path.display(),
            resolution = raster.resolution(),
            channels = raster.channels(),
            "Writing composite"
        );

        if let Err(e) = self.write_geotiff(&path, raster, georeference) {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "Could not remove partial output");
            }
            return Err(e);
        }

        Ok(path.display().to_string())
    }
}

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn f64_tag<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> tiff::TiffResult<Option<Vec<f64>>> {
    decoder
        .find_tag(geo_tag(code))?
        .map(|value| value.into_f64_vec())
        .transpose()
}

fn encode_err(e: tiff::TiffError) -> CompositeError {
    CompositeError::OutputWrite(e.to_string())
}

fn classic_offset(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        CompositeError::OutputWrite(format!("offset {} exceeds classic TIFF limits", value))
    })
}

/// 1-based band index whose GDAL metadata description equals `name`.
///
/// GDAL stores per-band descriptions as
/// `<Item name="DESCRIPTION" sample="0" role="description">B04</Item>`,
/// with `sample` counted from zero.
pub(crate) fn band_index_by_name(metadata: &str, name: &str) -> Option<usize> {
    let mut reader = Reader::from_str(metadata);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sample = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"Item" => {
                sample = band_item_sample(&e);
            }
            Ok(Event::Text(t)) => {
                if let Some(index) = sample.take() {
                    if t.unescape().ok()?.as_ref() == name {
                        return Some(index + 1);
                    }
                }
            }
            Ok(Event::End(_)) => sample = None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Zero-based sample of an `Item` that carries a band name.
fn band_item_sample(item: &BytesStart) -> Option<usize> {
    let mut kind = None;
    let mut sample = None;
    for attr in item.attributes().flatten() {
        match attr.key.as_ref() {
            b"name" => kind = Some(attr.unescape_value().ok()?.into_owned()),
            b"sample" => sample = attr.unescape_value().ok()?.trim().parse().ok(),
            _ => {}
        }
    }
    kind.filter(|k| BAND_NAME_ITEMS.contains(&k.as_str()))
        .and(sample)
}
