#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufReader, Read};
    use std::path::Path;

    use flate2::read::ZlibDecoder;
    use tiff::decoder::Decoder;
    use tiff::encoder::{TiffEncoder, colortype};
    use tiff::tags::Tag;

    use crate::image_pipeline::band::{BandBuffer, BandSelector, DatasetRef};
    use crate::image_pipeline::common::error::CompositeError;
    use crate::image_pipeline::store::geotiff_store::band_index_by_name;
    use crate::image_pipeline::store::{
        GeoTiffStore, Georeference, MemoryStore, OutputRaster, RasterStore, SpatialReference,
        StoreConfig, TiffCompression,
    };

    const UTM_31N_KEYS: [u16; 16] = [
        1, 1, 0, 3,
        1024, 0, 1, 1,
        1025, 0, 1, 1,
        3072, 0, 1, 32631,
    ];

    fn utm_georeference() -> Georeference {
        Georeference::from_geo_transform(
            [300000.0, 10.0, 0.0, 5800020.0, 0.0, -10.0],
            SpatialReference {
                geo_key_directory: UTM_31N_KEYS.to_vec(),
                geo_double_params: Vec::new(),
                geo_ascii_params: "WGS 84 / UTM zone 31N|".to_string(),
            },
        )
    }

    fn tag(code: u16) -> Tag {
        Tag::from_u16_exhaustive(code)
    }

    fn write_gray16(path: &Path, side: u32, data: &[u16], with_geo: bool) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::Gray16>(side, side).unwrap();
        if with_geo {
            let dir = image.encoder();
            dir.write_tag(tag(33550), &[10.0f64, 10.0, 0.0][..]).unwrap();
            dir.write_tag(tag(33922), &[0.0f64, 0.0, 0.0, 300000.0, 5800020.0, 0.0][..])
                .unwrap();
            dir.write_tag(tag(34735), &UTM_31N_KEYS[..]).unwrap();
            dir.write_tag(tag(34737), "WGS 84 / UTM zone 31N|").unwrap();
        }
        image.write_data(data).unwrap();
    }

    fn write_rgb16_named(path: &Path, side: u32, data: &[u16]) {
        let metadata = concat!(
            "<GDALMetadata>\n",
            "  <Item name=\"DESCRIPTION\" sample=\"0\" role=\"description\">B04</Item>\n",
            "  <Item name=\"DESCRIPTION\" sample=\"1\" role=\"description\">B03</Item>\n",
            "  <Item name=\"DESCRIPTION\" sample=\"2\" role=\"description\">B02</Item>\n",
            "</GDALMetadata>",
        );
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::RGB16>(side, side).unwrap();
        image.encoder().write_tag(tag(42112), metadata).unwrap();
        image.write_data(data).unwrap();
    }

    fn read_planes(path: &Path) -> (Vec<u64>, Vec<u64>, Vec<u8>) {
        let mut decoder = Decoder::new(BufReader::new(File::open(path).unwrap())).unwrap();
        let offsets = decoder
            .find_tag(Tag::StripOffsets)
            .unwrap()
            .unwrap()
            .into_u64_vec()
            .unwrap();
        let counts = decoder
            .find_tag(Tag::StripByteCounts)
            .unwrap()
            .unwrap()
            .into_u64_vec()
            .unwrap();
        let mut bytes = Vec::new();
        File::open(path).unwrap().read_to_end(&mut bytes).unwrap();
        (offsets, counts, bytes)
    }

    fn store_in(dir: &Path) -> GeoTiffStore {
        GeoTiffStore::new(
            StoreConfig::builder()
                .data_root(dir)
                .output_dir(dir.join("out"))
                .build(),
        )
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::builder()
            .data_root("/opt/sentinel2")
            .compression(TiffCompression::Deflate)
            .nodata(None)
            .build();

        assert_eq!(config.data_root, Path::new("/opt/sentinel2"));
        assert_eq!(config.output_dir, Path::new("."));
        assert_eq!(config.compression, TiffCompression::Deflate);
        assert_eq!(config.nodata, None);
    }

    #[test]
    fn test_open_gray_band() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u16> = (0..16).map(|v| v * 1000).collect();
        write_gray16(&dir.path().join("b04.tif"), 4, &data, false);

        let store = store_in(dir.path());
        let band = store
            .open_band(&DatasetRef::new("b04.tif"), &BandSelector::Index(1))
            .unwrap();

        assert_eq!(band.side(), 4);
        assert_eq!(band.samples(), data.as_slice());
    }

    #[test]
    fn test_open_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let result = store.open_band(&DatasetRef::new("nope.tif"), &BandSelector::Index(1));
        assert!(matches!(result, Err(CompositeError::ChannelRead(_))));
    }

    #[test]
    fn test_open_band_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        write_gray16(&dir.path().join("b.tif"), 2, &[1, 2, 3, 4], false);

        let store = store_in(dir.path());
        let result = store.open_band(&DatasetRef::new("b.tif"), &BandSelector::Index(2));
        assert!(matches!(result, Err(CompositeError::ChannelRead(_))));
    }

    #[test]
    fn test_open_band_by_index_and_name_from_multiband() {
        let dir = tempfile::tempdir().unwrap();
        let side = 3usize;
        let data: Vec<u16> = (0..side * side)
            .flat_map(|i| [i as u16, 100 + i as u16, 200 + i as u16])
            .collect();
        write_rgb16_named(&dir.path().join("tci.tif"), side as u32, &data);

        let store = store_in(dir.path());
        let dataset = DatasetRef::new("tci.tif");

        let green = store.open_band(&dataset, &BandSelector::Index(2)).unwrap();
        assert_eq!(green.samples(), &[100, 101, 102, 103, 104, 105, 106, 107, 108]);

        let blue = store
            .open_band(&dataset, &BandSelector::Name("B02".to_string()))
            .unwrap();
        assert_eq!(blue.samples()[0], 200);

        let missing = store.open_band(&dataset, &BandSelector::Name("B08".to_string()));
        assert!(matches!(missing, Err(CompositeError::ChannelRead(_))));
    }

    #[test]
    fn test_band_name_lookup() {
        let metadata = r#"<GDALMetadata>
  <Item name="BANDNAME" sample="1">B8A</Item>
  <Item name="OFFSET" sample="0" role="offset">B8A</Item>
</GDALMetadata>"#;
        assert_eq!(band_index_by_name(metadata, "B8A"), Some(2));
        assert_eq!(band_index_by_name(metadata, "B01"), None);
        assert_eq!(band_index_by_name("", "B01"), None);
    }

    #[test]
    fn test_band_name_lookup_single_quoted_attributes() {
        let metadata = r#"<GDALMetadata>
  <Item name='DESCRIPTION' sample='0' role='description'>B02</Item>
  <Item name='DESCRIPTION' sample='2' role='description'>B04</Item>
</GDALMetadata>"#;
        assert_eq!(band_index_by_name(metadata, "B04"), Some(3));
    }

    #[test]
    fn test_band_name_lookup_unescapes_text() {
        let metadata = r#"<GDALMetadata>
  <Item name="DESCRIPTION" sample="0" role="description">NIR &amp; SWIR</Item>
</GDALMetadata>"#;
        assert_eq!(band_index_by_name(metadata, "NIR & SWIR"), Some(1));
        assert_eq!(band_index_by_name(metadata, "NIR &amp; SWIR"), None);
    }

    #[test]
    fn test_band_name_lookup_spaced_attributes() {
        let metadata = r#"<GDALMetadata>
  <Item name = "BANDNAME" sample = "1">B8A</Item>
</GDALMetadata>"#;
        assert_eq!(band_index_by_name(metadata, "B8A"), Some(2));
    }

    #[test]
    fn test_band_name_lookup_malformed_metadata() {
        assert_eq!(band_index_by_name("<GDALMetadata><Item name=", "B04"), None);
    }

    #[test]
    fn test_reference_georeference() {
        let dir = tempfile::tempdir().unwrap();
        write_gray16(&dir.path().join("ref.tif"), 2, &[0, 1, 2, 3], true);

        let store = store_in(dir.path());
        let geo = store
            .reference_georeference(&DatasetRef::new("ref.tif"))
            .unwrap();

        assert_eq!(geo, utm_georeference());
    }

    #[test]
    fn test_reference_without_georeference() {
        let dir = tempfile::tempdir().unwrap();
        write_gray16(&dir.path().join("plain.tif"), 2, &[0, 1, 2, 3], false);

        let store = store_in(dir.path());
        let result = store.reference_georeference(&DatasetRef::new("plain.tif"));
        assert!(matches!(result, Err(CompositeError::GeoreferenceUnavailable(_))));
    }

    #[test]
    fn test_write_banded_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut raster = OutputRaster::new(2, 3);
        raster.plane_mut(0).copy_from_slice(&[1, 2, 3, 4]);
        raster.plane_mut(1).copy_from_slice(&[5, 6, 7, 8]);
        raster.plane_mut(2).copy_from_slice(&[9, 10, 11, 12]);

        let location = store.write_raster("abc", &raster, &utm_georeference()).unwrap();
        let path = dir.path().join("out").join("abc.tif");
        assert_eq!(location, path.display().to_string());

        let (offsets, counts, bytes) = read_planes(&path);
        assert_eq!(offsets.len(), 3);
        assert_eq!(counts, vec![4, 4, 4]);
        for (plane, offset) in offsets.iter().enumerate() {
            let start = *offset as usize;
            assert_eq!(&bytes[start..start + 4], raster.plane(plane));
        }

        let mut decoder = Decoder::new(BufReader::new(File::open(&path).unwrap())).unwrap();
        let planar = decoder
            .find_tag(Tag::PlanarConfiguration)
            .unwrap()
            .unwrap()
            .into_u16()
            .unwrap();
        assert_eq!(planar, 2);
        let nodata = decoder
            .find_tag(tag(42113))
            .unwrap()
            .unwrap()
            .into_string()
            .unwrap();
        assert_eq!(nodata, "0");

        let copied = store
            .reference_georeference(&DatasetRef::new(path.display().to_string()))
            .unwrap();
        assert_eq!(copied, utm_georeference());
    }

    #[test]
    fn test_write_deflate_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeoTiffStore::new(
            StoreConfig::builder()
                .output_dir(dir.path())
                .compression(TiffCompression::Deflate)
                .build(),
        );

        let mut raster = OutputRaster::new(8, 1);
        raster.data_mut().iter_mut().enumerate().for_each(|(i, v)| *v = i as u8);
        store.write_raster("grey", &raster, &utm_georeference()).unwrap();

        let (offsets, counts, bytes) = read_planes(&dir.path().join("grey.tif"));
        let start = offsets[0] as usize;
        let end = start + counts[0] as usize;
        let mut plane = Vec::new();
        ZlibDecoder::new(&bytes[start..end]).read_to_end(&mut plane).unwrap();
        assert_eq!(plane, raster.data());
    }

    #[test]
    fn test_write_rotated_georeference_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut geo = utm_georeference();
        geo.rotation = (0.5, -0.25);
        store.write_raster("rot", &OutputRaster::new(2, 1), &geo).unwrap();

        let path = dir.path().join("out").join("rot.tif");
        let copied = store
            .reference_georeference(&DatasetRef::new(path.display().to_string()))
            .unwrap();
        assert_eq!(copied, geo);
    }

    #[test]
    fn test_write_rejects_empty_raster() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let result = store.write_raster("empty", &OutputRaster::new(0, 1), &utm_georeference());
        assert!(matches!(result, Err(CompositeError::InvalidDimensions(0, 0))));
        assert!(!dir.path().join("out").join("empty.tif").exists());
    }

    #[test]
    fn test_memory_store_band_lookup() {
        let mut store = MemoryStore::new();
        store.insert_band("s2", BandBuffer::filled(2, 1));
        store.insert_named_band("s2", "B03", BandBuffer::filled(2, 2));

        let dataset = DatasetRef::new("s2");
        let by_index = store.open_band(&dataset, &BandSelector::Index(2)).unwrap();
        let by_name = store
            .open_band(&dataset, &BandSelector::Name("B03".into()))
            .unwrap();
        assert_eq!(by_index, by_name);

        assert!(store.open_band(&dataset, &BandSelector::Index(0)).is_err());
        assert!(store.open_band(&dataset, &BandSelector::Index(3)).is_err());
        assert!(store.reference_georeference(&dataset).is_err());
    }
}
