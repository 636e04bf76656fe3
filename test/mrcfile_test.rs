#[cfg(test)]
mod backend_tests {
    use std::io::Write;

    use ndarray::Array3;
    use tempfile::NamedTempFile;

    use crate::{Error, MrcFile, SampleType, Volume, WriteOptions, mrc_to_raw, open_file, save_file};

    fn ramp(shape: (usize, usize, usize)) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(z, y, x)| (z * 100 + y * 10 + x) as f32)
    }

    #[test]
    fn test_save_and_open_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();
        let original = ramp((3, 4, 5));

        save_file(temp_file.path(), &original, [2.0, 1.0, 1.0], &WriteOptions::default()).unwrap();

        let (meta, volume) = open_file(temp_file.path()).unwrap();
        assert_eq!(meta.shape(), [3, 4, 5]);
        assert_eq!(meta.sample_type(), SampleType::Float32);
        assert_eq!(meta.voxel_size(), [2.0, 1.0, 1.0]);
        assert_eq!(volume.array::<f32>(), Some(&original));

        let len = std::fs::metadata(temp_file.path()).unwrap().len();
        assert_eq!(len, 1024 + 3 * 4 * 5 * 4);
    }

    #[test]
    fn test_mrc_file_keeps_metadata() {
        let temp_file = NamedTempFile::new().unwrap();
        let original = Array3::<u16>::from_elem((2, 2, 3), 512);
        save_file(temp_file.path(), &original, [1.0; 3], &WriteOptions::default()).unwrap();

        let file = MrcFile::open(temp_file.path()).unwrap();
        assert_eq!(file.metadata().sample_type(), SampleType::Uint16);
        assert_eq!(file.metadata().shape(), [2, 2, 3]);

        // Reading twice goes through the same handle.
        let first = file.read_volume().unwrap();
        let second = file.read_volume().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Volume::Uint16(original));
    }

    #[test]
    fn test_rejected_write_leaves_existing_file_untouched() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"previous contents").unwrap();
        temp_file.flush().unwrap();

        let array = ramp((2, 3, 4));
        let result = save_file(temp_file.path(), &array.t(), [1.0; 3], &WriteOptions::default());
        assert!(matches!(result, Err(Error::NonContiguousLayout)));

        let contents = std::fs::read(temp_file.path()).unwrap();
        assert_eq!(contents, b"previous contents");
    }

    #[test]
    fn test_save_forced_copy_of_transposed_array() {
        let temp_file = NamedTempFile::new().unwrap();
        let array = ramp((2, 3, 4));
        let transposed = array.t();

        let options = WriteOptions::force_contiguous();
        save_file(temp_file.path(), &transposed, [1.0; 3], &options).unwrap();

        let (meta, volume) = open_file(temp_file.path()).unwrap();
        assert_eq!(meta.shape(), [4, 3, 2]);
        assert_eq!(volume.array::<f32>().unwrap(), &transposed);
    }

    #[test]
    fn test_open_errors() {
        assert!(matches!(MrcFile::open("/nonexistent/path/file.mrc"), Err(Error::Io(_))));

        let array = ramp((1, 1, 1));
        let options = WriteOptions::default();
        let result = save_file("/nonexistent/path/file.mrc", &array, [1.0; 3], &options);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_open_truncated_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0u8; 512]).unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            MrcFile::open(temp_file.path()),
            Err(Error::TruncatedHeader {
                expected: 1024,
                found: 512
            })
        ));
    }

    #[test]
    fn test_fei_extension_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let original =
            Array3::<i16>::from_shape_fn((2, 2, 2), |(z, y, x)| (z * 4 + y * 2 + x) as i16);
        save_file(temp_file.path(), &original, [1.0; 3], &WriteOptions::default()).unwrap();

        // Splice a 15-word FEI block between header and samples.
        let mut bytes = std::fs::read(temp_file.path()).unwrap();
        bytes[92..96].copy_from_slice(&15i32.to_le_bytes());
        let mut extension = [0u8; 60];
        extension[44..48].copy_from_slice(&1.2e-9f32.to_le_bytes());
        let samples = bytes.split_off(1024);
        bytes.extend_from_slice(&extension);
        bytes.extend_from_slice(&samples);
        std::fs::write(temp_file.path(), &bytes).unwrap();

        let (meta, volume) = open_file(temp_file.path()).unwrap();
        assert_eq!(meta.data_offset(), 1084);
        assert_eq!(meta.voxel_size()[0], 1.0);
        assert!((meta.voxel_size()[1] - 12.0).abs() < 1e-4);
        assert!((meta.voxel_size()[2] - 12.0).abs() < 1e-4);
        assert_eq!(volume.array::<i16>(), Some(&original));
    }

    #[test]
    fn test_mrc_to_raw() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tomo.mrc");
        let original = Array3::<i8>::from_shape_fn((2, 1, 3), |(z, _, x)| (z as i8) * 10 - x as i8);
        save_file(&source, &original, [1.0; 3], &WriteOptions::default()).unwrap();

        let out = mrc_to_raw(&source).unwrap();
        assert_eq!(out, dir.path().join("tomo_int8_(2, 1, 3).raw"));

        let raw = std::fs::read(&out).unwrap();
        let expected: Vec<u8> = original.iter().map(|&v| v as u8).collect();
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_xdmf_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tomo.xmf");
        let descriptor = crate::XdmfDescriptor::new(
            "tomo.emd",
            "/data/stack/data",
            [4, 3, 2],
            SampleType::Float32,
            [1.0; 3],
        );
        descriptor.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, descriptor.render());
        assert!(text.contains("NumberType=\"Float\" Precision=\"4\" Dimensions=\"4 3 2\""));
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mmap_matches_file_reader() {
        use crate::{MrcMmap, open_mmap};

        let temp_file = NamedTempFile::new().unwrap();
        let original = ramp((4, 4, 2));
        save_file(temp_file.path(), &original, [3.0, 3.0, 3.0], &WriteOptions::default()).unwrap();

        let (file_meta, file_volume) = open_file(temp_file.path()).unwrap();
        let (mmap_meta, mmap_volume) = open_mmap(temp_file.path()).unwrap();
        assert_eq!(file_meta, mmap_meta);
        assert_eq!(file_volume, mmap_volume);

        let mmap = MrcMmap::open(temp_file.path()).unwrap();
        assert_eq!(mmap.data().map(<[u8]>::len), Some(4 * 4 * 2 * 4));
    }
}
