use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mrc_volume::{
    DensityStats, SampleType, VolumeMetadata, WriteOptions, encode_header, read_volume,
    write_volume,
};
use ndarray::Array3;
use tempfile::NamedTempFile;

fn encoded_volume(shape: (usize, usize, usize)) -> Vec<u8> {
    let array = Array3::from_shape_fn(shape, |(z, y, x)| (z + y + x) as f32);
    let mut cursor = Cursor::new(Vec::new());
    write_volume(&mut cursor, &array, [1.0; 3], &WriteOptions::default()).unwrap();
    cursor.into_inner()
}

fn bench_header_encode(c: &mut Criterion) {
    c.bench_function("header_encode", |b| {
        b.iter(|| {
            encode_header(black_box(&[100usize, 256, 256][..]), SampleType::Float32, [1.0; 3])
                .unwrap()
        })
    });
}

fn bench_header_decode(c: &mut Criterion) {
    let bytes = encoded_volume((4, 4, 4));
    c.bench_function("header_decode", |b| {
        b.iter(|| VolumeMetadata::decode(&mut Cursor::new(black_box(&bytes[..]))).unwrap())
    });
}

fn bench_density_stats(c: &mut Criterion) {
    let samples: Vec<f32> = (0..64 * 64 * 64).map(|v| v as f32).collect();
    c.bench_function("density_stats_64^3", |b| {
        b.iter(|| black_box(DensityStats::compute(samples.iter().copied())))
    });
}

fn bench_read_volume(c: &mut Criterion) {
    let bytes = encoded_volume((64, 64, 64));
    let meta = VolumeMetadata::decode(&mut Cursor::new(&bytes[..])).unwrap();
    c.bench_function("read_volume_64^3_f32", |b| {
        b.iter(|| read_volume(&mut Cursor::new(black_box(&bytes[..])), &meta).unwrap())
    });
}

fn bench_file_round_trip(c: &mut Criterion) {
    let temp_file = NamedTempFile::new().unwrap();
    let array = Array3::from_shape_fn((32, 64, 64), |(z, y, x)| (z * y + x) as u16);
    c.bench_function("save_open_32x64x64_u16", |b| {
        b.iter(|| {
            mrc_volume::save_file(temp_file.path(), &array, [1.0; 3], &WriteOptions::default())
                .unwrap();
            black_box(mrc_volume::open_file(temp_file.path()).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_header_encode,
    bench_header_decode,
    bench_density_stats,
    bench_read_volume,
    bench_file_round_trip
);
criterion_main!(benches);
