//! Reader and writer for MRC volumetric microscopy files.
//!
//! An MRC file is a 1024-byte little-endian header, an optional FEI extension
//! block and a raw block of samples. Decoding produces an immutable
//! [`VolumeMetadata`] (logical shape, voxel size in Å, axis orientation) and a
//! [`Volume`] holding the samples as a row-major [`ndarray::Array3`].
//!
//! ```no_run
//! use mrc_volume::{open_file, save_file, WriteOptions};
//!
//! let (metadata, volume) = open_file("tomogram.mrc")?;
//! println!("{:?} {:?}", metadata.shape(), metadata.voxel_size());
//! if let Some(stack) = volume.array::<f32>() {
//!     save_file("copy.mrc", stack, metadata.voxel_size(), &WriteOptions::default())?;
//! }
//! # Ok::<(), mrc_volume::Error>(())
//! ```

mod export;
mod header;
mod metadata;
mod mode;
mod mrcfile;
mod volume;

#[cfg(test)]
#[path = "../test/tests.rs"]
mod tests;

#[cfg(test)]
#[path = "../test/mrcfile_test.rs"]
mod mrcfile_test;

pub use export::{XdmfDescriptor, mrc_to_raw, raw_dump_path, write_raw};
pub use header::{HEADER_SIZE, MACHINE_STAMP_LE, RawHeader, encode_header};
pub use metadata::{VendorExtension, VolumeMetadata, logical_shape};
pub use mode::{Sample, SampleType};
pub use mrcfile::{MrcFile, open_file, save_file};
pub use volume::{
    DensityStats, PreparedWrite, Volume, WriteOptions, prepare_write, read_volume, write_volume,
};

#[cfg(feature = "mmap")]
pub use mrcfile::{MrcMmap, open_mmap};

// Error type

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated header: expected {expected} bytes, found {found}")]
    TruncatedHeader { expected: usize, found: usize },
    #[error("truncated sample data: expected {expected} samples, found {found}")]
    TruncatedData { expected: usize, found: usize },
    #[error("unsupported MRC mode {0}")]
    UnsupportedSampleType(i32),
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("invalid axis order {0:?}, expected a permutation of 1, 2, 3")]
    InvalidAxisOrder([i32; 3]),
    #[error("invalid extension word count {0}")]
    InvalidExtensionSize(i32),
    #[error("array is not in row-major (last axis fastest) layout")]
    NonContiguousLayout,
    #[error("cannot allocate {bytes} bytes for the sample buffer")]
    InsufficientMemory { bytes: usize },
    #[error("type mismatch: expected {expected:?}, volume holds {found:?}")]
    TypeMismatch { expected: SampleType, found: SampleType },
}

pub type Result<T> = core::result::Result<T, Error>;
