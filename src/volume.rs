use std::io::{Read, Seek, SeekFrom, Write};

use ndarray::{Array3, ArrayBase, CowArray, Data, Dimension, IxDyn};

use crate::header::{HEADER_SIZE, encode_header, patch_density};
use crate::metadata::read_full;
use crate::{Error, Sample, SampleType, VolumeMetadata};

/// Samples of one MRC volume, row-major with the last axis fastest.
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    Int8(Array3<i8>),
    Int16(Array3<i16>),
    Uint16(Array3<u16>),
    Float32(Array3<f32>),
}

macro_rules! dispatch {
    ($volume:expr, $array:ident => $body:expr) => {
        match $volume {
            Volume::Int8($array) => $body,
            Volume::Int16($array) => $body,
            Volume::Uint16($array) => $body,
            Volume::Float32($array) => $body,
        }
    };
}

impl Volume {
    #[inline]
    pub fn sample_type(&self) -> SampleType {
        match self {
            Volume::Int8(_) => SampleType::Int8,
            Volume::Int16(_) => SampleType::Int16,
            Volume::Uint16(_) => SampleType::Uint16,
            Volume::Float32(_) => SampleType::Float32,
        }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        let (a, b, c) = dispatch!(self, array => array.dim());
        [a, b, c]
    }

    #[inline]
    pub fn len(&self) -> usize {
        dispatch!(self, array => array.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed access; `None` when the volume holds another sample type.
    #[inline]
    pub fn array<T: Sample>(&self) -> Option<&Array3<T>> {
        T::from_volume(self)
    }

    /// Typed access that reports the mismatch as an error.
    pub fn try_array<T: Sample>(&self) -> Result<&Array3<T>, Error> {
        T::from_volume(self).ok_or(Error::TypeMismatch {
            expected: T::SAMPLE_TYPE,
            found: self.sample_type(),
        })
    }

    pub fn stats(&self) -> DensityStats {
        dispatch!(self, array => DensityStats::compute(array.iter().copied()))
    }

    /// Writes the bare samples, little-endian, in row-major order.
    pub fn write_samples_le<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        dispatch!(self, array => {
            let standard = array.as_standard_layout();
            let samples = standard.as_slice().ok_or(Error::NonContiguousLayout)?;
            write_le(writer, samples)
        })
    }

    /// Writes this volume as a complete MRC file.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: &mut W,
        voxel_size: [f32; 3],
        options: &WriteOptions,
    ) -> Result<(), Error> {
        dispatch!(self, array => write_volume(writer, array, voxel_size, options))
    }
}

impl<T: Sample> From<Array3<T>> for Volume {
    fn from(array: Array3<T>) -> Self {
        T::into_volume(array)
    }
}

/// Minimum, maximum and mean of the samples, as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl DensityStats {
    /// Accumulates in f64; an empty input yields all zeros. A NaN sample
    /// makes all three values NaN.
    pub fn compute<T: Sample>(samples: impl IntoIterator<Item = T>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in samples {
            let v = v.to_f64();
            if v.is_nan() {
                return Self {
                    min: f32::NAN,
                    max: f32::NAN,
                    mean: f32::NAN,
                };
            }
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        if count == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        Self {
            min: min as f32,
            max: max as f32,
            mean: (sum / count as f64) as f32,
        }
    }
}

/// Write-path settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Copy arrays that are not in row-major standard layout instead of
    /// rejecting them with [`Error::NonContiguousLayout`]. The copy holds
    /// the whole volume in memory a second time.
    pub force_contiguous: bool,
}

impl WriteOptions {
    pub fn force_contiguous() -> Self {
        Self {
            force_contiguous: true,
        }
    }
}

/// A validated write: encoded header plus samples in standard layout.
///
/// Building one does no I/O, so callers can reject bad input before
/// touching the destination.
#[derive(Debug)]
pub struct PreparedWrite<'a, T: Sample> {
    header: [u8; HEADER_SIZE],
    samples: CowArray<'a, T, IxDyn>,
    stats: DensityStats,
}

impl<T: Sample> PreparedWrite<'_, T> {
    #[inline]
    pub fn header(&self) -> &[u8; HEADER_SIZE] {
        &self.header
    }

    #[inline]
    pub fn stats(&self) -> DensityStats {
        self.stats
    }

    /// Header at offset 0, samples at offset 1024. Flushes before returning.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<(), Error> {
        let samples = self.samples.as_slice().ok_or(Error::NonContiguousLayout)?;

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&self.header)?;
        writer.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        write_le(writer, samples)?;
        writer.flush()?;

        let sample_type = T::SAMPLE_TYPE;
        tracing::debug!(
            shape = ?self.samples.shape(),
            %sample_type,
            bytes = HEADER_SIZE + samples.len() * sample_type.byte_size(),
            "wrote MRC volume"
        );
        Ok(())
    }
}

/// Validates `array`, computes its density statistics and encodes the header.
///
/// The array must have exactly three axes and be in row-major standard
/// layout, unless `options.force_contiguous` asks for a copy.
pub fn prepare_write<'a, T, S, D>(
    array: &'a ArrayBase<S, D>,
    voxel_size: [f32; 3],
    options: &WriteOptions,
) -> Result<PreparedWrite<'a, T>, Error>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    if array.ndim() != 3 {
        return Err(Error::InvalidDimensions(format!(
            "expected a 3-dimensional array, got {} axes",
            array.ndim()
        )));
    }

    let samples: CowArray<'a, T, IxDyn> = if array.is_standard_layout() {
        CowArray::from(array.view().into_dyn())
    } else if options.force_contiguous {
        tracing::debug!(shape = ?array.shape(), "copying array into standard layout");
        CowArray::from(array.as_standard_layout().into_owned().into_dyn())
    } else {
        return Err(Error::NonContiguousLayout);
    };

    let mut header = encode_header(samples.shape(), T::SAMPLE_TYPE, voxel_size)?;
    let slice = samples.as_slice().ok_or(Error::NonContiguousLayout)?;
    let stats = DensityStats::compute(slice.iter().copied());
    patch_density(&mut header, stats.min, stats.max, stats.mean);

    Ok(PreparedWrite {
        header,
        samples,
        stats,
    })
}

/// Writes `array` as a complete MRC file to `writer`.
pub fn write_volume<W, T, S, D>(
    writer: &mut W,
    array: &ArrayBase<S, D>,
    voxel_size: [f32; 3],
    options: &WriteOptions,
) -> Result<(), Error>
where
    W: Write + Seek,
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    prepare_write(array, voxel_size, options)?.write_to(writer)
}

/// Reads the sample block described by `metadata`.
///
/// The stream length is checked against the expected byte count before any
/// buffer is allocated.
pub fn read_volume<R: Read + Seek>(
    reader: &mut R,
    metadata: &VolumeMetadata,
) -> Result<Volume, Error> {
    let offset = metadata.data_offset();
    let end = reader.seek(SeekFrom::End(0))?;
    tracing::trace!(offset, end, "seeking to sample data");
    reader.seek(SeekFrom::Start(offset))?;
    let available = end.saturating_sub(offset);

    let shape = metadata.shape();
    Ok(match metadata.sample_type() {
        SampleType::Int8 => Volume::Int8(read_array(reader, shape, available)?),
        SampleType::Int16 => Volume::Int16(read_array(reader, shape, available)?),
        SampleType::Uint16 => Volume::Uint16(read_array(reader, shape, available)?),
        SampleType::Float32 => Volume::Float32(read_array(reader, shape, available)?),
    })
}

fn read_array<T: Sample, R: Read + ?Sized>(
    reader: &mut R,
    shape: [usize; 3],
    available: u64,
) -> Result<Array3<T>, Error> {
    let size = core::mem::size_of::<T>();
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| Error::InvalidDimensions(format!("shape {shape:?} overflows usize")))?;
    let bytes = count
        .checked_mul(size)
        .ok_or_else(|| Error::InvalidDimensions(format!("shape {shape:?} overflows usize")))?;

    if u128::from(available) < bytes as u128 {
        return Err(Error::TruncatedData {
            expected: count,
            found: usize::try_from(available / size as u64).unwrap_or(usize::MAX),
        });
    }

    let mut samples: Vec<T> = Vec::new();
    samples
        .try_reserve_exact(count)
        .map_err(|_| Error::InsufficientMemory { bytes })?;
    samples.resize(count, T::zeroed());

    let found = read_full(reader, bytemuck::cast_slice_mut(&mut samples[..]))?;
    if found < bytes {
        return Err(Error::TruncatedData {
            expected: count,
            found: found / size,
        });
    }

    if cfg!(target_endian = "big") {
        for v in samples.iter_mut() {
            *v = v.decode_le();
        }
    }

    Array3::from_shape_vec((shape[0], shape[1], shape[2]), samples)
        .map_err(|e| Error::InvalidDimensions(e.to_string()))
}

fn write_le<T: Sample, W: Write + ?Sized>(writer: &mut W, samples: &[T]) -> Result<(), Error> {
    if cfg!(target_endian = "little") {
        writer.write_all(bytemuck::cast_slice(samples))?;
        return Ok(());
    }

    const CHUNK: usize = 8192;
    let mut buffer: Vec<T> = Vec::with_capacity(CHUNK.min(samples.len()));
    for chunk in samples.chunks(CHUNK) {
        buffer.clear();
        buffer.extend(chunk.iter().map(|v| v.encode_le()));
        writer.write_all(bytemuck::cast_slice(&buffer[..]))?;
    }
    Ok(())
}
