//! Decoded, user-facing description of an MRC volume.

use std::io::{Read, Seek, SeekFrom};

use crate::header::{HEADER_SIZE, RawHeader};
use crate::{Error, SampleType};

const EXTENSION_FIELDS: usize = 15;
const EXTENSION_SIZE: usize = EXTENSION_FIELDS * 4;
const METERS_TO_ANGSTROM: f64 = 1e10;

/// Acquisition metadata from the FEI extension block that follows the
/// fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VendorExtension {
    /// First alpha tilt (deg)
    pub a_tilt: f32,
    /// First beta tilt (deg)
    pub b_tilt: f32,
    /// Stage position (m)
    pub x_stage: f32,
    pub y_stage: f32,
    pub z_stage: f32,
    /// Image shift (m)
    pub x_shift: f32,
    pub y_shift: f32,
    /// Starting defocus (m)
    pub defocus: f32,
    /// Exposure time (s)
    pub exposure_time: f32,
    /// Mean value of the image
    pub mean_intensity: f32,
    /// Tilt axis (deg)
    pub tilt_axis: f32,
    /// Pixel size of the image (m)
    pub pixel_size: f32,
    pub magnification: f32,
    /// Accelerating voltage
    pub voltage: f32,
    pub reserved: f32,
}

impl VendorExtension {
    pub fn decode_from_bytes(bytes: &[u8; EXTENSION_SIZE]) -> Self {
        let mut v = [0f32; EXTENSION_FIELDS];
        for (i, value) in v.iter_mut().enumerate() {
            let at = 4 * i;
            *value = f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }

        Self {
            a_tilt: v[0],
            b_tilt: v[1],
            x_stage: v[2],
            y_stage: v[3],
            z_stage: v[4],
            x_shift: v[5],
            y_shift: v[6],
            defocus: v[7],
            exposure_time: v[8],
            mean_intensity: v[9],
            tilt_axis: v[10],
            pixel_size: v[11],
            magnification: v[12],
            voltage: v[13],
            reserved: v[14],
        }
    }

    #[inline]
    /// Pixel size converted to Angstroms.
    pub fn pixel_size_angstrom(&self) -> f32 {
        (self.pixel_size as f64 * METERS_TO_ANGSTROM) as f32
    }
}

/// Logical shape of the stored array: file dims permuted by the axis order,
/// then reversed so the last axis varies fastest.
///
/// `dims` and `axis_order` are in file order (column, row, section).
/// `axis_order` must be a permutation of `[1, 2, 3]`.
pub fn logical_shape(dims: [i32; 3], axis_order: [i32; 3]) -> Result<[usize; 3], Error> {
    let mut sorted = axis_order;
    sorted.sort_unstable();
    if sorted != [1, 2, 3] {
        return Err(Error::InvalidAxisOrder(axis_order));
    }

    let mut shape = [0usize; 3];
    for (slot, &axis) in shape.iter_mut().zip(axis_order.iter()) {
        let n = dims[(axis - 1) as usize];
        *slot = usize::try_from(n)
            .map_err(|_| Error::InvalidDimensions(format!("negative axis length {n}")))?;
    }
    shape.reverse();
    Ok(shape)
}

/// Voxel pitch in file order; `[1, 1, 1]` when either the cell or the grid
/// is unset.
fn file_voxel_size(cell_volume: [f32; 3], grid_size: [i32; 3]) -> [f32; 3] {
    if cell_volume.iter().all(|&c| c == 0.0) || grid_size.iter().all(|&g| g == 0) {
        return [1.0; 3];
    }
    core::array::from_fn(|i| cell_volume[i] / grid_size[i] as f32)
}

#[inline]
fn reversed<T: Copy>(mut values: [T; 3]) -> [T; 3] {
    values.reverse();
    values
}

/// Everything needed to interpret the sample block of one MRC file.
///
/// All per-axis fields use the logical (row-major) order of [`shape`].
///
/// [`shape`]: VolumeMetadata::shape
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMetadata {
    shape: [usize; 3],
    sample_type: SampleType,
    voxel_size: [f32; 3],
    axis_orientations: [i32; 3],
    cell_angles: [f32; 3],
    vendor_extension: Option<VendorExtension>,
    data_offset: u64,
}

impl VolumeMetadata {
    /// Reads the fixed header and, if announced, the FEI extension.
    ///
    /// The stream is positioned at the end of what was read; sample reads
    /// seek to [`data_offset`](Self::data_offset) themselves.
    pub fn decode<R: Read + Seek>(reader: &mut R) -> Result<Self, Error> {
        reader.seek(SeekFrom::Start(0))?;
        let mut bytes = [0u8; HEADER_SIZE];
        let found = read_full(reader, &mut bytes)?;
        if found < HEADER_SIZE {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE,
                found,
            });
        }
        let raw = RawHeader::decode_from_bytes(&bytes);

        let extension = if raw.extension_word_count() != 0 {
            reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
            let mut ext = [0u8; EXTENSION_SIZE];
            let found = read_full(reader, &mut ext)?;
            if found < EXTENSION_SIZE {
                return Err(Error::TruncatedHeader {
                    expected: HEADER_SIZE + EXTENSION_SIZE,
                    found: HEADER_SIZE + found,
                });
            }
            Some(VendorExtension::decode_from_bytes(&ext))
        } else {
            None
        };

        Self::from_raw(&raw, extension)
    }

    /// Derives metadata from decoded header words. No I/O.
    pub fn from_raw(raw: &RawHeader, extension: Option<VendorExtension>) -> Result<Self, Error> {
        let sample_type = SampleType::from_code(raw.mode)?;

        let word_count = raw.extension_word_count();
        if word_count < 0 {
            return Err(Error::InvalidExtensionSize(word_count));
        }
        if word_count > 0 && extension.is_none() {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE + EXTENSION_SIZE,
                found: HEADER_SIZE,
            });
        }

        if raw.is_big_endian_stamp() {
            tracing::warn!(
                stamp = ?raw.machine_stamp,
                "machine stamp announces big-endian data, reading as little-endian"
            );
        }

        let shape = logical_shape(raw.dims, raw.axis_order)?;
        let mut voxel_size = reversed(file_voxel_size(raw.cell_volume, raw.grid_size));

        // Tilt increments are not uniform, so the tilt axis gets a unit pitch.
        if let Some(ext) = &extension {
            let pixel = ext.pixel_size_angstrom();
            voxel_size = [1.0, pixel, pixel];
        }

        let data_offset = HEADER_SIZE as u64 + word_count as u64 * 4;

        tracing::debug!(
            dims = ?raw.dims,
            mode = raw.mode,
            ?shape,
            ?voxel_size,
            extension = extension.is_some(),
            data_offset,
            "decoded MRC header"
        );

        Ok(Self {
            shape,
            sample_type,
            voxel_size,
            axis_orientations: reversed(raw.axis_order),
            cell_angles: reversed(raw.cell_angles),
            vendor_extension: extension,
            data_offset,
        })
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    #[inline]
    /// Å per voxel along each logical axis.
    pub fn voxel_size(&self) -> [f32; 3] {
        self.voxel_size
    }

    #[inline]
    pub fn axis_orientations(&self) -> [i32; 3] {
        self.axis_orientations
    }

    #[inline]
    pub fn cell_angles(&self) -> [f32; 3] {
        self.cell_angles
    }

    #[inline]
    pub fn vendor_extension(&self) -> Option<&VendorExtension> {
        self.vendor_extension.as_ref()
    }

    #[inline]
    /// Offset, in bytes, from file start to the first sample.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Number of samples in the volume, or `None` on overflow.
    pub fn sample_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    /// Size, in bytes, of the sample block, or `None` on overflow.
    pub fn data_size(&self) -> Option<usize> {
        self.sample_count()?.checked_mul(self.sample_type.byte_size())
    }
}

/// Fills `buf` until it is full or the stream ends; returns the byte count.
pub(crate) fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
