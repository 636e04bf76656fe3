use crate::{Error, SampleType};

/// Size of the fixed MRC header in bytes.
pub const HEADER_SIZE: usize = 1024;

/// Machine stamp for a little-endian new-style header (IMOD 2.6.20+).
pub const MACHINE_STAMP_LE: [u8; 4] = [0x44, 0x41, 0x00, 0x00];

pub(crate) const MACHINE_STAMP_OFFSET: usize = 212;
pub(crate) const DENSITY_OFFSET: usize = 76;
pub(crate) const EXTRA_OFFSET: usize = 88;
pub(crate) const EXTRA_WORDS: usize = 34;

/// Header words in file order (column, row, section), exactly as stored.
///
/// This is scratch state for decoding and encoding; callers normally work
/// with [`crate::VolumeMetadata`] instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHeader {
    /// Number of columns, rows and sections
    pub dims: [i32; 3],
    /// Mode value (see `SampleType`)
    pub mode: i32,
    /// Location of first column, row and section in the unit cell (unused)
    pub start: [i32; 3],
    /// Sampling along X, Y and Z of the unit cell
    pub grid_size: [i32; 3],
    /// Cell dimensions in Angstroms (Å)
    pub cell_volume: [f32; 3],
    /// Cell angles in degrees
    pub cell_angles: [f32; 3],
    /// 1-based index of column, row and section axis (1,2,3 for X,Y,Z)
    pub axis_order: [i32; 3],
    /// Minimum, maximum and mean density.
    /// Old readers treat these words as int32; writers store float32.
    pub density: [f32; 3],
    /// Extra block; word 1 counts the 4-byte words of the FEI extension
    pub extra: [i32; EXTRA_WORDS],
    /// Machine stamp (bytes 212-215, overlaps `extra[31]`)
    pub machine_stamp: [u8; 4],
}

impl RawHeader {
    /// Header for a row-major volume of `shape`, with min/max/mean unset.
    ///
    /// File dims are the reversed logical shape, and the cell edge along each
    /// file axis is `voxel_size * count` so that `cell / grid` restores the
    /// voxel size on decode.
    pub fn for_volume(
        shape: &[usize],
        sample_type: SampleType,
        voxel_size: [f32; 3],
    ) -> Result<Self, Error> {
        let shape: [usize; 3] = shape.try_into().map_err(|_| {
            Error::InvalidDimensions(format!("expected 3 axes, got {}", shape.len()))
        })?;

        let mut dims = [0i32; 3];
        for (file_axis, logical_axis) in (0..3).rev().enumerate() {
            let n = shape[logical_axis];
            if n == 0 {
                return Err(Error::InvalidDimensions(format!(
                    "axis {logical_axis} has zero length"
                )));
            }
            dims[file_axis] = i32::try_from(n).map_err(|_| {
                Error::InvalidDimensions(format!("axis {logical_axis} length {n} exceeds i32"))
            })?;
        }

        let cell_volume = [
            voxel_size[2] * shape[2] as f32,
            voxel_size[1] * shape[1] as f32,
            voxel_size[0] * shape[0] as f32,
        ];

        let mut extra = [0i32; EXTRA_WORDS];
        extra[(MACHINE_STAMP_OFFSET - EXTRA_OFFSET) / 4] = i32::from_le_bytes(MACHINE_STAMP_LE);

        Ok(Self {
            dims,
            mode: sample_type.code(),
            start: [0; 3],
            grid_size: dims,
            cell_volume,
            cell_angles: [90.0; 3],
            axis_order: [1, 2, 3],
            density: [0.0; 3],
            extra,
            machine_stamp: MACHINE_STAMP_LE,
        })
    }

    #[inline]
    /// Size of the FEI extension in 4-byte words (`extra[1]`).
    pub fn extension_word_count(&self) -> i32 {
        self.extra[1]
    }

    #[inline]
    /// True when the machine stamp announces big-endian data (0x11 0x11).
    pub fn is_big_endian_stamp(&self) -> bool {
        self.machine_stamp[0] == 0x11 && self.machine_stamp[1] == 0x11
    }

    /// Decode header words from raw little-endian bytes.
    pub fn decode_from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let decode_i32 = |offset: usize| -> i32 {
            i32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let decode_f32 = |offset: usize| -> f32 {
            f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        let mut extra = [0i32; EXTRA_WORDS];
        for (i, word) in extra.iter_mut().enumerate() {
            *word = decode_i32(EXTRA_OFFSET + 4 * i);
        }

        Self {
            dims: [decode_i32(0), decode_i32(4), decode_i32(8)],
            mode: decode_i32(12),
            start: [decode_i32(16), decode_i32(20), decode_i32(24)],
            grid_size: [decode_i32(28), decode_i32(32), decode_i32(36)],
            cell_volume: [decode_f32(40), decode_f32(44), decode_f32(48)],
            cell_angles: [decode_f32(52), decode_f32(56), decode_f32(60)],
            axis_order: [decode_i32(64), decode_i32(68), decode_i32(72)],
            density: [decode_f32(76), decode_f32(80), decode_f32(84)],
            extra,
            // Byte signature, no endian conversion
            machine_stamp: [bytes[212], bytes[213], bytes[214], bytes[215]],
        }
    }

    /// Encode header words as little-endian bytes. Bytes past the extra
    /// block are left untouched.
    pub fn encode_to_bytes(&self, out: &mut [u8; HEADER_SIZE]) {
        macro_rules! encode_words {
            ($offset:expr, $values:expr) => {
                for (i, value) in $values.iter().enumerate() {
                    let at = $offset + 4 * i;
                    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
                }
            };
        }

        encode_words!(0, self.dims);
        encode_words!(12, [self.mode]);
        encode_words!(16, self.start);
        encode_words!(28, self.grid_size);
        encode_words!(40, self.cell_volume);
        encode_words!(52, self.cell_angles);
        encode_words!(64, self.axis_order);
        encode_words!(DENSITY_OFFSET, self.density);
        encode_words!(EXTRA_OFFSET, self.extra);

        out[MACHINE_STAMP_OFFSET..MACHINE_STAMP_OFFSET + 4].copy_from_slice(&self.machine_stamp);
    }
}

/// Encodes the 1024-byte header for a row-major volume of `shape`.
///
/// Only the non-extended layout is produced: axis order 1,2,3, right cell
/// angles and no FEI block. Min/max/mean are left zero; the write path
/// fills them in once the samples are known.
pub fn encode_header(
    shape: &[usize],
    sample_type: SampleType,
    voxel_size: [f32; 3],
) -> Result<[u8; HEADER_SIZE], Error> {
    let header = RawHeader::for_volume(shape, sample_type, voxel_size)?;
    let mut out = [0u8; HEADER_SIZE];
    header.encode_to_bytes(&mut out);
    Ok(out)
}

/// Stores min/max/mean as float32 at the density offset of an encoded header.
pub(crate) fn patch_density(out: &mut [u8; HEADER_SIZE], min: f32, max: f32, mean: f32) {
    for (i, value) in [min, max, mean].iter().enumerate() {
        let at = DENSITY_OFFSET + 4 * i;
        out[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}
