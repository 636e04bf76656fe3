use ndarray::Array3;

use crate::{Error, Volume};

/// Sample element type stored in the MRC `mode` word.
///
/// Complex modes (3 and 4) are recognised by [`SampleType::from_code`] only
/// in order to reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Int8 = 0,
    Int16 = 1,
    Float32 = 2,
    Uint16 = 6,
}

impl SampleType {
    #[inline]
    pub fn from_code(mode: i32) -> Result<Self, Error> {
        match mode {
            0 => Ok(Self::Int8),
            1 => Ok(Self::Int16),
            2 => Ok(Self::Float32),
            6 => Ok(Self::Uint16),
            _ => Err(Error::UnsupportedSampleType(mode)),
        }
    }

    #[inline]
    pub fn code(&self) -> i32 {
        *self as i32
    }

    #[inline]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
            Self::Uint16 => 2,
        }
    }

    /// Lower-case dtype name, as used in raw dump file names.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Float32 => "float32",
            Self::Uint16 => "uint16",
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Uint16)
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32)
    }
}

impl core::fmt::Display for SampleType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Element types that can be stored in an MRC file.
///
/// Values on disk are always little-endian; `decode_le`/`encode_le` are
/// no-ops on little-endian hosts.
pub trait Sample: bytemuck::Pod + Send + Sync + 'static {
    const SAMPLE_TYPE: SampleType;

    fn to_f64(self) -> f64;

    /// Converts a value loaded verbatim from file bytes to native order.
    fn decode_le(self) -> Self;

    /// Converts a native value to the byte order written to disk.
    fn encode_le(self) -> Self;

    fn into_volume(array: Array3<Self>) -> Volume;

    fn from_volume(volume: &Volume) -> Option<&Array3<Self>>;
}

macro_rules! impl_int_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const SAMPLE_TYPE: SampleType = SampleType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn decode_le(self) -> Self {
                <$ty>::from_le(self)
            }

            #[inline]
            fn encode_le(self) -> Self {
                <$ty>::to_le(self)
            }

            #[inline]
            fn into_volume(array: Array3<Self>) -> Volume {
                Volume::$variant(array)
            }

            #[inline]
            fn from_volume(volume: &Volume) -> Option<&Array3<Self>> {
                match volume {
                    Volume::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }
    };
}

impl_int_sample!(i8, Int8);
impl_int_sample!(i16, Int16);
impl_int_sample!(u16, Uint16);

impl Sample for f32 {
    const SAMPLE_TYPE: SampleType = SampleType::Float32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn decode_le(self) -> Self {
        f32::from_bits(u32::from_le(self.to_bits()))
    }

    #[inline]
    fn encode_le(self) -> Self {
        f32::from_bits(self.to_bits().to_le())
    }

    #[inline]
    fn into_volume(array: Array3<Self>) -> Volume {
        Volume::Float32(array)
    }

    #[inline]
    fn from_volume(volume: &Volume) -> Option<&Array3<Self>> {
        match volume {
            Volume::Float32(array) => Some(array),
            _ => None,
        }
    }
}
