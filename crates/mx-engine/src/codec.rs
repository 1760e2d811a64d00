//! Sample codecs: native PCM samples to and from the wide representation.
//!
//! Wide samples are 32-bit signed values scaled so that a native sample's
//! full range spans `[-2^31, 2^31)`. Narrowing truncates with an
//! arithmetic right shift; nothing is rounded. All native samples are
//! little-endian.

/// One native PCM sample type.
pub trait Sample: Copy {
    /// Encoded size in bytes.
    const BYTES: usize;
    /// All bits clear.
    const ZERO: Self;
    /// The quiet value: zero for signed formats, mid-scale for unsigned.
    const SILENCE: Self;

    /// Read one sample from the front of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;
    /// Write one sample to the front of `bytes`.
    fn write_le(self, bytes: &mut [u8]);

    fn to_wide(self) -> i32;
    fn from_wide(wide: i32) -> Self;
}

/// Signed 32-bit payload carried in a 64-bit container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSample(pub i64);

macro_rules! impl_signed {
    ($ty:ty, $bytes:expr) => {
        impl Sample for $ty {
            const BYTES: usize = $bytes;
            const ZERO: Self = 0;
            const SILENCE: Self = 0;

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $bytes];
                raw.copy_from_slice(&bytes[..$bytes]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                bytes[..$bytes].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn to_wide(self) -> i32 {
                (self as i32) << (32 - 8 * $bytes)
            }

            #[inline]
            fn from_wide(wide: i32) -> Self {
                (wide >> (32 - 8 * $bytes)) as $ty
            }
        }
    };
}

macro_rules! impl_unsigned {
    ($ty:ty, $bytes:expr, $half:expr) => {
        impl Sample for $ty {
            const BYTES: usize = $bytes;
            const ZERO: Self = 0;
            const SILENCE: Self = $half;

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $bytes];
                raw.copy_from_slice(&bytes[..$bytes]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                bytes[..$bytes].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn to_wide(self) -> i32 {
                ((self as i32).wrapping_sub($half as i32)) << (32 - 8 * $bytes)
            }

            #[inline]
            fn from_wide(wide: i32) -> Self {
                ((wide >> (32 - 8 * $bytes)) as $ty).wrapping_add($half)
            }
        }
    };
}

impl_signed!(i8, 1);
impl_signed!(i16, 2);
impl_unsigned!(u8, 1, 0x80);
impl_unsigned!(u16, 2, 0x8000);

impl Sample for i32 {
    const BYTES: usize = 4;
    const ZERO: Self = 0;
    const SILENCE: Self = 0;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn to_wide(self) -> i32 {
        self
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        wide
    }
}

// Full-width unsigned: re-centring is a flip of the top bit.
impl Sample for u32 {
    const BYTES: usize = 4;
    const ZERO: Self = 0;
    const SILENCE: Self = 0x8000_0000;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn to_wide(self) -> i32 {
        self.wrapping_sub(0x8000_0000) as i32
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        (wide as u32).wrapping_add(0x8000_0000)
    }
}

impl Sample for RawSample {
    const BYTES: usize = 8;
    const ZERO: Self = RawSample(0);
    const SILENCE: Self = RawSample(0);

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        RawSample(i64::from_le_bytes(raw))
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[..8].copy_from_slice(&self.0.to_le_bytes());
    }

    #[inline]
    fn to_wide(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        RawSample(wide as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_roundtrips_exactly() {
        for v in i8::MIN..=i8::MAX {
            assert_eq!(i8::from_wide(v.to_wide()), v);
        }
        for v in u8::MIN..=u8::MAX {
            assert_eq!(u8::from_wide(v.to_wide()), v);
        }
    }

    #[test]
    fn sixteen_bit_roundtrips_exactly() {
        for v in i16::MIN..=i16::MAX {
            assert_eq!(i16::from_wide(v.to_wide()), v);
        }
        for v in u16::MIN..=u16::MAX {
            assert_eq!(u16::from_wide(v.to_wide()), v);
        }
    }

    #[test]
    fn thirty_two_bit_roundtrips_exactly() {
        for v in [i32::MIN, -1, 0, 1, 0x1234_5678, i32::MAX] {
            assert_eq!(i32::from_wide(v.to_wide()), v);
        }
        for v in [0u32, 1, 0x7FFF_FFFF, 0x8000_0000, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(u32::from_wide(v.to_wide()), v);
        }
        for v in [i32::MIN as i64, -7, 0, 42, i32::MAX as i64] {
            assert_eq!(RawSample::from_wide(RawSample(v).to_wide()), RawSample(v));
        }
    }

    #[test]
    fn full_range_maps_to_full_wide_range() {
        assert_eq!(i8::MIN.to_wide(), i32::MIN);
        assert_eq!(i16::MIN.to_wide(), i32::MIN);
        assert_eq!(i16::MAX.to_wide(), 0x7FFF_0000);
        assert_eq!(u8::MIN.to_wide(), i32::MIN);
        assert_eq!(0x80u8.to_wide(), 0);
        assert_eq!(u16::MAX.to_wide(), 0x7FFF_0000);
        assert_eq!(0u32.to_wide(), i32::MIN);
        assert_eq!(u32::MAX.to_wide(), i32::MAX);
    }

    #[test]
    fn narrowing_truncates_toward_negative_infinity() {
        // -1 wide is just below zero: the top 16 bits are all ones.
        assert_eq!(i16::from_wide(-1), -1);
        assert_eq!(i16::from_wide(0xFFFF), 0);
        assert_eq!(i8::from_wide(0x7FFF_FFFF), i8::MAX);
    }

    #[test]
    fn widths_differ_only_in_precision() {
        let wide = 0x1234_5678;
        assert_eq!(i16::from_wide(wide), 0x1234);
        assert_eq!(i8::from_wide(wide), 0x12);
        assert_eq!(u16::from_wide(wide), 0x9234);
        assert_eq!(i16::from_wide(wide).to_wide(), 0x1234_0000);
    }

    #[test]
    fn silence_decodes_to_zero() {
        assert_eq!(u8::SILENCE.to_wide(), 0);
        assert_eq!(u16::SILENCE.to_wide(), 0);
        assert_eq!(u32::SILENCE.to_wide(), 0);
        assert_eq!(i16::SILENCE.to_wide(), 0);
    }

    #[test]
    fn little_endian_layout() {
        let mut buf = [0u8; 8];
        0x1234i16.write_le(&mut buf);
        assert_eq!(&buf[..2], &[0x34, 0x12]);
        assert_eq!(i16::read_le(&buf), 0x1234);

        RawSample(-2).write_le(&mut buf);
        assert_eq!(buf, [0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(RawSample::read_le(&buf), RawSample(-2));
    }
}
