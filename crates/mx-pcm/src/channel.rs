//! Channel position identifiers.

use arrayvec::ArrayVec;

use crate::MAX_CHANNELS;

/// Semantic meaning of one channel within a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelId {
    /// Not a usable channel id.
    #[default]
    Invalid = 0,
    /// Unused channel that must be filled with bit zero.
    UnusedZero,
    /// Unused channel that must be filled with the format's silence value.
    UnusedSilence,
    /// Channel of unknown position.
    Unknown,
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    RearLeft,
    RearRight,
    FrontLeftOfCenter,
    FrontRightOfCenter,
    RearCenter,
    SideLeft,
    SideRight,
    TopCenter,
    FrontLeftHeight,
    FrontCenterHeight,
    FrontRightHeight,
    RearLeftHeight,
    RearCenterHeight,
    RearRightHeight,
}

impl ChannelId {
    /// Mono is carried on the front centre channel.
    pub const MONO: ChannelId = ChannelId::FrontCenter;

    /// Returns true for real speaker positions (front-left and onwards).
    pub fn is_position(self) -> bool {
        self as u8 >= ChannelId::FrontLeft as u8
    }

    /// Map a WAVE_FORMAT_EXTENSIBLE speaker mask bit index to a position.
    pub fn from_speaker_bit(bit: u32) -> Option<ChannelId> {
        use ChannelId::*;
        Some(match bit {
            0 => FrontLeft,
            1 => FrontRight,
            2 => FrontCenter,
            3 => LowFrequency,
            4 => RearLeft,
            5 => RearRight,
            6 => FrontLeftOfCenter,
            7 => FrontRightOfCenter,
            8 => RearCenter,
            9 => SideLeft,
            10 => SideRight,
            11 => TopCenter,
            12 => FrontLeftHeight,
            13 => FrontCenterHeight,
            14 => FrontRightHeight,
            15 => RearLeftHeight,
            16 => RearCenterHeight,
            17 => RearRightHeight,
            _ => return None,
        })
    }

    /// Inverse of [`ChannelId::from_speaker_bit`].
    pub fn speaker_bit(self) -> Option<u32> {
        if !self.is_position() {
            return None;
        }
        Some(self as u32 - ChannelId::FrontLeft as u32)
    }
}

/// Standard channel layout for a channel count.
///
/// 1 to 8 channels get the usual mono/stereo/quad/5.1/7.1 style layouts.
/// 9 to 12 channels add the centre and top positions, kept in speaker-mask
/// order so the layout survives a WAVE_FORMAT_EXTENSIBLE header.
pub fn default_layout(channels: usize) -> ArrayVec<ChannelId, MAX_CHANNELS> {
    use ChannelId::*;
    let ids: &[ChannelId] = match channels {
        1 => &[FrontCenter],
        2 => &[FrontLeft, FrontRight],
        3 => &[FrontLeft, FrontRight, FrontCenter],
        4 => &[FrontLeft, FrontRight, RearLeft, RearRight],
        5 => &[FrontLeft, FrontRight, FrontCenter, RearLeft, RearRight],
        6 => &[FrontLeft, FrontRight, FrontCenter, LowFrequency, RearLeft, RearRight],
        7 => &[FrontLeft, FrontRight, FrontCenter, LowFrequency, RearLeft, RearRight, RearCenter],
        8 => &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            RearLeft,
            RearRight,
            SideLeft,
            SideRight,
        ],
        9 => &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            RearLeft,
            RearRight,
            RearCenter,
            SideLeft,
            SideRight,
        ],
        10 => &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            RearLeft,
            RearRight,
            RearCenter,
            SideLeft,
            SideRight,
            TopCenter,
        ],
        11 => &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            RearLeft,
            RearRight,
            FrontLeftOfCenter,
            FrontRightOfCenter,
            RearCenter,
            SideLeft,
            SideRight,
        ],
        12 => &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            LowFrequency,
            RearLeft,
            RearRight,
            FrontLeftOfCenter,
            FrontRightOfCenter,
            RearCenter,
            SideLeft,
            SideRight,
            TopCenter,
        ],
        _ => &[],
    };

    let mut layout = ArrayVec::new();
    layout.extend(ids.iter().copied());
    layout
}
