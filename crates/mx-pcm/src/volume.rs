//! Caller-facing volume setting.

use crate::MAX_CHANNELS;

/// Per-channel volume as handed in by the stream layer.
///
/// Levels are 8-bit: 0 is -96 dB, 255 is 0 dB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Volume {
    pub muted: bool,
    pub levels: [u8; MAX_CHANNELS],
}

impl Volume {
    /// Full scale on every channel.
    pub const MAX: Volume = Volume {
        muted: false,
        levels: [u8::MAX; MAX_CHANNELS],
    };

    pub const MUTED: Volume = Volume {
        muted: true,
        levels: [u8::MAX; MAX_CHANNELS],
    };

    /// Same level on every channel.
    pub fn uniform(level: u8) -> Self {
        Volume {
            muted: false,
            levels: [level; MAX_CHANNELS],
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::MAX
    }
}
