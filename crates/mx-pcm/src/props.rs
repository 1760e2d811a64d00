//! PCM properties: what one frame of external audio looks like.

use core::fmt;

use arrayvec::ArrayVec;

use crate::channel::default_layout;
use crate::{ChannelId, PcmError, MAX_CHANNELS};

/// Sample width and signedness, flattened into one tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    /// Signed 32-bit payload in a 64-bit container. Used to chain buffers losslessly.
    Raw,
}

impl SampleFormat {
    /// Bytes per sample.
    pub fn bytes(self) -> usize {
        match self {
            SampleFormat::S8 | SampleFormat::U8 => 1,
            SampleFormat::S16 | SampleFormat::U16 => 2,
            SampleFormat::S32 | SampleFormat::U32 => 4,
            SampleFormat::Raw => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, SampleFormat::U8 | SampleFormat::U16 | SampleFormat::U32)
    }

    /// Little-endian bytes of one silent sample.
    fn silence_le(self) -> [u8; 8] {
        match self {
            SampleFormat::U8 => [0x80, 0, 0, 0, 0, 0, 0, 0],
            SampleFormat::U16 => [0, 0x80, 0, 0, 0, 0, 0, 0],
            SampleFormat::U32 => [0, 0, 0, 0x80, 0, 0, 0, 0],
            _ => [0; 8],
        }
    }
}

/// Description of a PCM stream: layout, rate and sample encoding.
///
/// Immutable once built. Peek and write states copy what they need from
/// it at initialisation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcmProps {
    format: SampleFormat,
    rate: u32,
    channel_ids: ArrayVec<ChannelId, MAX_CHANNELS>,
}

impl PcmProps {
    /// Build properties for integer PCM of `bytes` width (1, 2 or 4).
    ///
    /// Channel ids get the standard layout for `channels`; use
    /// [`PcmProps::with_channel_ids`] to override.
    pub fn new(bytes: u8, signed: bool, channels: usize, rate: u32) -> Result<Self, PcmError> {
        let format = match (bytes, signed) {
            (1, true) => SampleFormat::S8,
            (1, false) => SampleFormat::U8,
            (2, true) => SampleFormat::S16,
            (2, false) => SampleFormat::U16,
            (4, true) => SampleFormat::S32,
            (4, false) => SampleFormat::U32,
            _ => {
                return Err(PcmError::UnsupportedFormat {
                    bytes,
                    signed,
                    raw: false,
                })
            }
        };
        Self::with_format(format, channels, rate)
    }

    /// Properties for the raw 64-bit container format.
    pub fn raw(channels: usize, rate: u32) -> Result<Self, PcmError> {
        Self::with_format(SampleFormat::Raw, channels, rate)
    }

    pub fn with_format(format: SampleFormat, channels: usize, rate: u32) -> Result<Self, PcmError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(PcmError::InvalidChannelCount {
                channels,
                max: MAX_CHANNELS,
            });
        }
        if rate == 0 {
            return Err(PcmError::ZeroRate);
        }
        Ok(Self {
            format,
            rate,
            channel_ids: default_layout(channels),
        })
    }

    /// Replace the channel layout. `ids` must name every channel.
    pub fn with_channel_ids(mut self, ids: &[ChannelId]) -> Result<Self, PcmError> {
        if ids.len() != self.channel_ids.len() {
            return Err(PcmError::LayoutMismatch {
                ids: ids.len(),
                channels: self.channel_ids.len(),
            });
        }
        self.channel_ids.clear();
        self.channel_ids.extend(ids.iter().copied());
        Ok(self)
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn channels(&self) -> usize {
        self.channel_ids.len()
    }

    pub fn channel_ids(&self) -> &[ChannelId] {
        &self.channel_ids
    }

    pub fn sample_bytes(&self) -> usize {
        self.format.bytes()
    }

    pub fn is_signed(&self) -> bool {
        self.format.is_signed()
    }

    pub fn is_raw(&self) -> bool {
        self.format == SampleFormat::Raw
    }

    /// Bytes per interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.sample_bytes() * self.channels()
    }

    pub fn frames_to_bytes(&self, frames: usize) -> usize {
        frames * self.frame_bytes()
    }

    /// Whole frames contained in `bytes`; a trailing partial frame is dropped.
    pub fn bytes_to_frames(&self, bytes: usize) -> usize {
        bytes / self.frame_bytes()
    }

    /// Frames covering `ms` milliseconds at this rate, rounded down.
    pub fn ms_to_frames(&self, ms: u32) -> usize {
        (self.rate as u64 * ms as u64 / 1000) as usize
    }

    /// True when two descriptors share width, signedness and channel count,
    /// so their byte streams are interchangeable.
    pub fn same_encoding(&self, other: &PcmProps) -> bool {
        self.format == other.format && self.channels() == other.channels()
    }

    /// True if every whole sample in `buf` is this format's silence value.
    pub fn is_buffer_silence(&self, buf: &[u8]) -> bool {
        let width = self.sample_bytes();
        let silence = self.format.silence_le();
        buf.chunks_exact(width).all(|s| s == &silence[..width])
    }

    /// Fill `buf` with this format's silence value.
    pub fn clear_buffer(&self, buf: &mut [u8]) {
        let width = self.sample_bytes();
        let silence = self.format.silence_le();
        for sample in buf.chunks_exact_mut(width) {
            sample.copy_from_slice(&silence[..width]);
        }
    }
}

impl fmt::Display for PcmProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.format {
            SampleFormat::S8 => "s8",
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::U16 => "u16",
            SampleFormat::S32 => "s32",
            SampleFormat::U32 => "u32",
            SampleFormat::Raw => "raw",
        };
        write!(f, "{}Hz {}ch {}", self.rate, self.channels(), tag)
    }
}
