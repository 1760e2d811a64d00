//! Error types for the mixing engine.
//!
//! Variants carry integer context only so that failing a hot-path call
//! never allocates.

use mx_pcm::PcmError;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixBufError {
    #[error(transparent)]
    Pcm(#[from] PcmError),

    #[error("mixing buffer must hold at least one frame")]
    ZeroCapacity,

    #[error("source rate must be non-zero when converting to {dst_hz} Hz")]
    ZeroSourceRate { dst_hz: u32 },

    #[error("destination rate must be non-zero when converting from {src_hz} Hz")]
    ZeroDestRate { src_hz: u32 },

    #[error("resampling {0} channels is not supported")]
    ResampleChannels(usize),

    #[error("state is bound to {state} channels but the buffer has {buffer}")]
    ChannelMismatch { state: usize, buffer: usize },

    #[error("window of {frames} frames at offset {offset} exceeds the {available} frames available")]
    WindowOutOfRange {
        offset: usize,
        frames: usize,
        available: usize,
    },

    #[error("destination buffer of {bytes} bytes cannot hold one {frame_bytes}-byte frame")]
    DestinationTooSmall { bytes: usize, frame_bytes: usize },

    #[error("source length {bytes} is not a whole number of {frame_bytes}-byte frames")]
    PartialFrame { bytes: usize, frame_bytes: usize },
}
