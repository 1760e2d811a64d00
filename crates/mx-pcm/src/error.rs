//! Error types for PCM descriptors.

use thiserror::Error;

/// Errors raised while building a [`PcmProps`](crate::PcmProps).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmError {
    #[error("invalid channel count {channels} (supported: 1..={max})")]
    InvalidChannelCount { channels: usize, max: usize },

    #[error("unsupported sample format: {bytes} bytes, signed={signed}, raw={raw}")]
    UnsupportedFormat { bytes: u8, signed: bool, raw: bool },

    #[error("sample rate must be non-zero")]
    ZeroRate,

    #[error("channel layout has {ids} ids for {channels} channels")]
    LayoutMismatch { ids: usize, channels: usize },
}
