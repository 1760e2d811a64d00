//! PCM format descriptors for the mixbuf engine.
//!
//! This crate describes audio the way the engine's callers hand it over:
//! channel count and layout, sample rate, sample width and signedness.
//! It holds no audio itself.
//!
//! Designed to be `no_std` compatible.

#![cfg_attr(not(feature = "std"), no_std)]

mod channel;
mod error;
mod props;
mod volume;

pub use channel::{default_layout, ChannelId};
pub use error::PcmError;
pub use props::{PcmProps, SampleFormat};
pub use volume::Volume;

/// Maximum number of channels in a frame.
pub const MAX_CHANNELS: usize = 12;
