//! Mixing ring buffer for the mixbuf engine.
//!
//! A [`MixBuffer`] holds frames as 32-bit "wide" samples. External PCM in
//! any supported format is decoded, optionally resampled and written or
//! blended in through a [`WriteState`], then read back out through a
//! [`PeekState`] in another format and rate. Volume is applied on commit.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod blend;
pub mod channel_map;
pub mod codec;
mod error;
mod mix_buffer;
pub mod rate;
mod transcode;
mod volume;

pub use blend::{blend, blend_buffer, blend_into};
pub use channel_map::{ChannelMap, ChannelSource};
pub use error::MixBufError;
pub use mix_buffer::{MixBuffer, PeekState, WriteState};
pub use rate::RateState;
pub use volume::{MixVolume, VOLUME_0DB, VOLUME_SHIFT};

/// Wide samples of stack scratch space used per conversion pass.
pub const SCRATCH_SAMPLES: usize = 1024;

/// Run `f` with heap allocation forbidden when the `alloc_check` feature is on.
#[inline]
pub fn realtime<T>(f: impl FnOnce() -> T) -> T {
    #[cfg(feature = "alloc_check")]
    {
        assert_no_alloc::assert_no_alloc(f)
    }
    #[cfg(not(feature = "alloc_check"))]
    {
        f()
    }
}
