//! Headless driver for the mixbuf engine.
//!
//! Pumps one or more PCM clips through a [`mx_engine::MixBuffer`] period by
//! period and collects the result in an output format. Both the CLI and the
//! integration tests go through this crate.

mod mixdown;

use mx_engine::MixBufError;
use mx_pcm::{PcmError, PcmProps, Volume};

// Re-export common types so callers don't need every engine crate directly.
pub use mx_formats::{clip_to_wav, read_wav, write_wav, FormatError, PcmClip};
pub use mx_pcm::ChannelId;

pub use mixdown::Mixdown;

/// Buffer length used by [`transcode`].
pub const DEFAULT_BUFFER_MS: u32 = 50;

#[derive(thiserror::Error, Debug)]
pub enum MasterError {
    #[error(transparent)]
    Engine(#[from] MixBufError),
    #[error(transparent)]
    Pcm(#[from] PcmError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("nothing to mix: no sources were added")]
    NoSources,
}

/// Convert a single clip to `out`, applying `volume`.
pub fn transcode(clip: PcmClip, out: &PcmProps, volume: &Volume) -> Result<PcmClip, MasterError> {
    let mut mixdown = Mixdown::new(out, DEFAULT_BUFFER_MS)?;
    mixdown.add_source(clip, &Volume::MAX)?;
    mixdown.set_volume(volume);
    mixdown.render()
}
