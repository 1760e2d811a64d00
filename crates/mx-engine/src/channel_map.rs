//! Channel routing between two PCM layouts.
//!
//! The map is built once when a peek or write state is initialised and
//! then consulted per frame by the transcoders.

use arrayvec::ArrayVec;
use mx_pcm::{ChannelId, PcmProps, MAX_CHANNELS};

/// Where a destination channel gets its sample from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelSource {
    /// Copy from this source channel index.
    Channel(u8),
    /// Emit all-bits-zero.
    Zero,
    /// Emit the destination format's silence value.
    Silence,
}

/// One entry per destination channel.
pub type ChannelMap = ArrayVec<ChannelSource, MAX_CHANNELS>;

/// Build the routing from `src` channels to `dst` channels.
///
/// Positional destination channels pick the source channel with the same
/// id, or silence when the source has none. `Unknown` destinations are
/// also silenced.
pub fn build_channel_map(src: &PcmProps, dst: &PcmProps) -> ChannelMap {
    let src_ids = src.channel_ids();
    let mut map = ChannelMap::new();

    for &id in dst.channel_ids() {
        let source = if id.is_position() {
            match src_ids.iter().position(|&s| s == id) {
                Some(idx) => ChannelSource::Channel(idx as u8),
                None => ChannelSource::Silence,
            }
        } else {
            match id {
                // TODO: pick an unclaimed source channel once layouts carry enough information.
                ChannelId::Unknown => ChannelSource::Silence,
                ChannelId::UnusedSilence => ChannelSource::Silence,
                _ => ChannelSource::Zero,
            }
        };
        map.push(source);
    }
    map
}

/// True if destination channel `i` reads source channel `i` for every `i`.
pub fn is_identity(map: &[ChannelSource]) -> bool {
    map.iter()
        .enumerate()
        .all(|(i, &s)| s == ChannelSource::Channel(i as u8))
}
