//! The mixing ring buffer.
//!
//! Frames are stored interleaved as wide samples. Writers stage audio
//! past the write position with [`MixBuffer::write`], [`MixBuffer::blend`]
//! and [`MixBuffer::silence`], then make it readable with
//! [`MixBuffer::commit`], which also applies the volume. Readers convert
//! out with [`MixBuffer::peek`] and consume with [`MixBuffer::advance`].
//!
//! Invariant: `used <= capacity` and `write_pos == (read_pos + used) % capacity`.

use alloc::vec;
use alloc::vec::Vec;

use arrayvec::ArrayString;
use mx_pcm::{PcmProps, Volume};
use tracing::{debug, trace, warn};

use crate::blend::blend_buffer;
use crate::channel_map::{build_channel_map, ChannelSource};
use crate::rate::RateState;
use crate::transcode::{select_decode, select_encode, DecodeFn, EncodeFn, Routing};
use crate::volume::MixVolume;
use crate::{MixBufError, SCRATCH_SAMPLES};

/// Conversion from a mixing buffer out to one external format.
///
/// Built once per destination format and reused for every peek. Carries
/// the resampler position, so one state should serve one consumer.
#[derive(Clone, Debug)]
pub struct PeekState {
    routing: Routing,
    dst_frame_bytes: usize,
    encode: EncodeFn,
    rate: RateState,
}

impl PeekState {
    /// Bind `buf`'s layout and rate to the destination format `props`.
    pub fn new(buf: &MixBuffer, props: &PcmProps) -> Result<Self, MixBufError> {
        let routing = Routing {
            src_channels: buf.channels(),
            dst_channels: props.channels(),
            map: build_channel_map(buf.props(), props),
        };
        let encode = select_encode(props.format(), &routing);
        let rate = RateState::new(buf.props().rate(), props.rate(), routing.src_channels)?;
        debug!(buffer = buf.name(), dst = %props, "peek state initialised");
        Ok(PeekState {
            routing,
            dst_frame_bytes: props.frame_bytes(),
            encode,
            rate,
        })
    }

    /// Bytes per destination frame.
    pub fn frame_bytes(&self) -> usize {
        self.dst_frame_bytes
    }

    pub fn channel_map(&self) -> &[ChannelSource] {
        &self.routing.map
    }

    pub fn rate(&self) -> &RateState {
        &self.rate
    }

    pub fn rate_mut(&mut self) -> &mut RateState {
        &mut self.rate
    }
}

/// Conversion from one external format into a mixing buffer.
#[derive(Clone, Debug)]
pub struct WriteState {
    routing: Routing,
    src_frame_bytes: usize,
    decode: DecodeFn,
    decode_blend: DecodeFn,
    rate: RateState,
}

impl WriteState {
    /// Bind the source format `props` to `buf`'s layout and rate.
    pub fn new(buf: &MixBuffer, props: &PcmProps) -> Result<Self, MixBufError> {
        let routing = Routing {
            src_channels: props.channels(),
            dst_channels: buf.channels(),
            map: build_channel_map(props, buf.props()),
        };
        let (decode, decode_blend) = select_decode(props.format(), &routing);
        let rate = RateState::new(props.rate(), buf.props().rate(), routing.dst_channels)?;
        debug!(buffer = buf.name(), src = %props, "write state initialised");
        Ok(WriteState {
            routing,
            src_frame_bytes: props.frame_bytes(),
            decode,
            decode_blend,
            rate,
        })
    }

    /// Bytes per source frame.
    pub fn frame_bytes(&self) -> usize {
        self.src_frame_bytes
    }

    pub fn channel_map(&self) -> &[ChannelSource] {
        &self.routing.map
    }

    pub fn rate(&self) -> &RateState {
        &self.rate
    }

    pub fn rate_mut(&mut self) -> &mut RateState {
        &mut self.rate
    }
}

/// Fixed-capacity ring of wide frames.
#[derive(Clone, Debug)]
pub struct MixBuffer {
    name: ArrayString<32>,
    props: PcmProps,
    channels: usize,
    /// Capacity in frames.
    capacity: usize,
    samples: Vec<i32>,
    off_read: usize,
    off_write: usize,
    used: usize,
    volume: MixVolume,
}

impl MixBuffer {
    /// Allocate a buffer of `frames` frames laid out as `props`.
    ///
    /// `props` supplies the channel layout and rate; its sample format only
    /// matters for the byte-size queries.
    pub fn new(name: &str, props: &PcmProps, frames: usize) -> Result<Self, MixBufError> {
        if frames == 0 {
            return Err(MixBufError::ZeroCapacity);
        }
        let mut short_name = ArrayString::new();
        for ch in name.chars() {
            if short_name.try_push(ch).is_err() {
                break;
            }
        }

        let channels = props.channels();
        debug!(name, props = %props, frames, "mixing buffer created");
        Ok(MixBuffer {
            name: short_name,
            props: props.clone(),
            channels,
            capacity: frames,
            samples: vec![0; frames * channels],
            off_read: 0,
            off_write: 0,
            used: 0,
            volume: MixVolume::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &PcmProps {
        &self.props
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Capacity in frames.
    pub fn size(&self) -> usize {
        self.capacity
    }

    pub fn size_bytes(&self) -> usize {
        self.props.frames_to_bytes(self.capacity)
    }

    /// Committed frames waiting to be read.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn used_bytes(&self) -> usize {
        self.props.frames_to_bytes(self.used)
    }

    /// Frames that can still be written and committed.
    pub fn free(&self) -> usize {
        self.capacity - self.used
    }

    pub fn free_bytes(&self) -> usize {
        self.props.frames_to_bytes(self.free())
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn read_pos(&self) -> usize {
        self.off_read
    }

    pub fn write_pos(&self) -> usize {
        self.off_write
    }

    pub fn volume(&self) -> &MixVolume {
        &self.volume
    }

    /// Raw wide samples of `frames` frames starting at physical frame `pos`.
    pub fn frames_at(&self, pos: usize, frames: usize) -> &[i32] {
        let start = pos.min(self.capacity) * self.channels;
        let end = (start + frames * self.channels).min(self.samples.len());
        &self.samples[start..end]
    }

    /// Discard everything, readable or staged. Storage is kept.
    pub fn drop_all(&mut self) {
        self.off_read = 0;
        self.off_write = 0;
        self.used = 0;
    }

    /// Set the volume used by subsequent commits.
    pub fn set_volume(&mut self, vol: &Volume) {
        debug!(name = %self.name, muted = vol.muted, "volume set");
        self.volume.set(vol, self.channels);
    }

    /// Convert up to `max_frames` committed frames, starting `offset` frames
    /// past the read position, into `dst`.
    ///
    /// Leaves the read position alone; follow with [`MixBuffer::advance`].
    /// Returns `(frames_consumed, bytes_written)`.
    pub fn peek(
        &self,
        offset: usize,
        max_frames: usize,
        state: &mut PeekState,
        dst: &mut [u8],
    ) -> Result<(usize, usize), MixBufError> {
        if state.routing.src_channels != self.channels {
            return Err(MixBufError::ChannelMismatch {
                state: state.routing.src_channels,
                buffer: self.channels,
            });
        }
        if offset.checked_add(max_frames).map_or(true, |end| end > self.used) {
            return Err(MixBufError::WindowOutOfRange {
                offset,
                frames: max_frames,
                available: self.used,
            });
        }
        let frame_bytes = state.dst_frame_bytes;
        if dst.len() < frame_bytes {
            return Err(MixBufError::DestinationTooSmall {
                bytes: dst.len(),
                frame_bytes,
            });
        }

        let off = (self.off_read + offset) % self.capacity;
        if state.rate.is_passthrough() {
            Ok(self.peek_direct(off, max_frames, state, dst))
        } else {
            Ok(self.peek_resampling(off, max_frames, state, dst))
        }
    }

    fn peek_direct(&self, off: usize, max_frames: usize, state: &PeekState, dst: &mut [u8]) -> (usize, usize) {
        let ch = self.channels;
        let fb = state.dst_frame_bytes;
        let frames = max_frames.min(dst.len() / fb);

        let first = frames.min(self.capacity - off);
        (state.encode)(
            &mut dst[..first * fb],
            &self.samples[off * ch..(off + first) * ch],
            first,
            &state.routing,
        );
        if frames > first {
            let rest = frames - first;
            (state.encode)(
                &mut dst[first * fb..frames * fb],
                &self.samples[..rest * ch],
                rest,
                &state.routing,
            );
        }
        (frames, frames * fb)
    }

    fn peek_resampling(
        &self,
        mut off: usize,
        mut remaining: usize,
        state: &mut PeekState,
        dst: &mut [u8],
    ) -> (usize, usize) {
        let ch = self.channels;
        let fb = state.dst_frame_bytes;
        let mut scratch = [0i32; SCRATCH_SAMPLES];
        let mut peeked = 0;
        let mut written = 0;

        while remaining > 0 && dst.len() - written >= fb {
            let src_frames = (self.capacity - off).min(remaining);
            let dst_max = (SCRATCH_SAMPLES / ch).min((dst.len() - written) / fb);
            let (out, consumed) = state.rate.resample(
                &mut scratch[..dst_max * ch],
                &self.samples[off * ch..(off + src_frames) * ch],
            );
            peeked += consumed;
            remaining -= consumed;
            off = (off + consumed) % self.capacity;

            (state.encode)(
                &mut dst[written..written + out * fb],
                &scratch[..out * ch],
                out,
                &state.routing,
            );
            written += out * fb;
        }
        (peeked, written)
    }

    /// Decode `src` into the buffer starting `offset` frames past the write
    /// position, overwriting what is there. Writes at most `max_frames` frames.
    ///
    /// Nothing becomes readable until [`MixBuffer::commit`].
    pub fn write(
        &mut self,
        state: &mut WriteState,
        src: &[u8],
        offset: usize,
        max_frames: usize,
    ) -> Result<usize, MixBufError> {
        let off = self.check_write(state, src, offset, max_frames)?;
        if state.rate.is_passthrough() {
            let frames = max_frames.min(src.len() / state.src_frame_bytes);
            self.transfer_direct(state.decode, state, src, off, frames);
            Ok(frames)
        } else {
            Ok(self.write_resampling(state, src, off, max_frames))
        }
    }

    /// Like [`MixBuffer::write`], but merges into the staged audio with the blend rule.
    pub fn blend(
        &mut self,
        state: &mut WriteState,
        src: &[u8],
        offset: usize,
        max_frames: usize,
    ) -> Result<usize, MixBufError> {
        let off = self.check_write(state, src, offset, max_frames)?;
        if state.rate.is_passthrough() {
            let frames = max_frames.min(src.len() / state.src_frame_bytes);
            self.transfer_direct(state.decode_blend, state, src, off, frames);
            Ok(frames)
        } else {
            Ok(self.blend_resampling(state, src, off, max_frames))
        }
    }

    /// Zero `frames` frames starting `offset` frames past the write position
    /// and reset the writer's resampler.
    pub fn silence(&mut self, state: &mut WriteState, offset: usize, frames: usize) -> Result<(), MixBufError> {
        self.check_channels(state)?;
        self.check_window(offset, frames)?;

        let ch = self.channels;
        let off = (self.off_write + offset) % self.capacity;
        let first = frames.min(self.capacity - off);
        self.samples[off * ch..(off + first) * ch].fill(0);
        if frames > first {
            self.samples[..(frames - first) * ch].fill(0);
        }
        state.rate.reset();
        Ok(())
    }

    /// Record that the writer skipped `frames` frames of silence without
    /// touching the buffer. Only the writer's resampler is reset.
    pub fn blend_gap(&self, state: &mut WriteState, frames: usize) {
        trace!(name = %self.name, frames, "blend gap");
        state.rate.reset();
    }

    /// Consume `frames` frames after peeking. Clamped to what is readable.
    pub fn advance(&mut self, frames: usize) -> usize {
        let frames = if frames > self.used {
            warn!(name = %self.name, frames, used = self.used, "advance clamped");
            self.used
        } else {
            frames
        };
        self.used -= frames;
        self.off_read = (self.off_read + frames) % self.capacity;
        trace!(name = %self.name, frames, off_read = self.off_read, used = self.used, "advanced");
        frames
    }

    /// Apply volume to `frames` staged frames at the write position and make
    /// them readable. Clamped to the free space.
    pub fn commit(&mut self, frames: usize) -> usize {
        let free = self.free();
        let frames = if frames > free {
            warn!(name = %self.name, frames, free, "commit clamped");
            free
        } else {
            frames
        };

        let ch = self.channels;
        let off = self.off_write;
        let first = frames.min(self.capacity - off);
        self.volume.apply(&mut self.samples[off * ch..(off + first) * ch], ch);
        if frames > first {
            self.volume.apply(&mut self.samples[..(frames - first) * ch], ch);
        }

        self.used += frames;
        self.off_write = (self.off_write + frames) % self.capacity;
        trace!(name = %self.name, frames, off_write = self.off_write, used = self.used, "committed");
        frames
    }

    fn check_channels(&self, state: &WriteState) -> Result<(), MixBufError> {
        if state.routing.dst_channels != self.channels {
            return Err(MixBufError::ChannelMismatch {
                state: state.routing.dst_channels,
                buffer: self.channels,
            });
        }
        Ok(())
    }

    fn check_window(&self, offset: usize, frames: usize) -> Result<(), MixBufError> {
        let free = self.free();
        if offset.checked_add(frames).map_or(true, |end| end > free) {
            return Err(MixBufError::WindowOutOfRange {
                offset,
                frames,
                available: free,
            });
        }
        Ok(())
    }

    /// Validate a write or blend and return the absolute start frame.
    fn check_write(
        &self,
        state: &WriteState,
        src: &[u8],
        offset: usize,
        max_frames: usize,
    ) -> Result<usize, MixBufError> {
        self.check_channels(state)?;
        if src.len() % state.src_frame_bytes != 0 {
            return Err(MixBufError::PartialFrame {
                bytes: src.len(),
                frame_bytes: state.src_frame_bytes,
            });
        }
        self.check_window(offset, max_frames)?;
        Ok((self.off_write + offset) % self.capacity)
    }

    /// Decode `frames` frames straight into the ring, splitting at the physical end.
    fn transfer_direct(&mut self, decode: DecodeFn, state: &WriteState, src: &[u8], off: usize, frames: usize) {
        let ch = self.channels;
        let fb = state.src_frame_bytes;
        let first = frames.min(self.capacity - off);
        decode(
            &mut self.samples[off * ch..(off + first) * ch],
            &src[..first * fb],
            first,
            &state.routing,
        );
        if frames > first {
            let rest = frames - first;
            decode(
                &mut self.samples[..rest * ch],
                &src[first * fb..frames * fb],
                rest,
                &state.routing,
            );
        }
    }

    fn write_resampling(&mut self, state: &mut WriteState, mut src: &[u8], mut off: usize, mut budget: usize) -> usize {
        let ch = self.channels;
        let fb = state.src_frame_bytes;
        let mut decoded = [0i32; SCRATCH_SAMPLES];
        let mut written = 0;

        while budget > 0 && src.len() >= fb {
            let frames = (SCRATCH_SAMPLES / ch).min(src.len() / fb);
            (state.decode)(&mut decoded[..frames * ch], &src[..frames * fb], frames, &state.routing);
            src = &src[frames * fb..];

            // Resample straight into the ring, one contiguous stretch at a time.
            let mut idx = 0;
            while idx < frames && budget > 0 {
                let now = (self.capacity - off).min(budget);
                let (out, consumed) = state.rate.resample(
                    &mut self.samples[off * ch..(off + now) * ch],
                    &decoded[idx * ch..frames * ch],
                );
                idx += consumed;
                written += out;
                budget -= out;
                off = (off + out) % self.capacity;
            }
        }
        written
    }

    fn blend_resampling(&mut self, state: &mut WriteState, mut src: &[u8], mut off: usize, mut budget: usize) -> usize {
        let ch = self.channels;
        let fb = state.src_frame_bytes;
        let mut decoded = [0i32; SCRATCH_SAMPLES];
        let mut rated = [0i32; SCRATCH_SAMPLES];
        let mut blended = 0;

        while budget > 0 && src.len() >= fb {
            let frames = (SCRATCH_SAMPLES / ch).min(src.len() / fb);
            (state.decode)(&mut decoded[..frames * ch], &src[..frames * fb], frames, &state.routing);
            src = &src[frames * fb..];

            let mut idx = 0;
            while idx < frames && budget > 0 {
                let now = (SCRATCH_SAMPLES / ch).min(budget);
                let (out, consumed) = state
                    .rate
                    .resample(&mut rated[..now * ch], &decoded[idx * ch..frames * ch]);

                let first = out.min(self.capacity - off);
                blend_buffer(&mut self.samples[off * ch..(off + first) * ch], &rated[..first * ch]);
                if out > first {
                    blend_buffer(&mut self.samples[..(out - first) * ch], &rated[first * ch..out * ch]);
                }

                idx += consumed;
                blended += out;
                budget -= out;
                off = (off + out) % self.capacity;
            }
        }
        blended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx_pcm::ChannelId;

    fn s16_stereo(rate: u32) -> PcmProps {
        PcmProps::new(2, true, 2, rate).unwrap()
    }

    fn s16_bytes(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn assert_ring_invariant(buf: &MixBuffer) {
        assert!(buf.used() <= buf.size());
        assert_eq!(buf.write_pos(), (buf.read_pos() + buf.used()) % buf.size());
    }

    #[test]
    fn new_buffer_is_empty() {
        let buf = MixBuffer::new("test", &s16_stereo(44100), 64).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.size(), 64);
        assert_eq!(buf.size_bytes(), 256);
        assert_eq!(buf.free(), 64);
        assert_eq!(buf.free_bytes(), 256);
        assert_eq!(buf.used_bytes(), 0);
        assert_eq!(buf.name(), "test");
        assert!(buf.volume().is_all_max());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            MixBuffer::new("x", &s16_stereo(44100), 0).unwrap_err(),
            MixBufError::ZeroCapacity
        );
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "a-very-long-mixing-buffer-name-that-keeps-going";
        let buf = MixBuffer::new(name, &s16_stereo(44100), 4).unwrap();
        assert_eq!(buf.name(), &name[..32]);
    }

    #[test]
    fn identity_roundtrip_reproduces_bytes() {
        let props = s16_stereo(48000);
        let mut buf = MixBuffer::new("rt", &props, 16).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();

        let src = s16_bytes(&[1, -1, 300, -300, i16::MAX, i16::MIN, 0, 42]);
        assert_eq!(buf.write(&mut ws, &src, 0, buf.free()).unwrap(), 4);
        assert_eq!(buf.commit(4), 4);

        let mut out = vec![0u8; src.len()];
        assert_eq!(buf.peek(0, 4, &mut ps, &mut out).unwrap(), (4, 16));
        assert_eq!(out, src);
    }

    #[test]
    fn peek_does_not_move_read_position() {
        let props = s16_stereo(48000);
        let mut buf = MixBuffer::new("peek", &props, 8).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();
        buf.write(&mut ws, &s16_bytes(&[1, 2, 3, 4, 5, 6]), 0, 8).unwrap();
        buf.commit(3);

        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        buf.peek(1, 2, &mut ps, &mut a).unwrap();
        buf.peek(1, 2, &mut ps, &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_vec(), s16_bytes(&[3, 4, 5, 6]));
        assert_eq!(buf.read_pos(), 0);
        assert_eq!(buf.used(), 3);
    }

    #[test]
    fn staged_frames_are_not_readable_until_commit() {
        let props = s16_stereo(48000);
        let mut buf = MixBuffer::new("stage", &props, 8).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();
        buf.write(&mut ws, &s16_bytes(&[1, 2]), 0, 8).unwrap();
        assert!(buf.is_empty());

        let mut out = [0u8; 4];
        assert!(matches!(
            buf.peek(0, 1, &mut ps, &mut out),
            Err(MixBufError::WindowOutOfRange { available: 0, .. })
        ));
    }

    #[test]
    fn wrap_around_write_splits_at_the_end() {
        let props = PcmProps::new(4, true, 1, 48000).unwrap();
        let mut buf = MixBuffer::new("wrap", &props, 10).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();

        // Move both positions to frame 8.
        buf.silence(&mut ws, 0, 8).unwrap();
        buf.commit(8);
        buf.advance(8);
        assert_eq!((buf.write_pos(), buf.used()), (8, 0));

        let src: Vec<u8> = [10i32, 20, 30, 40].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(buf.write(&mut ws, &src, 0, buf.free()).unwrap(), 4);
        assert_eq!(buf.commit(4), 4);

        assert_eq!(buf.write_pos(), 2);
        assert_eq!(buf.used(), 4);
        assert_eq!(buf.frames_at(8, 2), &[10, 20]);
        assert_eq!(buf.frames_at(0, 2), &[30, 40]);
        assert_ring_invariant(&buf);

        let mut ps = PeekState::new(&buf, &props).unwrap();
        let mut out = vec![0u8; 16];
        assert_eq!(buf.peek(0, 4, &mut ps, &mut out).unwrap(), (4, 16));
        assert_eq!(out, src);
    }

    #[test]
    fn ring_invariant_holds_through_a_session() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("session", &props, 7).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();
        let src = s16_bytes(&[7; 10]);
        let mut out = [0u8; 64];

        for round in 0..20 {
            let n = buf.write(&mut ws, &src, 0, buf.free().min(5)).unwrap();
            buf.commit(n);
            assert_ring_invariant(&buf);

            let take = (round % 4).min(buf.used());
            if take > 0 {
                let (consumed, _) = buf.peek(0, take, &mut ps, &mut out).unwrap();
                buf.advance(consumed);
            }
            assert_ring_invariant(&buf);
        }
    }

    #[test]
    fn advance_and_commit_clamp() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("clamp", &props, 4).unwrap();
        assert_eq!(buf.commit(9), 4);
        assert_eq!(buf.used(), 4);
        assert_eq!(buf.commit(1), 0);
        assert_eq!(buf.advance(6), 4);
        assert!(buf.is_empty());
        assert_ring_invariant(&buf);
    }

    #[test]
    fn drop_all_forgets_everything() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("drop", &props, 4).unwrap();
        buf.commit(3);
        buf.advance(1);
        buf.drop_all();
        assert_eq!((buf.read_pos(), buf.write_pos(), buf.used()), (0, 0, 0));
    }

    #[test]
    fn write_window_is_bounded_by_free_space() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("bound", &props, 4).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        buf.commit(3);
        assert_eq!(
            buf.write(&mut ws, &s16_bytes(&[1, 1, 2, 2]), 0, 2).unwrap_err(),
            MixBufError::WindowOutOfRange {
                offset: 0,
                frames: 2,
                available: 1
            }
        );
        assert!(buf.silence(&mut ws, 1, 1).is_err());
    }

    #[test]
    fn huge_windows_are_rejected_not_wrapped() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("huge", &props, 4).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();
        buf.commit(2);

        let src = s16_bytes(&[1, 1]);
        assert!(matches!(
            buf.write(&mut ws, &src, usize::MAX, 2),
            Err(MixBufError::WindowOutOfRange { .. })
        ));
        assert!(matches!(
            buf.blend(&mut ws, &src, 1, usize::MAX),
            Err(MixBufError::WindowOutOfRange { .. })
        ));
        assert!(matches!(
            buf.silence(&mut ws, usize::MAX, usize::MAX),
            Err(MixBufError::WindowOutOfRange { .. })
        ));
        let mut out = [0u8; 16];
        assert!(matches!(
            buf.peek(usize::MAX, 1, &mut ps, &mut out),
            Err(MixBufError::WindowOutOfRange { .. })
        ));
        assert_eq!(buf.used(), 2);
    }

    #[test]
    fn partial_source_frames_are_rejected() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("partial", &props, 4).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        assert_eq!(
            buf.write(&mut ws, &[0u8; 6], 0, 4).unwrap_err(),
            MixBufError::PartialFrame {
                bytes: 6,
                frame_bytes: 4
            }
        );
    }

    #[test]
    fn tiny_destination_is_rejected() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("tiny", &props, 4).unwrap();
        let mut ps = PeekState::new(&buf, &props).unwrap();
        buf.commit(2);
        let mut out = [0u8; 3];
        assert_eq!(
            buf.peek(0, 1, &mut ps, &mut out).unwrap_err(),
            MixBufError::DestinationTooSmall {
                bytes: 3,
                frame_bytes: 4
            }
        );
    }

    #[test]
    fn states_bound_to_other_buffers_are_rejected() {
        let stereo = s16_stereo(44100);
        let mono = PcmProps::new(2, true, 1, 44100).unwrap();
        let mono_buf = MixBuffer::new("mono", &mono, 4).unwrap();
        let mut stereo_buf = MixBuffer::new("stereo", &stereo, 4).unwrap();

        let mut ws = WriteState::new(&mono_buf, &stereo).unwrap();
        let mut ps = PeekState::new(&mono_buf, &stereo).unwrap();
        assert_eq!(
            stereo_buf.write(&mut ws, &[0u8; 4], 0, 1).unwrap_err(),
            MixBufError::ChannelMismatch { state: 1, buffer: 2 }
        );
        stereo_buf.commit(1);
        let mut out = [0u8; 4];
        assert!(matches!(
            stereo_buf.peek(0, 1, &mut ps, &mut out),
            Err(MixBufError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn mute_zeroes_committed_frames() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("mute", &props, 8).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        buf.set_volume(&Volume::MUTED);
        buf.write(&mut ws, &s16_bytes(&[1000, -1000, 2000, -2000]), 0, 8).unwrap();
        buf.commit(2);
        assert_eq!(buf.frames_at(0, 2), &[0, 0, 0, 0]);
    }

    #[test]
    fn volume_applies_at_commit_only() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("vol", &props, 8).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let src = s16_bytes(&[0x100, 0x100]);

        buf.write(&mut ws, &src, 0, 8).unwrap();
        buf.commit(1);
        buf.set_volume(&Volume::uniform(239));
        buf.write(&mut ws, &src, 0, 8).unwrap();
        buf.commit(1);

        assert_eq!(buf.frames_at(0, 1), &[0x0100_0000, 0x0100_0000]);
        assert_eq!(buf.frames_at(1, 1), &[0x0080_0000, 0x0080_0000]);
    }

    #[test]
    fn blend_averages_with_staged_audio() {
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("blend", &props, 8).unwrap();
        let mut first = WriteState::new(&buf, &props).unwrap();
        let mut second = WriteState::new(&buf, &props).unwrap();

        buf.write(&mut first, &s16_bytes(&[0x1000, 0, 0x1000, 0x2000]), 0, 8).unwrap();
        assert_eq!(buf.blend(&mut second, &s16_bytes(&[0x3000, 0x0400, 0, 0x4000]), 0, 8).unwrap(), 2);
        buf.commit(2);
        assert_eq!(
            buf.frames_at(0, 2),
            &[0x2000_0000, 0x0400_0000, 0x1000_0000, 0x3000_0000]
        );
    }

    #[test]
    fn silence_resets_the_writer_resampler() {
        let src_props = s16_stereo(22050);
        let props = s16_stereo(44100);
        let mut buf = MixBuffer::new("gap", &props, 64).unwrap();
        let mut ws = WriteState::new(&buf, &src_props).unwrap();

        buf.write(&mut ws, &s16_bytes(&[100; 16]), 0, 4).unwrap();
        assert_ne!(ws.rate().dst_offset(), 0);
        buf.silence(&mut ws, 4, 4).unwrap();
        assert_eq!(ws.rate().dst_offset(), 0);
        assert!(ws.rate().last_frame().iter().all(|&s| s == 0));
        assert!(buf.frames_at(4, 4).iter().all(|&s| s == 0));

        buf.write(&mut ws, &s16_bytes(&[100; 16]), 8, 4).unwrap();
        assert_ne!(ws.rate().dst_offset(), 0);
        buf.blend_gap(&mut ws, 4);
        assert_eq!(ws.rate().dst_offset(), 0);
    }

    #[test]
    fn upsampling_write_honours_frame_budget() {
        let src_props = PcmProps::new(2, true, 1, 22050).unwrap();
        let props = PcmProps::new(2, true, 1, 44100).unwrap();
        let mut buf = MixBuffer::new("up", &props, 32).unwrap();
        let mut ws = WriteState::new(&buf, &src_props).unwrap();

        let src = s16_bytes(&[0x100, 0x300, 0x500, 0x700, 0x900, 0xB00]);
        let written = buf.write(&mut ws, &src, 0, 4).unwrap();
        assert_eq!(written, 4);
        assert_eq!(
            buf.frames_at(0, 4),
            &[0x0100_0000, 0x0200_0000, 0x0300_0000, 0x0400_0000]
        );
    }

    #[test]
    fn resampling_write_wraps_around() {
        let src_props = PcmProps::new(4, true, 1, 22050).unwrap();
        let props = PcmProps::new(4, true, 1, 44100).unwrap();
        let mut buf = MixBuffer::new("upwrap", &props, 6).unwrap();
        let mut ws = WriteState::new(&buf, &src_props).unwrap();
        buf.commit(4);
        buf.advance(4);

        let src: Vec<u8> = [10i32, 30, 50, 70, 90].iter().flat_map(|v| v.to_le_bytes()).collect();
        let written = buf.write(&mut ws, &src, 0, 6).unwrap();
        assert_eq!(written, 6);
        assert_eq!(buf.frames_at(4, 2), &[10, 20]);
        assert_eq!(buf.frames_at(0, 4), &[30, 40, 50, 60]);
    }

    fn s32_mono(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Capacity 6 with the write position at frame 4, so six frames wrap.
    fn wrapped_s32_mono(rate: u32) -> MixBuffer {
        let props = PcmProps::new(4, true, 1, rate).unwrap();
        let mut buf = MixBuffer::new("blendwrap", &props, 6).unwrap();
        buf.commit(4);
        buf.advance(4);
        buf
    }

    #[test]
    fn resampling_blend_into_empty_frames_matches_write() {
        let src_props = PcmProps::new(4, true, 1, 22050).unwrap();
        let src = s32_mono(&[10, 30, 50, 70, 90]);

        let mut written = wrapped_s32_mono(44100);
        let mut ws = WriteState::new(&written, &src_props).unwrap();
        assert_eq!(written.write(&mut ws, &src, 0, 6).unwrap(), 6);

        let mut blended = wrapped_s32_mono(44100);
        let mut bs = WriteState::new(&blended, &src_props).unwrap();
        assert_eq!(blended.blend(&mut bs, &src, 0, 6).unwrap(), 6);

        assert_eq!(blended.frames_at(0, 6), written.frames_at(0, 6));
        assert_eq!(blended.frames_at(4, 2), &[10, 20]);
        assert_eq!(blended.frames_at(0, 4), &[30, 40, 50, 60]);
    }

    #[test]
    fn resampling_blend_averages_across_the_wrap() {
        let props = PcmProps::new(4, true, 1, 44100).unwrap();
        let src_props = PcmProps::new(4, true, 1, 22050).unwrap();
        let mut buf = wrapped_s32_mono(44100);
        let mut base = WriteState::new(&buf, &props).unwrap();
        let mut over = WriteState::new(&buf, &src_props).unwrap();

        buf.write(&mut base, &s32_mono(&[110, 120, 130, 140, 150, 160]), 0, 6).unwrap();
        let blended = buf.blend(&mut over, &s32_mono(&[10, 30, 50, 70, 90]), 0, 6).unwrap();
        assert_eq!(blended, 6);
        assert_eq!(buf.frames_at(4, 2), &[60, 70]);
        assert_eq!(buf.frames_at(0, 4), &[80, 90, 100, 110]);
    }

    #[test]
    fn resampling_blend_honours_frame_budget() {
        let src_props = PcmProps::new(4, true, 1, 22050).unwrap();
        let mut buf = wrapped_s32_mono(44100);
        let mut bs = WriteState::new(&buf, &src_props).unwrap();

        let blended = buf.blend(&mut bs, &s32_mono(&[10, 30, 50, 70, 90]), 0, 3).unwrap();
        assert_eq!(blended, 3);
        assert_eq!(buf.frames_at(4, 2), &[10, 20]);
        assert_eq!(buf.frames_at(0, 4), &[30, 0, 0, 0]);
    }

    #[test]
    fn downsampling_peek_reports_source_consumption() {
        let props = PcmProps::new(4, true, 1, 44100).unwrap();
        let out_props = PcmProps::new(4, true, 1, 22050).unwrap();
        let mut buf = MixBuffer::new("down", &props, 16).unwrap();
        let mut ws = WriteState::new(&buf, &props).unwrap();
        let mut ps = PeekState::new(&buf, &out_props).unwrap();

        let src: Vec<u8> = (1..=6i32).flat_map(|v| v.to_le_bytes()).collect();
        buf.write(&mut ws, &src, 0, 16).unwrap();
        buf.commit(6);

        let mut out = [0u8; 32];
        let (consumed, bytes) = buf.peek(0, 6, &mut ps, &mut out).unwrap();
        assert_eq!((consumed, bytes), (6, 8));
        assert_eq!(&out[..8], &[1, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(buf.used(), 6);
    }

    #[test]
    fn upmix_routes_by_channel_id() {
        // Stereo source into a quad buffer: rear channels are silent.
        let stereo = s16_stereo(44100);
        let quad = PcmProps::new(2, true, 4, 44100).unwrap();
        let mut buf = MixBuffer::new("quad", &quad, 4).unwrap();
        let mut ws = WriteState::new(&buf, &stereo).unwrap();
        assert_eq!(
            ws.channel_map(),
            &[
                ChannelSource::Channel(0),
                ChannelSource::Channel(1),
                ChannelSource::Silence,
                ChannelSource::Silence
            ]
        );
        buf.write(&mut ws, &s16_bytes(&[1, 2]), 0, 4).unwrap();
        buf.commit(1);
        assert_eq!(buf.frames_at(0, 1), &[1 << 16, 2 << 16, 0, 0]);
    }

    #[test]
    fn unsigned_output_gets_mid_scale_silence() {
        let mono = PcmProps::new(2, true, 1, 44100).unwrap();
        let out = PcmProps::new(1, false, 2, 44100)
            .unwrap()
            .with_channel_ids(&[ChannelId::FrontCenter, ChannelId::UnusedSilence])
            .unwrap();
        let mut buf = MixBuffer::new("u8", &mono, 4).unwrap();
        let mut ws = WriteState::new(&buf, &mono).unwrap();
        let mut ps = PeekState::new(&buf, &out).unwrap();
        assert_eq!(ps.channel_map().len(), 2);

        buf.write(&mut ws, &s16_bytes(&[0x4000]), 0, 4).unwrap();
        buf.commit(1);
        let mut bytes = [0u8; 2];
        buf.peek(0, 1, &mut ps, &mut bytes).unwrap();
        // 1 -> 2 channels always replicates.
        assert_eq!(bytes, [0xC0, 0xC0]);
    }
}
