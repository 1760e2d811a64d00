//! Period-by-period mixing of several clips into one output stream.
//!
//! Each source owns a buffer in its own format and rate. Every period the
//! source buffers are topped up from their clips, peeked into the mix
//! format (channel routing and resampling happen here) and written or
//! blended into the mix buffer, which is then committed and drained.

use mx_engine::{realtime, MixBuffer, MixBufError, PeekState, WriteState};
use mx_formats::PcmClip;
use mx_pcm::{PcmProps, Volume};
use tracing::{debug, info};

use crate::MasterError;

struct Source {
    clip: PcmClip,
    /// Bytes of `clip.data` already moved into `buf`.
    pos: usize,
    buf: MixBuffer,
    /// Clip bytes into `buf`.
    fill: WriteState,
    /// `buf` out to the mix format.
    peek: PeekState,
    /// Mix-format frames into the mix buffer.
    mix_in: WriteState,
    /// One period of mix-format frames.
    staged: Vec<u8>,
    produced: usize,
}

impl Source {
    fn is_exhausted(&self) -> bool {
        self.clip.data.len() - self.pos < self.clip.props.frame_bytes() && self.buf.is_empty()
    }

    /// Top up the source buffer and convert up to `frames` mix frames into `staged`.
    fn pull(&mut self, frames: usize) -> Result<usize, MixBufError> {
        let fb = self.clip.props.frame_bytes();
        let free = self.buf.free();
        let rest = &self.clip.data[self.pos..];
        let take = (free * fb).min(rest.len() / fb * fb);
        if take > 0 {
            let written = self.buf.write(&mut self.fill, &rest[..take], 0, free)?;
            self.buf.commit(written);
            self.pos += written * fb;
        }

        if self.buf.is_empty() {
            return Ok(0);
        }
        let staged_fb = self.peek.frame_bytes();
        let used = self.buf.used();
        let (consumed, bytes) = self
            .buf
            .peek(0, used, &mut self.peek, &mut self.staged[..frames * staged_fb])?;
        self.buf.advance(consumed);
        Ok(bytes / staged_fb)
    }
}

/// Offline mixer producing PCM in one output format.
pub struct Mixdown {
    out: PcmProps,
    /// Mix layout and rate in the raw container format.
    staging: PcmProps,
    mix: MixBuffer,
    drain: PeekState,
    period: usize,
    buffer_ms: u32,
    sources: Vec<Source>,
    period_out: Vec<u8>,
}

impl Mixdown {
    /// Create a mixer that mixes at `out`'s rate and layout, `buffer_ms`
    /// milliseconds per period.
    pub fn new(out: &PcmProps, buffer_ms: u32) -> Result<Self, MasterError> {
        let period = out.ms_to_frames(buffer_ms);
        let staging = PcmProps::raw(out.channels(), out.rate())?.with_channel_ids(out.channel_ids())?;
        let mix = MixBuffer::new("mixdown", out, period)?;
        let drain = PeekState::new(&mix, out)?;
        debug!(%out, buffer_ms, period, "mixdown created");

        Ok(Mixdown {
            out: out.clone(),
            staging,
            mix,
            drain,
            period,
            buffer_ms,
            sources: Vec::new(),
            period_out: vec![0; out.frames_to_bytes(period)],
        })
    }

    /// Add a clip to the mix. The first source added is the base layer;
    /// later ones are blended over it.
    pub fn add_source(&mut self, clip: PcmClip, volume: &Volume) -> Result<(), MasterError> {
        let props = clip.props.clone();
        // Enough source frames to fill a whole period twice over at any ratio.
        let needed = (self.period as u64 * props.rate() as u64).div_ceil(self.out.rate() as u64) as usize;
        let mut buf = MixBuffer::new("source", &props, needed * 2 + 16)?;
        buf.set_volume(volume);

        let fill = WriteState::new(&buf, &props)?;
        let peek = PeekState::new(&buf, &self.staging)?;
        let mix_in = WriteState::new(&self.mix, &self.staging)?;
        debug!(
            index = self.sources.len(),
            src = %props,
            frames = clip.frames(),
            resampling = !peek.rate().is_passthrough(),
            "source added"
        );

        self.sources.push(Source {
            clip,
            pos: 0,
            buf,
            fill,
            peek,
            mix_in,
            staged: vec![0; self.staging.frames_to_bytes(self.period)],
            produced: 0,
        });
        Ok(())
    }

    /// Master volume, applied when each period is committed.
    pub fn set_volume(&mut self, volume: &Volume) {
        self.mix.set_volume(volume);
    }

    pub fn out_props(&self) -> &PcmProps {
        &self.out
    }

    /// Frames mixed per period.
    pub fn period_frames(&self) -> usize {
        self.period
    }

    pub fn buffer_ms(&self) -> u32 {
        self.buffer_ms
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// True once every source has been fully mixed.
    pub fn is_finished(&self) -> bool {
        self.sources.iter().all(Source::is_exhausted)
    }

    /// Mix one period and append it to `out` in the output format.
    ///
    /// Returns the number of frames appended; zero once every source has
    /// run dry.
    pub fn pump(&mut self, out: &mut Vec<u8>) -> Result<usize, MasterError> {
        let frames = realtime(|| self.mix_period())?;
        if frames == 0 {
            return Ok(0);
        }
        let bytes = realtime(|| self.drain_period())?;
        out.extend_from_slice(&self.period_out[..bytes]);
        Ok(frames)
    }

    /// Mix every source to completion.
    pub fn render(mut self) -> Result<PcmClip, MasterError> {
        if self.sources.is_empty() {
            return Err(MasterError::NoSources);
        }
        let longest = self.sources.iter().map(|s| s.clip.duration_ms()).max().unwrap_or(0);
        let mut data = Vec::with_capacity(self.out.frames_to_bytes(self.out.ms_to_frames(longest as u32 + 1)));

        let mut periods = 0usize;
        while self.pump(&mut data)? > 0 {
            periods += 1;
        }
        let clip = PcmClip::new(self.out, data);
        info!(frames = clip.frames(), periods, sources = self.sources.len(), "mixdown finished");
        Ok(clip)
    }

    /// Stage every source into the mix buffer and commit one period.
    fn mix_period(&mut self) -> Result<usize, MixBufError> {
        let mut frames = 0;
        for src in &mut self.sources {
            src.produced = src.pull(self.period)?;
            frames = frames.max(src.produced);
        }
        if frames == 0 {
            return Ok(0);
        }

        let mix = &mut self.mix;
        let staging = &self.staging;
        for (idx, src) in self.sources.iter_mut().enumerate() {
            let data = &src.staged[..staging.frames_to_bytes(src.produced)];
            if idx == 0 {
                // The base layer overwrites whatever the last period left behind.
                let written = mix.write(&mut src.mix_in, data, 0, src.produced)?;
                if written < frames {
                    mix.silence(&mut src.mix_in, written, frames - written)?;
                }
            } else {
                let blended = if staging.is_buffer_silence(data) {
                    0
                } else {
                    mix.blend(&mut src.mix_in, data, 0, src.produced)?
                };
                if blended < frames {
                    mix.blend_gap(&mut src.mix_in, frames - blended);
                }
            }
        }
        Ok(mix.commit(frames))
    }

    /// Convert everything committed into `period_out`. Returns bytes written.
    fn drain_period(&mut self) -> Result<usize, MixBufError> {
        let used = self.mix.used();
        let (consumed, bytes) = self.mix.peek(0, used, &mut self.drain, &mut self.period_out)?;
        self.mix.advance(consumed);
        Ok(bytes)
    }
}
