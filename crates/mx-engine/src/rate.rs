//! Fixed-point linear interpolation sample rate conversion.
//!
//! Positions are 32.32 fixed point: the high word is a source frame index,
//! the low word the interpolation fraction. The state is restartable: when
//! the source runs dry mid-conversion the caller feeds more later and the
//! cached last frame keeps interpolation continuous across calls.

use mx_pcm::MAX_CHANNELS;
use tracing::debug;

use crate::MixBufError;

/// Resampler for one channel count: returns `(dst_frames, src_frames_consumed)`.
type ResampleFn = fn(dst: &mut [i32], src: &[i32], rate: &mut RateState) -> (usize, usize);

const RESAMPLERS: [ResampleFn; MAX_CHANNELS] = [
    resample_frames::<1>,
    resample_frames::<2>,
    resample_frames::<3>,
    resample_frames::<4>,
    resample_frames::<5>,
    resample_frames::<6>,
    resample_frames::<7>,
    resample_frames::<8>,
    resample_frames::<9>,
    resample_frames::<10>,
    resample_frames::<11>,
    resample_frames::<12>,
];

/// Rate conversion state for one stream.
#[derive(Clone, Debug)]
pub struct RateState {
    /// Source frames consumed since the last reset.
    off_src: u32,
    /// Destination position in 32.32 fixed point.
    off_dst: u64,
    /// `(src_hz << 32) / dst_hz`.
    dst_inc: u64,
    passthrough: bool,
    channels: usize,
    /// Last source frame consumed, for interpolating across calls.
    last_frame: [i32; MAX_CHANNELS],
    resample_fn: Option<ResampleFn>,
}

impl RateState {
    /// Set up conversion from `src_hz` to `dst_hz` for `channels`-channel frames.
    pub fn new(src_hz: u32, dst_hz: u32, channels: usize) -> Result<Self, MixBufError> {
        let mut rate = RateState {
            off_src: 0,
            off_dst: 0,
            dst_inc: 1 << 32,
            passthrough: true,
            channels: channels.min(MAX_CHANNELS),
            last_frame: [0; MAX_CHANNELS],
            resample_fn: None,
        };
        rate.reset_always();

        if src_hz == dst_hz {
            return Ok(rate);
        }
        if src_hz == 0 {
            return Err(MixBufError::ZeroSourceRate { dst_hz });
        }
        if dst_hz == 0 {
            return Err(MixBufError::ZeroDestRate { src_hz });
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(MixBufError::ResampleChannels(channels));
        }

        rate.passthrough = false;
        rate.dst_inc = ((src_hz as u64) << 32) / dst_hz as u64;
        rate.resample_fn = Some(RESAMPLERS[channels - 1]);
        debug!(src_hz, dst_hz, channels, dst_inc = rate.dst_inc, "resampler initialised");
        Ok(rate)
    }

    /// True when both rates match and resampling is a plain copy.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Destination step in 32.32 fixed point.
    pub fn dst_inc(&self) -> u64 {
        self.dst_inc
    }

    pub fn src_offset(&self) -> u32 {
        self.off_src
    }

    pub fn dst_offset(&self) -> u64 {
        self.off_dst
    }

    pub fn last_frame(&self) -> &[i32] {
        &self.last_frame[..self.channels]
    }

    /// Reset after a gap. Does nothing if no output has been produced since the last reset.
    pub fn reset(&mut self) {
        if self.off_dst != 0 {
            self.reset_always();
        }
    }

    pub fn reset_always(&mut self) {
        self.off_dst = 0;
        self.off_src = 0;
        self.last_frame = [0; MAX_CHANNELS];
    }

    /// Convert interleaved wide frames from `src` into `dst`.
    ///
    /// Stops when either side runs out and returns
    /// `(dst_frames_written, src_frames_consumed)`.
    pub fn resample(&mut self, dst: &mut [i32], src: &[i32]) -> (usize, usize) {
        match self.resample_fn {
            Some(resample) => resample(dst, src, self),
            None => {
                let channels = self.channels.max(1);
                let frames = (dst.len() / channels).min(src.len() / channels);
                let samples = frames * channels;
                dst[..samples].copy_from_slice(&src[..samples]);
                (frames, frames)
            }
        }
    }
}

fn resample_frames<const C: usize>(dst: &mut [i32], src: &[i32], rate: &mut RateState) -> (usize, usize) {
    let mut dst_left = dst.len() / C;
    let mut src_left = src.len() / C;
    let mut last = [0i32; C];
    last.copy_from_slice(&rate.last_frame[..C]);

    let mut src_idx = 0;
    let mut dst_idx = 0;
    while dst_left > 0 && src_left > 0 {
        let needed = ((rate.off_dst >> 32) as u32)
            .wrapping_sub(rate.off_src)
            .wrapping_add(1) as i32;
        if needed > 0 {
            let needed = needed as usize;
            if needed + 1 < src_left {
                rate.off_src = rate.off_src.wrapping_add(needed as u32);
                src_left -= needed;
                src_idx += needed;
                last.copy_from_slice(&src[(src_idx - 1) * C..src_idx * C]);
            } else {
                // Source exhausted: swallow the rest and remember the final frame.
                src_idx += src_left;
                rate.off_src = rate.off_src.wrapping_add(src_left as u32);
                rate.last_frame[..C].copy_from_slice(&src[(src_idx - 1) * C..src_idx * C]);
                return (dst_idx, src_idx);
            }
        }

        let cur = (rate.off_dst & 0xFFFF_FFFF) as i64;
        let prev = (1i64 << 32) - cur;
        let frame = &src[src_idx * C..(src_idx + 1) * C];
        let out = &mut dst[dst_idx * C..(dst_idx + 1) * C];
        for ((o, &l), &s) in out.iter_mut().zip(&last).zip(frame) {
            *o = ((l as i64 * prev + s as i64 * cur) >> 32) as i32;
        }

        rate.off_dst = rate.off_dst.wrapping_add(rate.dst_inc);
        dst_idx += 1;
        dst_left -= 1;
    }

    rate.last_frame[..C].copy_from_slice(&last);
    (dst_idx, src_idx)
}
