//! Frame transcoders: interleaved native frames to and from wide frames.
//!
//! A transcoder is picked once per peek/write state from the sample format
//! and the channel routing. The mono/stereo shapes get dedicated loops;
//! everything else goes through the map-driven generic path.

use mx_pcm::SampleFormat;

use crate::blend::{blend, blend_into};
use crate::channel_map::{is_identity, ChannelMap, ChannelSource};
use crate::codec::{RawSample, Sample};

/// Channel routing shared by every transcoder call of one state.
#[derive(Clone, Debug)]
pub(crate) struct Routing {
    pub src_channels: usize,
    pub dst_channels: usize,
    pub map: ChannelMap,
}

/// Wide frames (`src_channels` wide) to native bytes (`dst_channels` wide).
pub(crate) type EncodeFn = fn(dst: &mut [u8], src: &[i32], frames: usize, routing: &Routing);

/// Native bytes (`src_channels` wide) to wide frames (`dst_channels` wide).
/// Also the signature of the blending decoder.
pub(crate) type DecodeFn = fn(dst: &mut [i32], src: &[u8], frames: usize, routing: &Routing);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    /// Same channel count, channel `i` to channel `i`.
    Identity,
    MonoToStereo,
    StereoToMono,
    Generic,
}

impl Shape {
    fn of(routing: &Routing) -> Shape {
        match (routing.src_channels, routing.dst_channels) {
            (1, 2) => Shape::MonoToStereo,
            (2, 1) => Shape::StereoToMono,
            (s, d) if s == d && is_identity(&routing.map) => Shape::Identity,
            _ => Shape::Generic,
        }
    }
}

pub(crate) fn select_encode(format: SampleFormat, routing: &Routing) -> EncodeFn {
    match format {
        SampleFormat::S8 => encoder::<i8>(routing),
        SampleFormat::U8 => encoder::<u8>(routing),
        SampleFormat::S16 => encoder::<i16>(routing),
        SampleFormat::U16 => encoder::<u16>(routing),
        SampleFormat::S32 => encoder::<i32>(routing),
        SampleFormat::U32 => encoder::<u32>(routing),
        SampleFormat::Raw => encoder::<RawSample>(routing),
    }
}

/// Returns the plain decoder and the blending decoder.
pub(crate) fn select_decode(format: SampleFormat, routing: &Routing) -> (DecodeFn, DecodeFn) {
    match format {
        SampleFormat::S8 => decoders::<i8>(routing),
        SampleFormat::U8 => decoders::<u8>(routing),
        SampleFormat::S16 => decoders::<i16>(routing),
        SampleFormat::U16 => decoders::<u16>(routing),
        SampleFormat::S32 => decoders::<i32>(routing),
        SampleFormat::U32 => decoders::<u32>(routing),
        SampleFormat::Raw => decoders::<RawSample>(routing),
    }
}

fn encoder<S: Sample>(routing: &Routing) -> EncodeFn {
    match Shape::of(routing) {
        Shape::Identity => encode_identity::<S>,
        Shape::MonoToStereo => encode_mono_to_stereo::<S>,
        Shape::StereoToMono => encode_stereo_to_mono::<S>,
        Shape::Generic => encode_generic::<S>,
    }
}

fn decoders<S: Sample>(routing: &Routing) -> (DecodeFn, DecodeFn) {
    let shape = Shape::of(routing);
    let decode: DecodeFn = match shape {
        Shape::Identity => decode_identity::<S>,
        Shape::MonoToStereo => decode_mono_to_stereo::<S>,
        Shape::StereoToMono => decode_stereo_to_mono::<S>,
        Shape::Generic => decode_generic::<S>,
    };
    let decode_blend: DecodeFn = match shape {
        Shape::Identity => decode_blend_identity::<S>,
        Shape::MonoToStereo => decode_blend_mono_to_stereo::<S>,
        Shape::StereoToMono => decode_blend_stereo_to_mono::<S>,
        Shape::Generic => decode_blend_generic::<S>,
    };
    (decode, decode_blend)
}

// Encode

fn encode_identity<S: Sample>(dst: &mut [u8], src: &[i32], frames: usize, routing: &Routing) {
    let samples = frames * routing.dst_channels;
    for (out, &wide) in dst.chunks_exact_mut(S::BYTES).zip(src).take(samples) {
        S::from_wide(wide).write_le(out);
    }
}

fn encode_mono_to_stereo<S: Sample>(dst: &mut [u8], src: &[i32], frames: usize, _: &Routing) {
    for (out, &wide) in dst.chunks_exact_mut(2 * S::BYTES).zip(src).take(frames) {
        let sample = S::from_wide(wide);
        sample.write_le(out);
        sample.write_le(&mut out[S::BYTES..]);
    }
}

fn encode_stereo_to_mono<S: Sample>(dst: &mut [u8], src: &[i32], frames: usize, _: &Routing) {
    for (out, pair) in dst.chunks_exact_mut(S::BYTES).zip(src.chunks_exact(2)).take(frames) {
        S::from_wide(blend(pair[0], pair[1])).write_le(out);
    }
}

fn encode_generic<S: Sample>(dst: &mut [u8], src: &[i32], frames: usize, routing: &Routing) {
    let dst_frame = S::BYTES * routing.dst_channels;
    let frames_out = dst.chunks_exact_mut(dst_frame);
    let frames_in = src.chunks_exact(routing.src_channels);
    for (out, frame) in frames_out.zip(frames_in).take(frames) {
        for (slot, &source) in out.chunks_exact_mut(S::BYTES).zip(routing.map.iter()) {
            let sample = match source {
                ChannelSource::Channel(idx) => S::from_wide(frame[idx as usize]),
                ChannelSource::Silence => S::SILENCE,
                ChannelSource::Zero => S::ZERO,
            };
            sample.write_le(slot);
        }
    }
}

// Decode

fn decode_identity<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, routing: &Routing) {
    let samples = frames * routing.dst_channels;
    for (wide, raw) in dst.iter_mut().zip(src.chunks_exact(S::BYTES)).take(samples) {
        *wide = S::read_le(raw).to_wide();
    }
}

fn decode_mono_to_stereo<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, _: &Routing) {
    for (pair, raw) in dst.chunks_exact_mut(2).zip(src.chunks_exact(S::BYTES)).take(frames) {
        let wide = S::read_le(raw).to_wide();
        pair[0] = wide;
        pair[1] = wide;
    }
}

fn decode_stereo_to_mono<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, _: &Routing) {
    for (wide, raw) in dst.iter_mut().zip(src.chunks_exact(2 * S::BYTES)).take(frames) {
        let left = S::read_le(raw).to_wide();
        let right = S::read_le(&raw[S::BYTES..]).to_wide();
        *wide = blend(left, right);
    }
}

fn decode_generic<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, routing: &Routing) {
    let src_frame = S::BYTES * routing.src_channels;
    let frames_out = dst.chunks_exact_mut(routing.dst_channels);
    for (frame, raw) in frames_out.zip(src.chunks_exact(src_frame)).take(frames) {
        for (wide, &source) in frame.iter_mut().zip(routing.map.iter()) {
            *wide = match source {
                ChannelSource::Channel(idx) => S::read_le(&raw[idx as usize * S::BYTES..]).to_wide(),
                // Both sentinels are zero in the wide domain.
                ChannelSource::Silence | ChannelSource::Zero => 0,
            };
        }
    }
}

// Decode + blend

fn decode_blend_identity<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, routing: &Routing) {
    let samples = frames * routing.dst_channels;
    for (wide, raw) in dst.iter_mut().zip(src.chunks_exact(S::BYTES)).take(samples) {
        blend_into(wide, S::read_le(raw).to_wide());
    }
}

fn decode_blend_mono_to_stereo<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, _: &Routing) {
    for (pair, raw) in dst.chunks_exact_mut(2).zip(src.chunks_exact(S::BYTES)).take(frames) {
        let wide = S::read_le(raw).to_wide();
        blend_into(&mut pair[0], wide);
        blend_into(&mut pair[1], wide);
    }
}

fn decode_blend_stereo_to_mono<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, _: &Routing) {
    for (wide, raw) in dst.iter_mut().zip(src.chunks_exact(2 * S::BYTES)).take(frames) {
        let left = S::read_le(raw).to_wide();
        let right = S::read_le(&raw[S::BYTES..]).to_wide();
        blend_into(wide, blend(left, right));
    }
}

fn decode_blend_generic<S: Sample>(dst: &mut [i32], src: &[u8], frames: usize, routing: &Routing) {
    let src_frame = S::BYTES * routing.src_channels;
    let frames_out = dst.chunks_exact_mut(routing.dst_channels);
    for (frame, raw) in frames_out.zip(src.chunks_exact(src_frame)).take(frames) {
        for (wide, &source) in frame.iter_mut().zip(routing.map.iter()) {
            if let ChannelSource::Channel(idx) = source {
                blend_into(wide, S::read_le(&raw[idx as usize * S::BYTES..]).to_wide());
            }
        }
    }
}
