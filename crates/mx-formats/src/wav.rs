//! RIFF/WAVE encoding and decoding for integer PCM.

use std::io::{Cursor, Write};

use binrw::BinRead;
use mx_pcm::{ChannelId, PcmProps, SampleFormat, MAX_CHANNELS};

use crate::{FormatError, PcmClip};

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// KSDATAFORMAT_SUBTYPE_PCM as it is laid out on disk.
const SUBTYPE_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

const FMT_PCM_SIZE: u32 = 16;
const FMT_EXTENSIBLE_SIZE: u32 = 40;

#[derive(BinRead, Debug)]
#[br(little)]
struct RiffHeader {
    magic: [u8; 4],
    _file_size: u32,
    form: [u8; 4],
}

#[derive(BinRead, Debug)]
#[br(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    _byte_rate: u32,
    _block_align: u16,
    bits_per_sample: u16,
}

/// Trailer of a WAVE_FORMAT_EXTENSIBLE `fmt ` chunk.
#[derive(BinRead, Debug)]
#[br(little)]
struct FmtExtension {
    _cb_size: u16,
    _valid_bits: u16,
    channel_mask: u32,
    sub_format: [u8; 16],
}

// --- Reading ---

/// Parse a WAV file held in memory.
pub fn read_wav(data: &[u8]) -> Result<PcmClip, FormatError> {
    let mut cursor = Cursor::new(data);
    let riff = RiffHeader::read(&mut cursor)?;
    if &riff.magic != b"RIFF" || &riff.form != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut fmt: Option<(FmtChunk, Option<FmtExtension>)> = None;
    let mut body: Option<&[u8]> = None;

    while (cursor.position() as usize) + 8 <= data.len() {
        let chunk = ChunkHeader::read(&mut cursor)?;
        let start = cursor.position() as usize;
        let size = chunk.size as usize;

        match &chunk.id {
            b"fmt " => {
                if chunk.size < FMT_PCM_SIZE {
                    return Err(FormatError::UnexpectedEof);
                }
                let base = FmtChunk::read(&mut cursor)?;
                let ext = if base.format_tag == WAVE_FORMAT_EXTENSIBLE && chunk.size >= FMT_EXTENSIBLE_SIZE {
                    Some(FmtExtension::read(&mut cursor)?)
                } else {
                    None
                };
                fmt = Some((base, ext));
            }
            b"data" => {
                // Streaming writers leave the size unset; take what is there.
                let end = start.saturating_add(size).min(data.len());
                body = Some(&data[start..end]);
            }
            _ => {}
        }

        // Chunks are word aligned.
        let next = start.saturating_add(size).saturating_add(size & 1);
        cursor.set_position(next as u64);
    }

    let (fmt, ext) = fmt.ok_or(FormatError::MissingChunk("fmt "))?;
    let body = body.ok_or(FormatError::MissingChunk("data"))?;
    let props = decode_props(&fmt, ext.as_ref())?;

    let frames = props.bytes_to_frames(body.len());
    let data = body[..props.frames_to_bytes(frames)].to_vec();
    Ok(PcmClip::new(props, data))
}

fn decode_props(fmt: &FmtChunk, ext: Option<&FmtExtension>) -> Result<PcmProps, FormatError> {
    match (fmt.format_tag, ext) {
        (WAVE_FORMAT_PCM, _) => {}
        (WAVE_FORMAT_EXTENSIBLE, Some(ext)) if ext.sub_format == SUBTYPE_PCM => {}
        (tag, _) => return Err(FormatError::UnsupportedEncoding(tag)),
    }

    // WAV stores 8-bit samples unsigned and everything wider signed.
    let (bytes, signed) = match fmt.bits_per_sample {
        8 => (1, false),
        16 => (2, true),
        32 => (4, true),
        bits => return Err(FormatError::UnsupportedSampleWidth(bits)),
    };
    let props = PcmProps::new(bytes, signed, fmt.channels as usize, fmt.sample_rate)?;

    match ext {
        Some(ext) if ext.channel_mask != 0 => {
            let ids = mask_to_layout(ext.channel_mask, props.channels());
            Ok(props.with_channel_ids(&ids)?)
        }
        _ => Ok(props),
    }
}

/// Speaker positions named by `mask`, lowest bit first. Channels beyond the
/// mask are unassigned.
fn mask_to_layout(mask: u32, channels: usize) -> Vec<ChannelId> {
    let mut ids: Vec<ChannelId> = (0..32)
        .filter(|bit| mask & (1 << bit) != 0)
        .filter_map(ChannelId::from_speaker_bit)
        .take(channels)
        .collect();
    ids.resize(channels, ChannelId::Unknown);
    ids
}

// --- Writing ---

/// Write `clip` as a WAV file.
///
/// Clips with more than two channels, or with a layout other than the
/// standard one, get a WAVE_FORMAT_EXTENSIBLE header carrying the speaker mask.
pub fn write_wav(w: &mut impl Write, clip: &PcmClip) -> Result<(), FormatError> {
    let props = &clip.props;
    let bits_per_sample: u16 = match props.format() {
        SampleFormat::U8 => 8,
        SampleFormat::S16 => 16,
        SampleFormat::S32 => 32,
        other => return Err(FormatError::UnsupportedSampleWidth(other.bytes() as u16 * 8)),
    };
    let num_channels = props.channels() as u16;
    let block_align = props.frame_bytes() as u16;
    let data_size = props.frames_to_bytes(clip.frames()) as u32;

    let default_ids = PcmProps::new(props.sample_bytes() as u8, props.is_signed(), props.channels(), props.rate())?;
    let extensible = num_channels > 2 || default_ids.channel_ids() != props.channel_ids();
    let fmt_size = if extensible { FMT_EXTENSIBLE_SIZE } else { FMT_PCM_SIZE };

    write_riff_header(w, 4 + (8 + fmt_size) + 8 + data_size)?;
    w.write_all(b"fmt ")?;
    w.write_all(&fmt_size.to_le_bytes())?;
    let tag = if extensible { WAVE_FORMAT_EXTENSIBLE } else { WAVE_FORMAT_PCM };
    w.write_all(&tag.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&props.rate().to_le_bytes())?;
    w.write_all(&(props.rate() * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())?;
    if extensible {
        w.write_all(&22u16.to_le_bytes())?;
        w.write_all(&bits_per_sample.to_le_bytes())?;
        w.write_all(&layout_to_mask(props.channel_ids()).to_le_bytes())?;
        w.write_all(&SUBTYPE_PCM)?;
    }

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    w.write_all(&clip.data[..data_size as usize])?;
    if data_size & 1 != 0 {
        w.write_all(&[0])?;
    }
    Ok(())
}

/// Encode `clip` into an in-memory WAV file.
pub fn clip_to_wav(clip: &PcmClip) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(clip.data.len() + 68);
    write_wav(&mut buf, clip)?;
    Ok(buf)
}

fn write_riff_header(w: &mut impl Write, riff_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&riff_size.to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn layout_to_mask(ids: &[ChannelId]) -> u32 {
    ids.iter()
        .take(MAX_CHANNELS)
        .filter_map(|id| id.speaker_bit())
        .fold(0, |mask, bit| mask | (1 << bit))
}
