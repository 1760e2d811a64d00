//! File formats for the mixbuf engine.
//!
//! Reads and writes integer PCM RIFF/WAVE files, including
//! WAVE_FORMAT_EXTENSIBLE channel masks.

mod wav;

use mx_pcm::{PcmError, PcmProps};

pub use wav::{clip_to_wav, read_wav, write_wav};

/// Error type for format parsing and writing.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("not a RIFF/WAVE file")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("missing `{0}` chunk")]
    MissingChunk(&'static str),
    /// Compressed, float or otherwise non-integer encodings.
    #[error("unsupported WAVE encoding tag {0:#06x}")]
    UnsupportedEncoding(u16),
    #[error("unsupported sample width of {0} bits")]
    UnsupportedSampleWidth(u16),
    #[error(transparent)]
    Pcm(#[from] PcmError),
    #[error("malformed chunk: {0}")]
    Binary(binrw::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        if err.is_eof() {
            FormatError::UnexpectedEof
        } else {
            FormatError::Binary(err)
        }
    }
}

/// A block of interleaved PCM together with its format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcmClip {
    pub props: PcmProps,
    pub data: Vec<u8>,
}

impl PcmClip {
    pub fn new(props: PcmProps, data: Vec<u8>) -> Self {
        PcmClip { props, data }
    }

    /// Whole frames in the clip.
    pub fn frames(&self) -> usize {
        self.props.bytes_to_frames(self.data.len())
    }

    /// Duration in milliseconds, rounded down.
    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / self.props.rate() as u64
    }
}
