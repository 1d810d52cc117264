//! File formats for stimuli.
//!
//! Reads PCM and IEEE-float WAV files into interleaved f32 samples and
//! writes signal buffers as 32-bit float WAV, which round-trips f32
//! samples exactly.

mod wav_format;

pub use wav_format::{load_wav, read_wav, save_wav, wav_bytes, write_wav, WavData};

/// Error type for format parsing and writing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid file header")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unsupported WAV encoding (format tag {format:#06x}, {bits} bits)")]
    Unsupported { format: u16, bits: u16 },
    #[error("WAV file declares no channels")]
    NoChannels,
    #[error("{frames} frames x {channels} channels exceed the 4 GiB WAV size limit")]
    TooLarge { frames: usize, channels: u16 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
