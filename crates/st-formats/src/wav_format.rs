//! WAV encoding and decoding.

use std::fs;
use std::io::Write;
use std::path::Path;

use st_signal::{SignalBuffer, SAMPLE_BYTES};

use crate::FormatError;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Decoded WAV contents: interleaved samples scaled to `[-1, 1]` for
/// integer encodings, as stored for float encodings.
#[derive(Clone, Debug, PartialEq)]
pub struct WavData {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl WavData {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

// --- Writing ---

/// Size of the RIFF, `fmt ` and `data` headers written by [`wav_bytes`].
const HEADER_BYTES: usize = 44;

/// Encode `buffer` as a 32-bit IEEE float WAV file.
///
/// Fails when the samples do not fit the 32-bit RIFF size fields.
pub fn wav_bytes(buffer: &SignalBuffer, sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let samples = buffer.as_interleaved();
    let channels = buffer.channels();
    let block_align = channels * SAMPLE_BYTES as u16;
    let data_size = samples
        .len()
        .checked_mul(SAMPLE_BYTES)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| n.checked_add(HEADER_BYTES as u32 - 8).is_some())
        .ok_or(FormatError::TooLarge {
            frames: buffer.frames(),
            channels,
        })?;

    let mut out = Vec::with_capacity(HEADER_BYTES + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(data_size + HEADER_BYTES as u32 - 8).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_IEEE_FLOAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&sample_rate.saturating_mul(block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(SAMPLE_BYTES as u16 * 8).to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
    Ok(out)
}

/// Write `buffer` as a 32-bit IEEE float WAV stream.
pub fn write_wav(w: &mut impl Write, buffer: &SignalBuffer, sample_rate: u32) -> Result<(), FormatError> {
    w.write_all(&wav_bytes(buffer, sample_rate)?)?;
    Ok(())
}

/// Write `buffer` to `path`, creating parent directories as needed.
pub fn save_wav(path: &Path, buffer: &SignalBuffer, sample_rate: u32) -> Result<(), FormatError> {
    let bytes = wav_bytes(buffer, sample_rate)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

// --- Reading ---

/// Read and decode a WAV file.
pub fn read_wav(path: &Path) -> Result<WavData, FormatError> {
    load_wav(&fs::read(path)?)
}

/// Decode a WAV file from raw bytes.
pub fn load_wav(data: &[u8]) -> Result<WavData, FormatError> {
    let header = parse_header(data)?;
    let end = (header.data_offset + header.data_size).min(data.len());
    let raw = &data[header.data_offset..end];
    let samples = decode(raw, &header)?;

    // drop a trailing partial frame
    let whole = samples.len() - samples.len() % header.num_channels as usize;
    let mut samples = samples;
    samples.truncate(whole);

    Ok(WavData {
        sample_rate: header.sample_rate,
        channels: header.num_channels,
        samples,
    })
}

struct WavHeader {
    format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || pos + 8 + 16 > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            let mut format = read_u16_le(data, pos + 8);
            let channels = read_u16_le(data, pos + 10);
            let rate = read_u32_le(data, pos + 12);
            let bits = read_u16_le(data, pos + 22);
            if format == FORMAT_EXTENSIBLE {
                // the sub-format GUID starts with the actual format tag
                if chunk_size < 40 || pos + 8 + 26 > data.len() {
                    return Err(FormatError::UnexpectedEof);
                }
                format = read_u16_le(data, pos + 8 + 24);
            }
            fmt = Some((format, channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos = pos.saturating_add(8 + chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (format, num_channels, sample_rate, bits_per_sample) = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::InvalidHeader)?;
    if num_channels == 0 {
        return Err(FormatError::NoChannels);
    }

    Ok(WavHeader {
        format,
        num_channels,
        sample_rate,
        bits_per_sample,
        data_offset,
        data_size,
    })
}

fn decode(raw: &[u8], header: &WavHeader) -> Result<Vec<f32>, FormatError> {
    match (header.format, header.bits_per_sample) {
        (FORMAT_PCM, 8) => Ok(read_8bit(raw)),
        (FORMAT_PCM, 16) => Ok(read_16bit(raw)),
        (FORMAT_PCM, 24) => Ok(read_24bit(raw)),
        (FORMAT_PCM, 32) => Ok(read_32bit(raw)),
        (FORMAT_IEEE_FLOAT, 32) => Ok(read_f32(raw)),
        (FORMAT_IEEE_FLOAT, 64) => Ok(read_f64(raw)),
        (format, bits) => Err(FormatError::Unsupported { format, bits }),
    }
}

/// 8-bit WAV is unsigned, centred on 128.
fn read_8bit(raw: &[u8]) -> Vec<f32> {
    raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect()
}

fn read_16bit(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect()
}

fn read_24bit(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(3)
        .map(|c| {
            // sign-extend through the top byte of an i32
            let v = i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8;
            v as f32 / 8_388_608.0
        })
        .collect()
}

fn read_32bit(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|c| (i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64 / 2_147_483_648.0) as f32)
        .collect()
}

fn read_f32(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn read_f64(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b) as f32
        })
        .collect()
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
