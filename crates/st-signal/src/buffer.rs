//! Multichannel f32 signal buffer with interleaved layout.

use alloc::vec;
use alloc::vec::Vec;

use crate::SignalError;

/// Largest magnitude a bound sample may have.
pub const MAX_AMPLITUDE: f32 = 1.0;

/// Size in bytes of one sample as delivered to the device.
pub const SAMPLE_BYTES: usize = core::mem::size_of::<f32>();

/// Memory layout of a raw 2-D sample array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Row-major `(frames, channels)`: the samples of one frame are adjacent.
    #[default]
    FrameMajor,
    /// Column-major: each channel is one contiguous plane of `frames` samples.
    ChannelMajor,
}

/// A raw sample array as produced by a generator, before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSamples {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub layout: Layout,
}

impl RawSamples {
    /// A 1-D array, treated as a single channel.
    pub fn mono(data: Vec<f32>) -> Self {
        let frames = data.len();
        Self {
            data,
            shape: vec![frames],
            layout: Layout::FrameMajor,
        }
    }

    /// A 2-D frame-major array of `channels` columns.
    pub fn interleaved(data: Vec<f32>, channels: usize) -> Self {
        let frames = if channels == 0 { 0 } else { data.len() / channels };
        Self {
            data,
            shape: vec![frames, channels],
            layout: Layout::FrameMajor,
        }
    }

    /// A 2-D array stored one channel after another.
    pub fn planar(data: Vec<f32>, channels: usize) -> Self {
        let frames = if channels == 0 { 0 } else { data.len() / channels };
        Self {
            data,
            shape: vec![frames, channels],
            layout: Layout::ChannelMajor,
        }
    }
}

/// Whether validation had to copy the input into frame-major order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
    AsIs,
    Copied,
}

/// An immutable, validated multichannel sample buffer.
///
/// Samples are interleaved frame by frame:
/// `data[frame * channels + ch]` is channel `ch` at `frame`.
/// A buffer always holds at least one frame and one channel, and every
/// sample lies within `[-MAX_AMPLITUDE, MAX_AMPLITUDE]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalBuffer {
    data: Vec<f32>,
    frames: usize,
    channels: u16,
}

impl SignalBuffer {
    /// Validate a raw array and bring it into frame-major order.
    ///
    /// Channel-major input is copied, which is reported both in the
    /// returned [`Normalization`] and as a warning.
    pub fn validate(raw: RawSamples) -> Result<(Self, Normalization), SignalError> {
        let ndim = raw.shape.len();
        if !(1..=2).contains(&ndim) {
            return Err(SignalError::Dimensions(ndim));
        }
        let frames = raw.shape[0];
        let channels = if ndim == 2 { raw.shape[1] } else { 1 };

        if channels == 0 {
            return Err(SignalError::NoChannels);
        }
        let channels_u16 =
            u16::try_from(channels).map_err(|_| SignalError::TooManyChannels(channels))?;
        if frames == 0 {
            return Err(SignalError::Empty);
        }
        let expected = frames * channels;
        if raw.data.len() != expected {
            return Err(SignalError::ShapeMismatch {
                expected,
                actual: raw.data.len(),
            });
        }

        let (data, normalization) = if raw.layout == Layout::ChannelMajor && channels > 1 {
            log::warn!(
                "sample array of {} frames x {} channels is not frame-major; copying",
                frames,
                channels
            );
            (interleave_planes(&raw.data, frames, channels), Normalization::Copied)
        } else {
            (raw.data, Normalization::AsIs)
        };

        check_amplitude(&data, channels)?;

        Ok((
            Self {
                data,
                frames,
                channels: channels_u16,
            },
            normalization,
        ))
    }

    /// Validate a raw array, discarding the normalization report.
    pub fn from_raw(raw: RawSamples) -> Result<Self, SignalError> {
        Self::validate(raw).map(|(buffer, _)| buffer)
    }

    /// Build from frame-major samples.
    pub fn from_interleaved(data: Vec<f32>, channels: u16) -> Result<Self, SignalError> {
        Self::from_raw(RawSamples::interleaved(data, channels as usize))
    }

    /// Build a single-channel buffer.
    pub fn from_mono(data: Vec<f32>) -> Result<Self, SignalError> {
        Self::from_raw(RawSamples::mono(data))
    }

    /// A buffer of silence.
    pub fn silence(frames: usize, channels: u16) -> Result<Self, SignalError> {
        Self::from_interleaved(vec![0.0; frames * channels as usize], channels)
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes one frame occupies on the device side.
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * SAMPLE_BYTES
    }

    /// All samples in frame-major order.
    pub fn as_interleaved(&self) -> &[f32] {
        &self.data
    }

    /// Samples from `frame` (inclusive) to the end of the buffer.
    pub fn samples_from(&self, frame: usize) -> &[f32] {
        let start = (frame * self.channels as usize).min(self.data.len());
        &self.data[start..]
    }

    /// The samples of one frame.
    pub fn frame(&self, frame: usize) -> &[f32] {
        let ch = self.channels as usize;
        &self.data[frame * ch..(frame + 1) * ch]
    }

    /// Iterate over one channel's samples.
    pub fn channel(&self, ch: u16) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .skip(ch as usize)
            .step_by(self.channels as usize)
            .copied()
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, &s| acc.max(libm::fabsf(s)))
    }

    /// Largest absolute sample value of one channel.
    pub fn channel_peak(&self, ch: u16) -> f32 {
        self.channel(ch).fold(0.0f32, |acc, s| acc.max(libm::fabsf(s)))
    }

    /// Playback length in seconds at `sample_rate`.
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.frames as f64 / sample_rate as f64
    }

    /// Copy the frames in `start..end` into a new buffer.
    pub fn slice_frames(&self, start: usize, end: usize) -> Result<Self, SignalError> {
        if start >= end || end > self.frames {
            return Err(SignalError::FrameRange {
                start,
                end,
                frames: self.frames,
            });
        }
        let ch = self.channels as usize;
        Ok(Self {
            data: self.data[start * ch..end * ch].to_vec(),
            frames: end - start,
            channels: self.channels,
        })
    }

    /// Consume the buffer, returning its frame-major samples.
    pub fn into_interleaved(self) -> Vec<f32> {
        self.data
    }
}

fn interleave_planes(planes: &[f32], frames: usize, channels: usize) -> Vec<f32> {
    let mut out = vec![0.0; frames * channels];
    for ch in 0..channels {
        let plane = &planes[ch * frames..(ch + 1) * frames];
        for (frame, &sample) in plane.iter().enumerate() {
            out[frame * channels + ch] = sample;
        }
    }
    out
}

fn check_amplitude(data: &[f32], channels: usize) -> Result<(), SignalError> {
    // `!(x <= MAX)` also catches NaN
    match data
        .iter()
        .position(|&s| !(libm::fabsf(s) <= MAX_AMPLITUDE))
    {
        Some(idx) => Err(SignalError::Amplitude {
            frame: idx / channels,
            channel: (idx % channels) as u16,
            value: data[idx],
        }),
        None => Ok(()),
    }
}
