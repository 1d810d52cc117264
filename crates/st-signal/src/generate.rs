//! Signal regeneration from stimulus parameters.

use alloc::vec::Vec;

use crate::{SignalBuffer, SignalError, Stimulus, Volume, Window};

/// Longest synthesized signal, in frames (about 1.5 h at 48 kHz).
pub const MAX_FRAMES: usize = 1 << 28;

/// Every parameter that affects the generated samples besides the
/// waveform itself.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalParams {
    pub sample_rate: u32,
    /// Length in seconds.
    pub duration: f64,
    pub volume: Volume,
    pub channels: u16,
    pub window: Window,
}

impl SignalParams {
    /// Check all parameters, including that they yield at least one frame.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.sample_rate == 0 {
            return Err(SignalError::SampleRate);
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SignalError::Duration(self.duration));
        }
        if self.channels == 0 {
            return Err(SignalError::NoChannels);
        }
        let frames = libm::floor(self.duration * self.sample_rate as f64);
        if frames > MAX_FRAMES as f64 {
            return Err(SignalError::TooLong {
                duration: self.duration,
                sample_rate: self.sample_rate,
            });
        }
        if self.n_frames() == 0 {
            return Err(SignalError::NoSamples {
                duration: self.duration,
                sample_rate: self.sample_rate,
            });
        }
        self.volume.resolve(self.channels)?;
        self.window.validate()
    }

    /// Number of frames: `floor(duration * sample_rate)`.
    pub fn n_frames(&self) -> usize {
        libm::floor(self.duration * self.sample_rate as f64) as usize
    }
}

/// Sample times in seconds: `n_frames` points evenly spaced over
/// `[0, duration]`, both ends included.
pub fn times(duration: f64, n_frames: usize) -> Vec<f64> {
    match n_frames {
        0 => Vec::new(),
        1 => alloc::vec![0.0],
        n => {
            let step = duration / (n - 1) as f64;
            (0..n).map(|i| i as f64 * step).collect()
        }
    }
}

/// Scale `x` so its largest magnitude is 1. All-zero input is left as is.
pub fn normalize_peak(x: &mut [f64]) {
    let peak = x.iter().fold(0.0f64, |acc, &v| acc.max(libm::fabs(v)));
    if peak > 0.0 {
        for v in x.iter_mut() {
            *v /= peak;
        }
    }
}

/// Regenerate the signal buffer for `stimulus` under `params`.
///
/// The waveform is peak-normalized, windowed, and replicated on every
/// channel with that channel's volume.
pub fn generate(stimulus: &Stimulus, params: &SignalParams) -> Result<SignalBuffer, SignalError> {
    stimulus.validate()?;
    params.validate()?;

    let n = params.n_frames();
    let mut mono = stimulus.synthesize(&times(params.duration, n));
    normalize_peak(&mut mono);

    let mut mono: Vec<f32> = mono.into_iter().map(|v| v as f32).collect();
    params.window.apply(&mut mono)?;

    let gains = params.volume.gains(params.channels)?;
    let channels = params.channels as usize;
    let mut data = Vec::with_capacity(n * channels);
    for &s in &mono {
        data.extend(gains.iter().map(|&g| s * g));
    }

    log::debug!(
        "generated {} ({} frames x {} channels at {} Hz)",
        stimulus,
        n,
        channels,
        params.sample_rate
    );
    SignalBuffer::from_interleaved(data, params.channels)
}
