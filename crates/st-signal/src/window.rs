//! Amplitude windows applied to synthesized signals.

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::PI;

use crate::SignalError;

/// Window shape multiplied into a signal to shape its onset and offset.
///
/// Every shape except [`Window::Custom`] is resampled to the current
/// signal length, so a window survives duration changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Window {
    #[default]
    Rectangular,
    Hann,
    /// Tapered cosine; `alpha` is the tapered fraction in `[0, 1]`.
    Tukey { alpha: f64 },
    /// Linear onset and offset ramps, each `ramp` (in `[0, 0.5]`) of the length.
    LinearRamp { ramp: f64 },
    /// Explicit samples, which must match the signal length.
    Custom(Vec<f32>),
}

impl Window {
    /// Check the shape parameters.
    pub fn validate(&self) -> Result<(), SignalError> {
        match self {
            Window::Rectangular | Window::Hann => Ok(()),
            Window::Tukey { alpha } => {
                if (0.0..=1.0).contains(alpha) {
                    Ok(())
                } else {
                    Err(SignalError::WindowParameter(*alpha))
                }
            }
            Window::LinearRamp { ramp } => {
                if (0.0..=0.5).contains(ramp) {
                    Ok(())
                } else {
                    Err(SignalError::WindowParameter(*ramp))
                }
            }
            Window::Custom(samples) => match samples.iter().find(|&&w| !(0.0..=1.0).contains(&w)) {
                Some(&w) => Err(SignalError::WindowValue(w)),
                None => Ok(()),
            },
        }
    }

    /// Window samples for a signal of `n` frames.
    pub fn samples(&self, n: usize) -> Result<Vec<f32>, SignalError> {
        self.validate()?;
        let w = match self {
            Window::Rectangular => vec![1.0; n],
            Window::Hann => hann(n),
            Window::Tukey { alpha } => tukey(n, *alpha),
            Window::LinearRamp { ramp } => linear_ramp(n, *ramp),
            Window::Custom(samples) => {
                if samples.len() != n {
                    return Err(SignalError::WindowLength {
                        given: samples.len(),
                        expected: n,
                    });
                }
                samples.clone()
            }
        };
        Ok(w)
    }

    /// Multiply the window into a mono signal in place.
    pub fn apply(&self, signal: &mut [f32]) -> Result<(), SignalError> {
        if *self == Window::Rectangular {
            return Ok(());
        }
        let w = self.samples(signal.len())?;
        for (s, w) in signal.iter_mut().zip(w) {
            *s *= w;
        }
        Ok(())
    }
}

impl core::fmt::Display for Window {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Window::Rectangular => write!(f, "rectangular"),
            Window::Hann => write!(f, "hann"),
            Window::Tukey { alpha } => write!(f, "tukey({})", alpha),
            Window::LinearRamp { ramp } => write!(f, "ramp({})", ramp),
            Window::Custom(s) => write!(f, "custom[{}]", s.len()),
        }
    }
}

fn hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let m = (n - 1) as f64;
    (0..n)
        .map(|i| (0.5 - 0.5 * libm::cos(2.0 * PI * i as f64 / m)) as f32)
        .collect()
}

fn tukey(n: usize, alpha: f64) -> Vec<f32> {
    if n <= 1 || alpha <= 0.0 {
        return vec![1.0; n];
    }
    let m = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let x = i as f64 / m;
            let edge = x.min(1.0 - x);
            if edge < alpha / 2.0 {
                (0.5 * (1.0 - libm::cos(2.0 * PI * edge / alpha))) as f32
            } else {
                1.0
            }
        })
        .collect()
}

fn linear_ramp(n: usize, ramp: f64) -> Vec<f32> {
    let mut w = vec![1.0; n];
    let n_ramp = libm::floor(ramp * n as f64) as usize;
    if n_ramp == 0 {
        return w;
    }
    for i in 0..n_ramp {
        let v = if n_ramp == 1 { 0.0 } else { i as f32 / (n_ramp - 1) as f32 };
        w[i] = v;
        w[n - 1 - i] = v;
    }
    w
}
