//! Synthesized stimulus kinds.

use alloc::vec::Vec;
use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;

use crate::noise::colored_noise;
use crate::SignalError;

/// Amplitude modulation scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AmMethod {
    /// Classical AM: `(1 - cos(2π fm t)) · cos(2π fc t)`.
    #[default]
    Conventional,
    /// Double side band suppressed carrier: `sin(2π fm t) · sin(2π fc t)`.
    Dsbsc,
}

impl fmt::Display for AmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmMethod::Conventional => write!(f, "conventional"),
            AmMethod::Dsbsc => write!(f, "dsbsc"),
        }
    }
}

impl FromStr for AmMethod {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conventional" => Ok(AmMethod::Conventional),
            "dsbsc" => Ok(AmMethod::Dsbsc),
            _ => Err(UnknownName),
        }
    }
}

/// Spectral color of a noise stimulus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoiseColor {
    #[default]
    White,
    Pink,
    Blue,
    Violet,
    Brown,
}

impl NoiseColor {
    pub const ALL: [NoiseColor; 5] = [
        NoiseColor::White,
        NoiseColor::Pink,
        NoiseColor::Blue,
        NoiseColor::Violet,
        NoiseColor::Brown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NoiseColor::White => "white",
            NoiseColor::Pink => "pink",
            NoiseColor::Blue => "blue",
            NoiseColor::Violet => "violet",
            NoiseColor::Brown => "brown",
        }
    }
}

impl fmt::Display for NoiseColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseColor {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoiseColor::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or(UnknownName)
    }
}

/// Returned when parsing an unknown method or color name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownName;

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown name")
    }
}

/// A synthesized stimulus waveform.
#[derive(Clone, Debug, PartialEq)]
pub enum Stimulus {
    /// Pure tone: `sin(2π f t)`.
    Tone { frequency: f64 },
    /// Carrier `carrier` amplitude modulated at `modulation`.
    AmplitudeModulated {
        carrier: f64,
        modulation: f64,
        method: AmMethod,
    },
    /// Colored noise drawn from a seeded generator.
    ColoredNoise { color: NoiseColor, seed: u64 },
}

impl Stimulus {
    /// Check the waveform parameters.
    pub fn validate(&self) -> Result<(), SignalError> {
        match self {
            Stimulus::Tone { frequency } => check_frequency(*frequency),
            Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                ..
            } => {
                check_frequency(*carrier)?;
                check_frequency(*modulation)
            }
            Stimulus::ColoredNoise { .. } => Ok(()),
        }
    }

    /// Evaluate the waveform at `times` (seconds). Not normalized.
    pub fn synthesize(&self, times: &[f64]) -> Vec<f64> {
        match *self {
            Stimulus::Tone { frequency } => times
                .iter()
                .map(|&t| libm::sin(2.0 * PI * frequency * t))
                .collect(),
            Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                method: AmMethod::Conventional,
            } => times
                .iter()
                .map(|&t| {
                    let amplitude = 1.0 - libm::cos(2.0 * PI * modulation * t);
                    amplitude * libm::cos(2.0 * PI * carrier * t)
                })
                .collect(),
            Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                method: AmMethod::Dsbsc,
            } => times
                .iter()
                .map(|&t| {
                    let amplitude = libm::sin(2.0 * PI * modulation * t);
                    amplitude * libm::sin(2.0 * PI * carrier * t)
                })
                .collect(),
            Stimulus::ColoredNoise { color, seed } => colored_noise(color, times.len(), seed),
        }
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stimulus::Tone { frequency } => write!(f, "Pure tone @ {:.2} Hz", frequency),
            Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                method,
            } => write!(
                f,
                "AM {} @ {:.2} Hz carrier, {:.2} Hz modulation",
                method, carrier, modulation
            ),
            Stimulus::ColoredNoise { color, .. } => write!(f, "{} noise", color),
        }
    }
}

fn check_frequency(frequency: f64) -> Result<(), SignalError> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(())
    } else {
        Err(SignalError::Frequency(frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn tone_quarter_period() {
        let s = Stimulus::Tone { frequency: 1.0 }.synthesize(&[0.0, 0.25, 0.5]);
        assert!(s[0].abs() < 1e-12);
        assert!((s[1] - 1.0).abs() < 1e-12);
        assert!(s[2].abs() < 1e-9);
    }

    #[test]
    fn conventional_am_envelope() {
        let am = Stimulus::AmplitudeModulated {
            carrier: 1000.0,
            modulation: 40.0,
            method: AmMethod::Conventional,
        };
        // envelope is zero at t = 0 and doubles the carrier at half a modulation period
        let s = am.synthesize(&[0.0, 1.0 / 80.0]);
        assert!(s[0].abs() < 1e-12);
        assert!((s[1].abs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn dsbsc_starts_silent() {
        let am = Stimulus::AmplitudeModulated {
            carrier: 1000.0,
            modulation: 40.0,
            method: AmMethod::Dsbsc,
        };
        assert!(am.synthesize(&[0.0])[0].abs() < 1e-12);
    }

    #[test]
    fn frequency_must_be_positive() {
        assert!(Stimulus::Tone { frequency: 440.0 }.validate().is_ok());
        assert_eq!(
            Stimulus::Tone { frequency: 0.0 }.validate(),
            Err(SignalError::Frequency(0.0))
        );
        assert!(Stimulus::Tone { frequency: -440.0 }.validate().is_err());
        assert!(Stimulus::AmplitudeModulated {
            carrier: 1000.0,
            modulation: f64::INFINITY,
            method: AmMethod::Dsbsc,
        }
        .validate()
        .is_err());
    }

    #[test]
    fn names_round_trip() {
        for color in NoiseColor::ALL {
            assert_eq!(color.to_string().parse::<NoiseColor>(), Ok(color));
        }
        assert_eq!("dsbsc".parse::<AmMethod>(), Ok(AmMethod::Dsbsc));
        assert!("purple".parse::<NoiseColor>().is_err());
    }

    #[test]
    fn display_mentions_frequency() {
        let s = Stimulus::Tone { frequency: 440.0 }.to_string();
        assert!(s.contains("Pure tone"));
        assert!(s.contains("440.00 Hz"));
    }
}
