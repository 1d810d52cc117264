use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use st_signal::{AmMethod, NoiseColor, Stimulus};

pub const DEFAULT_FREQUENCY: f64 = 440.0;
pub const DEFAULT_CARRIER: f64 = 1000.0;
pub const DEFAULT_MODULATION: f64 = 40.0;

/// What a [`Sound`](crate::Sound) plays.
#[derive(Clone, Debug, PartialEq)]
pub enum SoundKind {
    Tone {
        frequency: f64,
    },
    AmplitudeModulated {
        carrier: f64,
        modulation: f64,
        method: AmMethod,
    },
    ColoredNoise {
        color: NoiseColor,
        seed: u64,
    },
    /// Samples read from a WAV file.
    Loaded {
        path: PathBuf,
    },
}

impl SoundKind {
    pub fn tone(frequency: f64) -> Self {
        SoundKind::Tone { frequency }
    }

    pub fn am(carrier: f64, modulation: f64, method: AmMethod) -> Self {
        SoundKind::AmplitudeModulated {
            carrier,
            modulation,
            method,
        }
    }

    /// Noise seeded from the system time.
    pub fn noise(color: NoiseColor) -> Self {
        SoundKind::ColoredNoise {
            color,
            seed: time_seed(),
        }
    }

    pub fn loaded(path: impl Into<PathBuf>) -> Self {
        SoundKind::Loaded { path: path.into() }
    }

    /// The synthesized waveform, `None` for loaded sounds.
    pub fn stimulus(&self) -> Option<Stimulus> {
        match *self {
            SoundKind::Tone { frequency } => Some(Stimulus::Tone { frequency }),
            SoundKind::AmplitudeModulated {
                carrier,
                modulation,
                method,
            } => Some(Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                method,
            }),
            SoundKind::ColoredNoise { color, seed } => Some(Stimulus::ColoredNoise { color, seed }),
            SoundKind::Loaded { .. } => None,
        }
    }

    pub(crate) fn from_stimulus(stimulus: &Stimulus) -> Self {
        match *stimulus {
            Stimulus::Tone { frequency } => SoundKind::Tone { frequency },
            Stimulus::AmplitudeModulated {
                carrier,
                modulation,
                method,
            } => SoundKind::AmplitudeModulated {
                carrier,
                modulation,
                method,
            },
            Stimulus::ColoredNoise { color, seed } => SoundKind::ColoredNoise { color, seed },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Tone { .. } => "pure tone",
            SoundKind::AmplitudeModulated { .. } => "AM sound",
            SoundKind::ColoredNoise { .. } => "noise",
            SoundKind::Loaded { .. } => "loaded sound",
        }
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stimulus() {
            Some(stimulus) => write!(f, "{}", stimulus),
            None => match self {
                SoundKind::Loaded { path } => write!(f, "Loaded sound '{}'", path.display()),
                _ => Ok(()),
            },
        }
    }
}

pub(crate) fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
