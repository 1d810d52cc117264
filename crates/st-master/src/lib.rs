//! Sound objects for stimuli.
//!
//! A [`Sound`] pairs a stimulus description with the engine that plays
//! it, so an experiment script can change a property, regenerate the
//! signal and schedule playback through one object. Both the CLI and
//! library callers go through this crate.

mod builder;
mod error;
mod kind;
mod loaded;
mod sound;

pub use builder::{SoundBuilder, DEFAULT_CHANNELS, DEFAULT_DURATION, DEFAULT_VOLUME};
pub use error::SoundError;
pub use kind::{SoundKind, DEFAULT_CARRIER, DEFAULT_FREQUENCY, DEFAULT_MODULATION};
pub use sound::{Mutation, Sound};

// Re-export common types so callers don't need the lower crates directly.
pub use st_audio::CpalHost;
pub use st_engine::{
    AudioHost, BlockSize, Clock, DeviceConfig, DeviceInfo, DeviceTable, ManualClock,
    MonotonicClock, OfflineHost, PlaybackEngine, RtFault,
};
pub use st_signal::{AmMethod, NoiseColor, SignalBuffer, Volume, Window};
