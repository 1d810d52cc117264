//! Signal types for stimuli.
//!
//! This crate defines the sample buffers handed to the playback engine
//! and the synthesis routines that produce them. Stimulus generators
//! emit a validated [`SignalBuffer`]; the engine never sees raw arrays.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod buffer;
mod error;
mod generate;
mod noise;
mod stimulus;
mod volume;
mod window;

pub use buffer::{Layout, Normalization, RawSamples, SignalBuffer, MAX_AMPLITUDE, SAMPLE_BYTES};
pub use error::SignalError;
pub use generate::{generate, normalize_peak, times, SignalParams, MAX_FRAMES};
pub use stimulus::{AmMethod, NoiseColor, Stimulus, UnknownName};
pub use volume::Volume;
pub use window::Window;
