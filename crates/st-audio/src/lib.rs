//! Audio output host for stimuli, backed by cpal.

mod cpal_backend;

pub use cpal_backend::CpalHost;
