//! Errors raised by sound objects.

use std::path::PathBuf;

use st_engine::{ConfigError, EngineError, HostError};
use st_formats::FormatError;
use st_signal::SignalError;

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("the {0} of a loaded sound can not be changed; use crop to trim it")]
    ReadOnly(&'static str),
    #[error("'{property}' does not apply to a {kind}")]
    WrongKind {
        property: &'static str,
        kind: &'static str,
    },
    #[error("crop [{tmin}, {tmax}] is not a valid range within [0, {end}] seconds")]
    InvalidCrop { tmin: f64, tmax: f64, end: f64 },
    #[error("the file {0} already exists; set 'overwrite' to replace it")]
    FileExists(PathBuf),
}
