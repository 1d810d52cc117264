//! Configuration and usage errors.

use crate::host::HostError;

/// A device or stream parameter that cannot be honoured.
///
/// Always raised before a stream is opened.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no audio devices found")]
    NoDevice,
    #[error("invalid device index {index}; there are only {count} devices")]
    InvalidDevice { index: usize, count: usize },
    #[error("device '{index}: {name}' does not support output channels; select a different device")]
    NoOutputChannels { index: usize, name: String },
    #[error("device '{index}: {name}' does not support the number of output channels ({requested}, max {max})")]
    UnsupportedChannels {
        index: usize,
        name: String,
        requested: u16,
        max: u16,
    },
    #[error("sample rate must be greater than 0")]
    SampleRate,
    #[error("block size must be greater or equal than 0, got {0}")]
    NegativeBlockSize(i64),
    #[error("block size {given} exceeds the maximum of {max} frames")]
    BlockSizeTooLarge { given: i64, max: u32 },
}

/// Errors returned by [`PlaybackEngine`](crate::PlaybackEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("the playback engine is not initialized with sound data")]
    NotInitialized,
    #[error("the playback engine is closed")]
    Closed,
    #[error("the audio playback is already on-going")]
    PlaybackInProgress,
    #[error("'when' must be a non-negative number of seconds, got {0}")]
    InvalidWhen(f64),
}

impl EngineError {
    /// Whether the error reports a misuse of the engine rather than a
    /// bad configuration or a host failure.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            EngineError::NotInitialized
                | EngineError::Closed
                | EngineError::PlaybackInProgress
                | EngineError::InvalidWhen(_)
        )
    }
}
