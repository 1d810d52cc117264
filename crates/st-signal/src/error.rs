//! Validation errors for signal construction.

/// Error raised when a signal or one of its parameters is malformed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("sample array must be 1-D or 2-D of shape (frames, channels), got {0} dimensions")]
    Dimensions(usize),
    #[error("sample array has no frames")]
    Empty,
    #[error("sample array has no channels")]
    NoChannels,
    #[error("sample array has {0} channels, more than a stream can carry")]
    TooManyChannels(usize),
    #[error("shape holds {expected} samples but {actual} were provided")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("sample {value} at frame {frame}, channel {channel} is outside [-1, 1]")]
    Amplitude { frame: usize, channel: u16, value: f32 },
    #[error("frame range {start}..{end} is outside a buffer of {frames} frames")]
    FrameRange { start: usize, end: usize, frames: usize },
    #[error("duration must be a strictly positive number of seconds, got {0}")]
    Duration(f64),
    #[error("sample rate must be greater than 0")]
    SampleRate,
    #[error("{duration} s at {sample_rate} Hz yields no samples")]
    NoSamples { duration: f64, sample_rate: u32 },
    #[error("{duration} s at {sample_rate} Hz exceeds the longest supported signal")]
    TooLong { duration: f64, sample_rate: u32 },
    #[error("frequency must be a strictly positive number, got {0}")]
    Frequency(f64),
    #[error("volume must be a percentage between 0 and 100, got {0}")]
    Volume(f32),
    #[error("volume has {given} values for {channels} channels")]
    VolumeChannels { given: usize, channels: u16 },
    #[error("window has {given} samples but the signal has {expected}")]
    WindowLength { given: usize, expected: usize },
    #[error("window value {0} is outside [0, 1]")]
    WindowValue(f32),
    #[error("window parameter {0} is outside its valid range")]
    WindowParameter(f64),
}
