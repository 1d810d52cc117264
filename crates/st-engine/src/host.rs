//! Audio host abstraction: device query and pull-based output streams.

use crate::device::{BlockSize, DeviceTable};

/// Error reported by an audio host.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("failed to query audio devices: {0}")]
    Devices(String),
    #[error("audio device {0} is unavailable")]
    DeviceUnavailable(usize),
    #[error("unsupported sample format: {0}")]
    SampleFormat(String),
    #[error("failed to create audio stream: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
}

/// Timestamps handed to each callback invocation, in nanoseconds on the
/// host's stream clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallbackTiming {
    /// When the callback was invoked.
    pub callback_ns: i64,
    /// When the first frame of this buffer is expected to reach the DAC.
    pub playback_ns: i64,
}

impl CallbackTiming {
    pub fn new(callback_ns: i64, playback_ns: i64) -> Self {
        Self {
            callback_ns,
            playback_ns,
        }
    }

    /// Timing for a host that reports a fixed output latency.
    pub fn with_latency(latency_ns: i64) -> Self {
        Self::new(0, latency_ns)
    }

    /// How far ahead of "now" the samples written in this callback will sound.
    pub fn output_latency_ns(&self) -> i64 {
        self.playback_ns.saturating_sub(self.callback_ns)
    }
}

/// Parameters of an output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub device: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_size: BlockSize,
}

/// Fills one interleaved f32 output buffer per invocation.
///
/// Runs on the host's real-time thread.
pub type RenderFn = Box<dyn FnMut(&mut [f32], &CallbackTiming) + Send + 'static>;

/// A running output stream. Dropping the handle closes the stream.
pub trait OutputStream {
    fn start(&mut self) -> Result<(), HostError>;
    fn stop(&mut self) -> Result<(), HostError>;
}

/// An audio API able to enumerate devices and open callback streams.
pub trait AudioHost: Send + Sync {
    fn name(&self) -> &str;

    /// Snapshot of the output devices.
    fn devices(&self) -> Result<DeviceTable, HostError>;

    /// Open a stream that pulls samples from `render`. The stream is
    /// returned stopped.
    fn open_stream(
        &self,
        spec: &StreamSpec,
        render: RenderFn,
    ) -> Result<Box<dyn OutputStream>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_is_difference() {
        assert_eq!(CallbackTiming::new(1_000, 6_000).output_latency_ns(), 5_000);
        assert_eq!(CallbackTiming::with_latency(42).output_latency_ns(), 42);
        assert_eq!(CallbackTiming::default().output_latency_ns(), 0);
    }
}
