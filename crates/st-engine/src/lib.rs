//! Playback core for stimuli.
//!
//! Resolves a device configuration, opens a pull-based output stream
//! and schedules playback of a bound signal buffer against a monotonic
//! clock. The callback side is lock-free and allocation-free.

mod clock;
mod device;
mod engine;
mod error;
mod fault;
mod host;
mod offline;
mod renderer;
mod sleep;
mod state;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use device::{BlockSize, DeviceConfig, DeviceInfo, DeviceRequest, DeviceTable};
pub use engine::PlaybackEngine;
pub use error::{ConfigError, EngineError};
pub use fault::{RtFault, FAULT_CAPACITY};
pub use host::{AudioHost, CallbackTiming, HostError, OutputStream, RenderFn, StreamSpec};
pub use offline::OfflineHost;
pub use sleep::{sleep, sleep_with, SPIN_THRESHOLD_NS};
