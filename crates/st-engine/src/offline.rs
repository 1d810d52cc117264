//! A host without hardware: callbacks run when the caller pulls.
//!
//! Tests (and offline renders) drive the stream by calling
//! [`OfflineHost::pull`] with whatever frame count and timestamps they
//! want to simulate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{DeviceInfo, DeviceTable};
use crate::host::{AudioHost, CallbackTiming, HostError, OutputStream, RenderFn, StreamSpec};

struct OfflineSlot {
    id: u64,
    spec: StreamSpec,
    render: RenderFn,
    running: bool,
}

type Slot = Arc<Mutex<Option<OfflineSlot>>>;

/// Host with a fixed device table and at most one open stream.
pub struct OfflineHost {
    table: DeviceTable,
    slot: Slot,
    opened: AtomicU64,
    fail_next_open: AtomicBool,
}

impl OfflineHost {
    pub fn new(table: DeviceTable) -> Self {
        Self {
            table,
            slot: Arc::new(Mutex::new(None)),
            opened: AtomicU64::new(0),
            fail_next_open: AtomicBool::new(false),
        }
    }

    /// A host with one default output device.
    pub fn with_device(name: &str, sample_rate: u32, max_output_channels: u16) -> Self {
        Self::new(DeviceTable::new(
            vec![DeviceInfo {
                index: 0,
                name: name.to_string(),
                default_sample_rate: sample_rate,
                max_output_channels,
                default_low_output_latency: 0.0,
            }],
            Some(0),
        ))
    }

    /// Run one callback for `frames` frames. Returns `None` when no
    /// stream is open or the stream is stopped.
    pub fn pull(&self, frames: usize, timing: CallbackTiming) -> Option<Vec<f32>> {
        let channels = self.stream_spec()?.channels as usize;
        let mut out = vec![0.0; frames * channels];
        self.pull_into(&mut out, timing).then_some(out)
    }

    /// Run one callback into a caller-provided buffer.
    pub fn pull_into(&self, out: &mut [f32], timing: CallbackTiming) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_mut() {
            Some(stream) if stream.running => {
                (stream.render)(out, &timing);
                true
            }
            _ => false,
        }
    }

    pub fn stream_spec(&self) -> Option<StreamSpec> {
        self.slot.lock().as_ref().map(|s| s.spec)
    }

    pub fn is_running(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|s| s.running)
    }

    /// Number of streams opened so far.
    pub fn streams_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Make the next `open_stream` call fail.
    pub fn fail_next_open(&self) {
        self.fail_next_open.store(true, Ordering::Relaxed);
    }
}

impl AudioHost for OfflineHost {
    fn name(&self) -> &str {
        "offline"
    }

    fn devices(&self) -> Result<DeviceTable, HostError> {
        Ok(self.table.clone())
    }

    fn open_stream(
        &self,
        spec: &StreamSpec,
        render: RenderFn,
    ) -> Result<Box<dyn OutputStream>, HostError> {
        if self.fail_next_open.swap(false, Ordering::Relaxed) {
            return Err(HostError::StreamCreate("simulated failure".into()));
        }
        if self.table.get(spec.device).is_none() {
            return Err(HostError::DeviceUnavailable(spec.device));
        }
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(HostError::StreamCreate(
                "offline host already has an open stream".into(),
            ));
        }
        let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        *slot = Some(OfflineSlot {
            id,
            spec: *spec,
            render,
            running: false,
        });
        Ok(Box::new(OfflineStream {
            id,
            slot: self.slot.clone(),
        }))
    }
}

struct OfflineStream {
    id: u64,
    slot: Slot,
}

impl OfflineStream {
    fn set_running(&self, running: bool) {
        if let Some(stream) = self.slot.lock().as_mut().filter(|s| s.id == self.id) {
            stream.running = running;
        }
    }
}

impl OutputStream for OfflineStream {
    fn start(&mut self) -> Result<(), HostError> {
        self.set_running(true);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HostError> {
        self.set_running(false);
        Ok(())
    }
}

impl Drop for OfflineStream {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|s| s.id == self.id) {
            *slot = None;
        }
    }
}
