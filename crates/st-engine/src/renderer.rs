//! The real-time render path.
//!
//! A [`Renderer`] lives inside the stream callback. On each invocation
//! it decides, from the armed target time, the clock and the host's
//! output latency, whether to write silence or the next frames of the
//! bound buffer. It never locks, allocates or logs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use st_signal::SignalBuffer;

use crate::clock::Clock;
use crate::fault::{FaultSender, RtFault};
use crate::host::CallbackTiming;
use crate::state::Transport;

/// What a single callback invocation did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenderStatus {
    /// Not armed; silence.
    Idle,
    /// Armed but the target time has not been reached; silence.
    Waiting,
    /// Wrote signal frames; more remain.
    Playing,
    /// Wrote the last frames of the buffer (padded with silence) and
    /// returned to idle.
    Completed,
    /// Rendering failed; silence, and a fault was queued.
    Faulted,
}

pub(crate) struct Renderer {
    buffer: Arc<SignalBuffer>,
    transport: Arc<Transport>,
    clock: Arc<dyn Clock>,
    faults: FaultSender,
    /// Next frame to emit in the current pass.
    cursor: usize,
    /// Pass the cursor belongs to.
    pass: u64,
}

impl Renderer {
    pub(crate) fn new(
        buffer: Arc<SignalBuffer>,
        transport: Arc<Transport>,
        clock: Arc<dyn Clock>,
        faults: FaultSender,
    ) -> Self {
        Self {
            buffer,
            transport,
            clock,
            faults,
            cursor: 0,
            pass: 0,
        }
    }

    /// Callback entry point. A panic silences the block and disarms the
    /// pass; with the `alloc_check` feature, allocating aborts in debug
    /// builds.
    pub(crate) fn process(&mut self, out: &mut [f32], timing: &CallbackTiming) -> RenderStatus {
        #[cfg(all(feature = "alloc_check", debug_assertions))]
        {
            assert_no_alloc::assert_no_alloc(|| self.guarded(out, timing))
        }
        #[cfg(not(all(feature = "alloc_check", debug_assertions)))]
        {
            self.guarded(out, timing)
        }
    }

    fn guarded(&mut self, out: &mut [f32], timing: &CallbackTiming) -> RenderStatus {
        match panic::catch_unwind(AssertUnwindSafe(|| self.render(out, timing))) {
            Ok(status) => status,
            Err(_) => {
                // the pass is abandoned, never replayed
                out.fill(0.0);
                self.cursor = 0;
                self.transport.disarm();
                self.faults.report(RtFault::Panicked);
                RenderStatus::Faulted
            }
        }
    }

    /// Fill `out` (interleaved, `channels` samples per frame) for one
    /// callback invocation.
    pub(crate) fn render(&mut self, out: &mut [f32], timing: &CallbackTiming) -> RenderStatus {
        let channels = self.buffer.channels();
        if out.len() % channels as usize != 0 {
            out.fill(0.0);
            self.faults.report(RtFault::MisalignedOutput {
                samples: out.len(),
                channels,
            });
            return RenderStatus::Faulted;
        }

        let Some(armed) = self.transport.load() else {
            out.fill(0.0);
            if self.transport.is_armed() {
                // an arm landed mid-read; pick it up next callback
                return RenderStatus::Waiting;
            }
            if self.cursor != 0 {
                self.cursor = 0;
                self.transport.publish_cursor(0);
            }
            return RenderStatus::Idle;
        };
        if armed.pass != self.pass {
            self.pass = armed.pass;
            self.cursor = 0;
        }

        let due = self
            .clock
            .get_time_ns()
            .saturating_add(timing.output_latency_ns());
        if due < armed.target_ns {
            out.fill(0.0);
            return RenderStatus::Waiting;
        }

        let src = self.buffer.samples_from(self.cursor);
        if src.len() > out.len() {
            out.copy_from_slice(&src[..out.len()]);
            self.cursor += out.len() / channels as usize;
            self.transport.publish_cursor(self.cursor);
            RenderStatus::Playing
        } else {
            let (head, tail) = out.split_at_mut(src.len());
            head.copy_from_slice(src);
            tail.fill(0.0);
            self.cursor = 0;
            self.transport.publish_cursor(0);
            self.transport.complete(armed);
            RenderStatus::Completed
        }
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }
}
