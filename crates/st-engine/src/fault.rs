//! Faults raised inside the audio callback.
//!
//! The callback never returns an error; it writes silence and pushes a
//! fault onto a bounded lock-free queue that the control thread drains.

use std::fmt;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Slots in the fault queue. Faults beyond this are dropped until the
/// control thread drains the queue.
pub const FAULT_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtFault {
    /// Rendering panicked; the buffer was replaced with silence.
    Panicked,
    /// The host handed over a buffer that is not a whole number of frames.
    MisalignedOutput { samples: usize, channels: u16 },
}

impl fmt::Display for RtFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtFault::Panicked => write!(f, "audio callback panicked; output silenced"),
            RtFault::MisalignedOutput { samples, channels } => write!(
                f,
                "output buffer of {} samples is not a multiple of {} channels; output silenced",
                samples, channels
            ),
        }
    }
}

/// Callback side of the fault queue.
pub(crate) struct FaultSender(HeapProd<RtFault>);

impl FaultSender {
    pub fn report(&mut self, fault: RtFault) {
        // Full queue: drop the fault rather than block
        let _ = self.0.try_push(fault);
    }
}

/// Control side of the fault queue.
pub(crate) struct FaultReceiver(HeapCons<RtFault>);

impl FaultReceiver {
    pub fn drain(&mut self, into: &mut Vec<RtFault>) {
        while let Some(fault) = self.0.try_pop() {
            into.push(fault);
        }
    }
}

pub(crate) fn fault_queue() -> (FaultSender, FaultReceiver) {
    let (prod, cons) = HeapRb::<RtFault>::new(FAULT_CAPACITY).split();
    (FaultSender(prod), FaultReceiver(cons))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_arrive_in_order() {
        let (mut tx, mut rx) = fault_queue();
        tx.report(RtFault::Panicked);
        tx.report(RtFault::MisalignedOutput { samples: 3, channels: 2 });
        let mut out = Vec::new();
        rx.drain(&mut out);
        assert_eq!(
            out,
            vec![RtFault::Panicked, RtFault::MisalignedOutput { samples: 3, channels: 2 }]
        );
    }

    #[test]
    fn overflow_drops_newest() {
        let (mut tx, mut rx) = fault_queue();
        for _ in 0..FAULT_CAPACITY + 10 {
            tx.report(RtFault::Panicked);
        }
        let mut out = Vec::new();
        rx.drain(&mut out);
        assert_eq!(out.len(), FAULT_CAPACITY);
    }
}
