//! Transport state shared between the control thread and the callback.
//!
//! The control thread arms and disarms; the callback only reads, and
//! disarms when a pass completes or rendering panics. No access takes a
//! lock, so neither side can block the other.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};

/// Pass id meaning "not armed".
const NOT_ARMED: u64 = 0;

/// A consistent view of the armed pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Armed {
    pub target_ns: i64,
    pub pass: u64,
}

#[derive(Debug)]
pub(crate) struct Transport {
    /// Id of the armed pass, or `NOT_ARMED`. Ids are never reused, so the
    /// callback can tell passes apart even when two of them share a
    /// target time.
    armed: AtomicU64,
    /// Target of the armed pass; written before its id is published.
    target_ns: AtomicI64,
    next_pass: AtomicU64,
    /// Last cursor published by the callback, for diagnostics.
    cursor: AtomicUsize,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            armed: AtomicU64::new(NOT_ARMED),
            target_ns: AtomicI64::new(0),
            next_pass: AtomicU64::new(NOT_ARMED),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Arm a new pass. Only the control thread calls this, and only while
    /// disarmed.
    pub fn arm(&self, target_ns: i64) {
        let pass = self.next_pass.fetch_add(1, Ordering::Relaxed) + 1;
        self.target_ns.store(target_ns, Ordering::Release);
        self.armed.store(pass, Ordering::Release);
    }

    /// Disarm from the control thread. Returns whether a pass was armed.
    pub fn disarm(&self) -> bool {
        let previous = self.armed.swap(NOT_ARMED, Ordering::AcqRel);
        self.cursor.store(0, Ordering::Relaxed);
        previous != NOT_ARMED
    }

    /// Disarm from the callback, unless the pass was replaced meanwhile.
    pub fn complete(&self, armed: Armed) -> bool {
        self.armed
            .compare_exchange(armed.pass, NOT_ARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire) != NOT_ARMED
    }

    pub fn target_ns(&self) -> Option<i64> {
        self.load().map(|a| a.target_ns)
    }

    /// Read the armed pass.
    ///
    /// Returns `None` when disarmed, and also when the pass changed during
    /// the read; the callback treats the latter as "not yet due".
    pub fn load(&self) -> Option<Armed> {
        let before = self.armed.load(Ordering::Acquire);
        if before == NOT_ARMED {
            return None;
        }
        let target_ns = self.target_ns.load(Ordering::Acquire);
        let after = self.armed.load(Ordering::Acquire);
        (before == after).then_some(Armed {
            target_ns,
            pass: before,
        })
    }

    pub fn publish_cursor(&self, cursor: usize) {
        self.cursor.store(cursor, Ordering::Relaxed);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}
