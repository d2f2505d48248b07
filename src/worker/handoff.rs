//! Single-slot, overwrite-on-send handoff between the producer and a consumer.
//!
//! `send` replaces whatever the slot holds and never waits for the reader;
//! `try_receive` takes the latest value. A consumer slower than the producer
//! skips values, it never sees a partially written one.
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Handoff<T> {
    slot: Mutex<Option<T>>,
    sent: AtomicU64,
    overwritten: AtomicU64,
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            sent: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    /// Publish `value`; returns true when an unread value was replaced.
    pub fn send(&self, value: T) -> bool {
        let replaced = self.slot.lock().replace(value).is_some();
        self.sent.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    pub fn try_receive(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn has_value(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Values dropped because the consumer did not read them in time.
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

/// An artifact stamped with the producer state it was built in.
#[derive(Clone, Debug, PartialEq)]
pub struct Published<T> {
    /// Pipeline cycle that produced the value.
    pub cycle: u64,
    /// Number of filter actions applied before this cycle.
    pub epoch: u64,
    /// Stabilized flag at the end of the cycle.
    pub stabilized: bool,
    pub value: T,
}
