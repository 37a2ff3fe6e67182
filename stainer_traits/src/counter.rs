//! Interrupt-fed step counter shared between a pulse source and the motion engine.
//!
//! The producer side (a GPIO interrupt, a simulator) only ever calls
//! [`StepCounter::pulse`]. The consumer resets the counter when it starts a
//! bounded move and afterwards only reads and compares; it never writes a
//! value derived from a read, so a pulse landing between two polls is never
//! lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct StepCounter {
    count: Arc<AtomicU64>,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side: one pulse observed.
    #[inline]
    pub fn pulse(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Current pulse count since the last reset.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Consumer side: start counting a new move from zero.
    #[inline]
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }

    /// True once at least `target` pulses were seen since the last reset.
    #[inline]
    pub fn reached(&self, target: u64) -> bool {
        self.count() >= target
    }
}
