//! Single-slot request gate.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

/// Admits at most one in-flight request of a given class.
///
/// A second caller is refused rather than queued. The slot is freed when the
/// returned [`GateGuard`] drops, so every exit path releases it.
#[derive(Debug, Default)]
pub struct RequestGate {
    name: &'static str,
    held: AtomicBool,
}

impl RequestGate {
    /// Creates an open gate.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            held: AtomicBool::new(false),
        }
    }

    /// Takes the slot, or returns `None` if a request already holds it.
    #[instrument(skip(self), fields(gate = self.name))]
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        match self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!("Gate acquired");
                Some(GateGuard { gate: self })
            }
            Err(_) => {
                debug!("Gate busy");
                None
            }
        }
    }

    /// Whether a request currently holds the slot.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of holding a [`RequestGate`]. Releases on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a RequestGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.held.store(false, Ordering::Release);
        debug!(gate = self.gate.name, "Gate released");
    }
}
