//! Single-flight and cancellation primitives
//!
//! At most one backup or restore runs at a time per [`FlightSlot`]. The slot
//! is claimed by [`FlightSlot::try_acquire`] and released when the returned
//! guard drops, on every exit path including panics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "operation in progress" flag
#[derive(Debug, Clone, Default)]
pub struct FlightSlot {
    busy: Arc<AtomicBool>,
}

impl FlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if an operation already holds it
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof that the current operation holds the slot
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Cooperative cancellation flag checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight() {
        let slot = FlightSlot::new();
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(slot.clone().try_acquire().is_none());

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let slot = FlightSlot::new();
        let worker_slot = slot.clone();
        let result = std::thread::spawn(move || {
            let _guard = worker_slot.try_acquire().unwrap();
            panic!("worker failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_cancellation_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
