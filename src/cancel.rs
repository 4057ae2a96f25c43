use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle shared between a host and an in-progress
/// alignment call.
///
/// Polled at pass boundaries, between anchored sub-alignments, and every
/// `row_check_interval` rows of a DTW forward sweep. Cloning is cheap and
/// all clones observe the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Default number of cost-matrix rows processed between cooperative
/// cancellation checks inside the DTW forward sweep.
pub const DEFAULT_ROW_CHECK_INTERVAL: usize = 256;
