//! Cooperative progress reporting and cancellation
//!
//! Long-running passes accept an `impl ProgressMonitor` and poll it at
//! row-batch granularity. Use [`Unmonitored`] when neither progress nor
//! cancellation is needed.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Polled by long-running passes between row batches.
pub trait ProgressMonitor {
    /// Whether the caller asked the pass to stop
    fn is_cancelled(&self) -> bool;

    /// Report completion in percent (0-100)
    fn progress_to(&self, percent: u8);
}

/// Never cancels and discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmonitored;

impl ProgressMonitor for Unmonitored {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }

    #[inline]
    fn progress_to(&self, _percent: u8) {}
}

/// Cancellation flag that can be shared with another thread.
///
/// The last reported percentage is kept so a UI can poll it.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    percent: AtomicU8,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running pass to stop at its next poll
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Last percentage reported by the pass
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }
}

impl ProgressMonitor for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn progress_to(&self, percent: u8) {
        self.percent.store(percent.min(100), Ordering::Relaxed);
    }
}

impl<P: ProgressMonitor + ?Sized> ProgressMonitor for &P {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }

    fn progress_to(&self, percent: u8) {
        (**self).progress_to(percent)
    }
}

/// Percentage of `done` out of `total`, clamped to 0-100
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((100 * done.min(total)) / total) as u8
}
