//! Cooperative cancellation and progress reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Percentage step between progress reports.
pub const PROGRESS_STEP: u8 = 5;

/// What a long-running operation can ask its caller while it works.
pub trait ProgressContext {
    /// `false` once the caller wants the operation to stop early.
    fn is_running(&self) -> bool {
        true
    }

    /// Completed percentage, reported in [`PROGRESS_STEP`] increments.
    fn progress(&self, percent: u8) {
        let _ = percent;
    }
}

/// Context that never cancels and ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserved;

impl ProgressContext for Unobserved {}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl ProgressContext for CancelToken {
    fn is_running(&self) -> bool {
        !self.is_cancelled()
    }
}

/// How a cancellable operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Cancelled,
}

/// Emits a report each time a row loop crosses another [`PROGRESS_STEP`].
pub(crate) struct ProgressTicker {
    total: usize,
    last: u8,
}

impl ProgressTicker {
    pub(crate) fn new(total: usize) -> Self {
        Self { total, last: 0 }
    }

    pub(crate) fn tick(&mut self, done: usize, ctx: &(impl ProgressContext + ?Sized)) {
        if self.total == 0 {
            return;
        }
        let percent = (done.min(self.total) * 100 / self.total) as u8;
        let stepped = percent - percent % PROGRESS_STEP;
        if stepped > self.last {
            self.last = stepped;
            ctx.progress(stepped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<u8>>);

    impl ProgressContext for Recorder {
        fn progress(&self, percent: u8) {
            self.0.borrow_mut().push(percent);
        }
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(clone.is_running());
        token.cancel();
        assert!(!clone.is_running());
    }

    #[test]
    fn test_ticker_reports_in_steps() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        let mut ticker = ProgressTicker::new(7);
        for row in 1..=7 {
            ticker.tick(row, &recorder);
        }
        let reports = recorder.0.into_inner();
        assert_eq!(reports.last(), Some(&100));
        assert!(reports.iter().all(|p| p % PROGRESS_STEP == 0));
        assert!(reports.windows(2).all(|w| w[0] < w[1]));
    }
}
