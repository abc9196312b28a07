//! Cooperative cancellation and wall-clock budgets.
//!
//! Every pipeline stage consults [`RunControl::checkpoint`] at its outer loop
//! boundaries (grid row, contour level, panel candidate). On cancellation or
//! expiry the stage returns early and no partial result is emitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;

/// Shared cancellation flag plus an optional deadline. Cloning shares the
/// flag, so a caller may keep one clone and cancel a stage mid-flight from
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RunControl {
    /// A control that never cancels and never times out.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A control that expires `budget` from now.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + budget),
        }
    }

    /// Request cancellation. Takes effect at the next checkpoint.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Err([`Error::Cancelled`]) once `cancel` was called, Err([`Error::Timeout`])
    /// once the deadline passed, Ok otherwise.
    pub fn checkpoint(&self) -> Result<(), Error> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_trips() {
        let ctl = RunControl::unbounded();
        for _ in 0..1000 {
            assert!(ctl.checkpoint().is_ok());
        }
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let ctl = RunControl::unbounded();
        let observer = ctl.clone();
        ctl.cancel();
        assert_eq!(observer.checkpoint(), Err(Error::Cancelled));
    }

    #[test]
    fn expired_budget_reports_timeout() {
        let ctl = RunControl::with_budget(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(ctl.checkpoint(), Err(Error::Timeout));
    }

    #[test]
    fn cancellation_wins_over_timeout() {
        let ctl = RunControl::with_budget(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        ctl.cancel();
        assert_eq!(ctl.checkpoint(), Err(Error::Cancelled));
    }
}
