//! Cooperative cancellation for query round-trips.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CounterBucketError, Result};

/// Caller-supplied context passed to every query call.
///
/// A context is cheap to clone; all clones observe the same cancellation
/// flag. Cancellation is checked before each query is issued, so an
/// in-flight aggregation stops at the next round-trip.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

/// Handle used to cancel a [`Context`], possibly from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context that is never cancelled unless a handle asks for it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a handle that cancels this context and all its clones.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`CounterBucketError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CounterBucketError::Cancelled);
        }
        Ok(())
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
