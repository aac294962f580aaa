//! Cooperative cancellation for in-flight aggregations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Error returned by the cancellable aggregation entry points when the token
/// fires before the result is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("aggregation cancelled before completion")]
pub struct Cancelled;

/// Shared cancellation token.
///
/// Clones observe the same state. The merge-driving producer polls the token
/// once per merge step: after it fires, no new task is submitted, in-flight
/// tasks drain, and the partial result is discarded.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<TokenState>,
}

#[derive(Debug)]
struct TokenState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that fires only through [`cancel`](CancelToken::cancel).
    pub fn new() -> CancelToken {
        CancelToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline: None,
            }),
        }
    }

    /// A token that also fires once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> CancelToken {
        CancelToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self
                .inner
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}
