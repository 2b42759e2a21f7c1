//! Push-style consumption of query results.

use crate::error::QueryError;
use crate::query::results::Row;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives the rows of one query execution.
///
/// Rows arrive through `on_next` in order. The stream then ends with exactly
/// one of `on_error` or `on_complete`, unless the subscriber cancelled first,
/// in which case neither is called.
pub trait Subscriber {
    /// Called once before any row, with the handle used to cancel.
    fn on_subscribe(&mut self, _subscription: Subscription) {}

    fn on_next(&mut self, row: Row);

    fn on_error(&mut self, error: QueryError);

    fn on_complete(&mut self);
}

/// Cancellation handle for one execution.
///
/// Cancellation is cooperative: it is observed between rows and before each
/// window, never in the middle of a fetch.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop receiving rows.
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
    fn test_cancel_is_shared_between_clones() {
        let subscription = Subscription::new();
        let handle = subscription.clone();
        assert!(!subscription.is_cancelled());

        handle.cancel();
        assert!(subscription.is_cancelled());
    }
}
