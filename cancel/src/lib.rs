#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Raised when an operation observes a cancelled token.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Cooperative cancellation flag checked at coarse operation boundaries.
///
/// Cloning shares the underlying flag, so a token handed to a long-running
/// operation can be cancelled from the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` once `cancel` has been called.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_check() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancelled_token_fails_check_on_all_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert_eq!(clone.check(), Err(Cancelled));
        assert!(token.is_cancelled());
    }
}
