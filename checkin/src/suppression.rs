//! Scoped suppression of sync propagation.
//!
//! While at least one [`SuppressionGuard`] is alive, the sync engine ignores
//! store notifications. Guards nest and release on drop, so an early return
//! or `?` inside a suppressed block can never leave sync switched off.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared suppression counter.
///
/// Cloning shares the counter: the sync engine, clone manager and resolution
/// engine built from one service all see the same suppression state.
#[derive(Debug, Clone, Default)]
pub struct SyncSuppressor {
    depth: Arc<AtomicUsize>,
}

impl SyncSuppressor {
    /// Create a suppressor with nothing suppressed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress sync until the returned guard is dropped
    #[must_use = "sync is only suppressed while the guard is alive"]
    pub fn suppress(&self) -> SuppressionGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        SuppressionGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    /// Whether any guard is alive
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

/// Keeps sync suppressed while alive.
#[derive(Debug)]
pub struct SuppressionGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest() {
        let suppressor = SyncSuppressor::new();
        assert!(!suppressor.is_suppressed());

        let outer = suppressor.suppress();
        {
            let _inner = suppressor.clone().suppress();
            assert!(suppressor.is_suppressed());
        }
        assert!(suppressor.is_suppressed());

        drop(outer);
        assert!(!suppressor.is_suppressed());
    }

    #[test]
    fn early_return_releases_guard() {
        fn fails(suppressor: &SyncSuppressor) -> Result<(), &'static str> {
            let _guard = suppressor.suppress();
            let outcome: Result<(), &'static str> = Err("boom");
            outcome?;
            Ok(())
        }

        let suppressor = SyncSuppressor::new();
        assert!(fails(&suppressor).is_err());
        assert!(!suppressor.is_suppressed());
    }
}
