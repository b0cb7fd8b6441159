//! Cancellation token system for renders and timers
//!
//! Provides cancellation tokens that let in-flight work be stopped
//! cooperatively. Holders can poll `is_cancelled()` from blocking code or
//! await `cancelled()` from async code.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;

use crate::TimerId;

/// Cancellation token for cooperative cancellation
///
/// Multiple tokens can share the same underlying cancellation state via
/// `clone()`. Cancellation is fire-and-forget: `cancel()` never waits for
/// the cancelled work to observe it.
///
/// # Example
///
/// ```
/// use kiosk_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenState::default()),
        }
    }

    /// Cancel this token
    ///
    /// All clones observe the cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry associating timer ids with their cancellation tokens.
///
/// # Example
///
/// ```
/// use kiosk_scheduler::CancellationRegistry;
///
/// let registry = CancellationRegistry::new();
/// let token = registry.register(1);
///
/// registry.cancel(1);
/// assert!(token.is_cancelled());
/// ```
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<TimerId, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an id and return its token.
    pub fn register(&self, id: TimerId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().insert(id, token.clone());
        token
    }

    /// Cancel and forget the token for `id`. Returns `true` if it was registered.
    pub fn cancel(&self, id: TimerId) -> bool {
        match self.tokens.lock().remove(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and forget every registered token, returning how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.tokens.lock().drain().collect();
        for (_, token) in &drained {
            token.cancel();
        }
        drained.len()
    }

    pub fn get(&self, id: TimerId) -> Option<CancellationToken> {
        self.tokens.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}
