// Cooperative cancellation for in-flight requests

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ApiError;

/// Cloneable cancellation handle. All clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for only errors if it is dropped
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Race `fut` against this token.
    ///
    /// A cancelled operation reports `CANCELLED` to its caller only; the
    /// stores do not copy it into their `error` field.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if self.is_cancelled() {
            return Err(ApiError::cancelled());
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ApiError::cancelled()),
            result = fut => result,
        }
    }
}
