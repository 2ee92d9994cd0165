use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{BackendError, BackendResult};

/// Cooperative cancellation signal shared between a caller and the pipeline.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// A token that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Work in flight finishes; the next check fails.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`BackendError::Cancelled`] once the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Cancelled`] after [`Cancellation::cancel`].
    pub fn check(&self) -> BackendResult<()> {
        if self.is_cancelled() {
            Err(BackendError::Cancelled)
        } else {
            Ok(())
        }
    }
}
