use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::GraphError;

/// Cooperative cancellation flag shared between a driver and the store,
/// linker, and oracle operations it invokes.
///
/// Store implementations check the token at operation entry; long-running
/// passes check it between items. Cancellation surfaces as
/// [`GraphError::Cancelled`] and is propagated verbatim.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe the flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Err(GraphError::Cancelled)` once cancellation is requested.
    pub fn check(&self) -> Result<(), GraphError> {
        if self.is_cancelled() {
            Err(GraphError::Cancelled)
        } else {
            Ok(())
        }
    }
}
