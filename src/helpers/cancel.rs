use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DirectoryError, Result};

/// Shared flag checked by the drivers before every request and every sleep.
///
/// Cancelling never interrupts a call already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DirectoryError::Cancelled);
        }
        Ok(())
    }
}
