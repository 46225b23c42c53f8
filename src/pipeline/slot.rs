//! Shared session slot

use std::sync::{Arc, OnceLock};

use crate::live::LiveTransport;
use crate::{Error, Result};

/// Write-once cell holding the live session shared by every activity
///
/// The orchestrator binds it exactly once, after the transport handshake
/// completes; until then every reader sees `None` and must treat the
/// session as not ready. All readers observe the same `Arc`, never a copy
/// of the underlying connection.
pub struct SessionSlot {
    inner: OnceLock<Arc<dyn LiveTransport>>,
}

impl SessionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Bind the session
    ///
    /// # Errors
    ///
    /// Returns error if a session is already bound; at most one live
    /// session exists per pipeline run.
    pub fn bind(&self, session: Arc<dyn LiveTransport>) -> Result<()> {
        self.inner
            .set(session)
            .map_err(|_| Error::Session("session already bound".to_string()))
    }

    /// The bound session, or `None` while the handshake is outstanding
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn LiveTransport>> {
        self.inner.get().map(Arc::clone)
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}
