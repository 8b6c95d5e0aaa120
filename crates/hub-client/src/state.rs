//! Authenticated session state.
//!
//! Authentication itself belongs to the backend service. The core only needs
//! the resulting owner id, which is read from here and passed explicitly into
//! every view and command.

use hub_shared::OwnerId;

#[derive(Debug, Clone, Default)]
pub struct Session {
    owner: Option<OwnerId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(owner: OwnerId) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn sign_in(&mut self, owner: OwnerId) {
        tracing::info!(owner = %owner, "session started");
        self.owner = Some(owner);
    }

    pub fn sign_out(&mut self) {
        if let Some(owner) = self.owner.take() {
            tracing::info!(owner = %owner, "session ended");
        }
    }

    /// The owner id to thread into operations; `None` when signed out.
    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }
}
