//! Command Gateway.
//!
//! Each sub-module groups related commands by domain. Every command takes
//! the [`HubClient`](crate::HubClient) and the current owner explicitly,
//! checks its input before touching the backend, and reports failure as a
//! [`CommandError`] instead of panicking or retrying.

pub mod accounts;
pub mod analytics;
pub mod comments;
pub mod followers;
pub mod scheduling;

use hub_shared::{CommandError, OwnerId};

/// Fail with `NotAuthenticated` when there is no owner id.
pub(crate) fn require_owner(owner: Option<&OwnerId>) -> Result<&OwnerId, CommandError> {
    owner.ok_or(CommandError::NotAuthenticated)
}

/// Log a failed command at `warn`.
pub(crate) fn logged<T>(command: &'static str, result: Result<T, CommandError>) -> Result<T, CommandError> {
    if let Err(e) = &result {
        tracing::warn!(command, error = %e, "command failed");
    }
    result
}
