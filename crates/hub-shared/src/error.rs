use thiserror::Error;

/// Failures reported by the persistence service.
///
/// Every variant carries the store's own message so it can be surfaced to
/// the user unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Function call failed: {0}")]
    Function(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    /// The service answered, but with a row the client cannot decode.
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Outcome of a command that did not succeed.
///
/// Commands never panic or retry; callers decide whether to show the
/// message and allow resubmission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No owner id is available. Never retried automatically.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// Malformed command input. No remote effect was attempted.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Remote(#[from] BackendError),

    /// Target absent, or owned by someone else.
    #[error("Record not found")]
    NotFound,
}

impl CommandError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Whether the failure happened before anything was sent to the backend.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_store_message() {
        let err: CommandError = BackendError::Mutation("duplicate key".into()).into();
        assert_eq!(err.to_string(), "Mutation failed: duplicate key");
        assert!(!err.is_local());
    }

    #[test]
    fn validation_message_is_shown_as_is() {
        let err = CommandError::validation("Please select a platform");
        assert_eq!(err.to_string(), "Please select a platform");
        assert!(err.is_local());
    }
}
