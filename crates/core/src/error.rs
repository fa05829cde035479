use thiserror::Error;

use crate::company::CompanyStatus;
use crate::status::StatusAction;

/// Errors produced by the core domain types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An operator action is not permitted from the current status.
    #[error("invalid status transition: {from} -> {action}")]
    InvalidTransition {
        from: CompanyStatus,
        action: StatusAction,
    },

    /// A stage tag outside the closed set.
    #[error("unknown check: {0}")]
    UnknownCheck(String),

    /// An operator action token outside the closed set.
    #[error("unknown status action: {0}")]
    UnknownAction(String),

    /// A status spelling outside the normalized set (legacy values included).
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_display() {
        let err = CoreError::InvalidTransition {
            from: CompanyStatus::Fraudulent,
            action: StatusAction::Approve,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: fraudulent -> approve"
        );
    }
}
