use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// All variants are terminal for the request that raised them: every guard
/// is evaluated before any mutation, so a failed call leaves no partial
/// state and the caller must resubmit.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Governor not initialised yet")]
    GovernorNotInitialised,

    #[error("Invalid vote threshold, must be between 0 and 100")]
    InvalidVoteThreshold,

    #[error("Invalid timelock delay, must be positive")]
    InvalidTimelockDelay,

    #[error("Invalid instructions: instruction list cannot be empty")]
    InvalidInstructions,

    #[error("Invalid voting period, must be positive")]
    InvalidVotingPeriod,

    #[error("Unauthorised voter")]
    UnauthorisedVoter,

    #[error("Unauthorised to cancel proposal")]
    UnauthorisedCancellation,

    #[error("Invalid state transition")]
    InvalidStateTransition,

    #[error("Voting period still active")]
    VotingPeriodActive,

    #[error("Numerical overflow occurred")]
    NumericalOverflow,

    #[error("Timelock not expired")]
    TimelockNotExpired,

    #[error("Invalid lock parameters (amount/duration)")]
    InvalidLockParameters,

    #[error("Insufficient token balance")]
    InsufficientBalance,

    #[error("Lock period has not expired")]
    LockNotExpired,

    #[error("Tokens have already been withdrawn")]
    AlreadyWithdrawn,

    #[error("Record at the derived address has never been created")]
    AccountNotInitialized,

    #[error("Record at the derived address already exists")]
    AccountAlreadyInUse,

    #[error("Required approver's approval is missing")]
    SignatureVerificationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::InvalidVoteThreshold;
        assert!(err.to_string().contains("0 and 100"));
    }

    #[test]
    fn test_errors_comparable() {
        assert_eq!(
            GovernanceError::LockNotExpired,
            GovernanceError::LockNotExpired
        );
        assert_ne!(
            GovernanceError::LockNotExpired,
            GovernanceError::AlreadyWithdrawn
        );
    }
}
