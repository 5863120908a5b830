//! Token locks backing voting weight with a verifiable holding period.
//!
//! A `LockAccount` records tokens moved into the governor's escrow for a
//! fixed duration. Records are never deleted, only marked withdrawn; the
//! `withdrawn` flag is the sole idempotence guard, and the escrow balance
//! invariant (escrow = sum of unwithdrawn amounts) depends on it.
//!
//! A `Locker` is an optional per-governor policy record bounding escrow
//! durations and scaling lock amounts into voting power.

use conclave_types::{Address, RecordKey};
use crate::error::GovernanceError;

/// One token-custody record per lock.
#[derive(Debug, Clone)]
pub struct LockAccount {
    /// Governor whose escrow holds the tokens
    pub governor: RecordKey,
    /// Owning user identity
    pub user: Address,
    /// Caller-chosen id, unique per (governor, user) by address derivation
    pub lock_id: u64,
    /// Tokens held in escrow
    pub amount: u64,
    /// Holding period in seconds
    pub duration: u64,
    /// Unix time of creation
    pub created_at: u64,
    /// Unix time withdrawal becomes possible
    pub unlocks_at: u64,
    /// Set once by withdrawal; never cleared
    pub withdrawn: bool,
}

impl LockAccount {
    /// Create a new lock.
    ///
    /// # Errors
    /// - `InvalidLockParameters` if `amount == 0` or `duration == 0`
    /// - `NumericalOverflow` if `created_at + duration` overflows
    pub fn new(
        governor: RecordKey,
        user: Address,
        lock_id: u64,
        amount: u64,
        duration: u64,
        now: u64,
    ) -> Result<Self, GovernanceError> {
        if amount == 0 || duration == 0 {
            return Err(GovernanceError::InvalidLockParameters);
        }
        let unlocks_at = now
            .checked_add(duration)
            .ok_or(GovernanceError::NumericalOverflow)?;

        Ok(Self {
            governor,
            user,
            lock_id,
            amount,
            duration,
            created_at: now,
            unlocks_at,
            withdrawn: false,
        })
    }

    /// Check if the holding period has elapsed.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.unlocks_at
    }
}

/// Per-governor lock policy record.
#[derive(Debug, Clone)]
pub struct Locker {
    /// Governor this policy belongs to
    pub governor: RecordKey,
    /// Identity allowed to change the policy
    pub authority: Address,
    /// Scales escrowed amounts into voting power
    pub voting_power_multiplier: u64,
    /// Minimum escrow duration in seconds
    pub min_lock_duration: u64,
    /// Maximum escrow duration in seconds
    pub max_lock_duration: u64,
    /// Running total of tokens escrowed through this locker
    pub total_locked: u64,
}

impl Locker {
    /// Create a new locker policy.
    ///
    /// # Errors
    /// - `InvalidLockParameters` if `max_lock_duration < min_lock_duration`
    pub fn new(
        governor: RecordKey,
        authority: Address,
        voting_power_multiplier: u64,
        min_lock_duration: u64,
        max_lock_duration: u64,
    ) -> Result<Self, GovernanceError> {
        if max_lock_duration < min_lock_duration {
            return Err(GovernanceError::InvalidLockParameters);
        }

        Ok(Self {
            governor,
            authority,
            voting_power_multiplier,
            min_lock_duration,
            max_lock_duration,
            total_locked: 0,
        })
    }

    /// Replace the policy parameters.
    pub fn set_params(
        &mut self,
        voting_power_multiplier: u64,
        min_lock_duration: u64,
        max_lock_duration: u64,
    ) -> Result<(), GovernanceError> {
        if max_lock_duration < min_lock_duration {
            return Err(GovernanceError::InvalidLockParameters);
        }

        self.voting_power_multiplier = voting_power_multiplier;
        self.min_lock_duration = min_lock_duration;
        self.max_lock_duration = max_lock_duration;
        Ok(())
    }

    /// Check a requested escrow duration against the policy bounds.
    pub fn duration_in_bounds(&self, duration: u64) -> bool {
        duration >= self.min_lock_duration && duration <= self.max_lock_duration
    }

    /// Voting power granted by an escrowed amount.
    pub fn voting_power(&self, amount: u64) -> Result<u64, GovernanceError> {
        amount
            .checked_mul(self.voting_power_multiplier)
            .ok_or(GovernanceError::NumericalOverflow)
    }
}

/// An escrow record created under a locker policy.
#[derive(Debug, Clone)]
pub struct EscrowAccount {
    /// Owning user identity
    pub user: Address,
    /// Locker policy this escrow was created under
    pub locker: RecordKey,
    /// Caller-chosen id, unique per (locker, user) by address derivation
    pub escrow_id: u64,
    /// Tokens held in escrow
    pub amount: u64,
    /// Holding period in seconds
    pub duration: u64,
    /// Unix time of creation
    pub created_at: u64,
    /// Unix time the holding period elapses
    pub unlocks_at: u64,
    pub withdrawn: bool,
}

impl EscrowAccount {
    /// Create a new escrow record; duration bounds are the caller's business.
    pub fn new(
        user: Address,
        locker: RecordKey,
        escrow_id: u64,
        amount: u64,
        duration: u64,
        now: u64,
    ) -> Result<Self, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::InvalidLockParameters);
        }
        let unlocks_at = now
            .checked_add(duration)
            .ok_or(GovernanceError::NumericalOverflow)?;

        Ok(Self {
            user,
            locker,
            escrow_id,
            amount,
            duration,
            created_at: now,
            unlocks_at,
            withdrawn: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_lock_creation() {
        let lock = LockAccount::new(RecordKey::ZERO, addr(1), 1, 100, 5, 1_000).unwrap();
        assert_eq!(lock.amount, 100);
        assert_eq!(lock.created_at, 1_000);
        assert_eq!(lock.unlocks_at, 1_005);
        assert!(!lock.withdrawn);
    }

    #[test]
    fn test_lock_invalid_parameters() {
        assert_eq!(
            LockAccount::new(RecordKey::ZERO, addr(1), 1, 0, 5, 1_000).unwrap_err(),
            GovernanceError::InvalidLockParameters
        );
        assert_eq!(
            LockAccount::new(RecordKey::ZERO, addr(1), 1, 100, 0, 1_000).unwrap_err(),
            GovernanceError::InvalidLockParameters
        );
    }

    #[test]
    fn test_lock_unlock_time_overflow() {
        assert_eq!(
            LockAccount::new(RecordKey::ZERO, addr(1), 1, 100, u64::MAX, 2).unwrap_err(),
            GovernanceError::NumericalOverflow
        );
    }

    #[test]
    fn test_lock_expiration() {
        let lock = LockAccount::new(RecordKey::ZERO, addr(1), 1, 100, 5, 1_000).unwrap();
        assert!(!lock.is_expired(1_000));
        assert!(!lock.is_expired(1_004));
        assert!(lock.is_expired(1_005));
        assert!(lock.is_expired(2_000));
    }

    #[test]
    fn test_locker_bounds() {
        let locker = Locker::new(RecordKey::ZERO, addr(1), 2, 10, 100).unwrap();
        assert!(!locker.duration_in_bounds(9));
        assert!(locker.duration_in_bounds(10));
        assert!(locker.duration_in_bounds(100));
        assert!(!locker.duration_in_bounds(101));

        assert_eq!(
            Locker::new(RecordKey::ZERO, addr(1), 2, 100, 10).unwrap_err(),
            GovernanceError::InvalidLockParameters
        );
    }

    #[test]
    fn test_locker_set_params() {
        let mut locker = Locker::new(RecordKey::ZERO, addr(1), 2, 10, 100).unwrap();
        locker.set_params(3, 5, 50).unwrap();
        assert_eq!(locker.voting_power_multiplier, 3);
        assert_eq!(locker.min_lock_duration, 5);

        assert_eq!(
            locker.set_params(3, 50, 5).unwrap_err(),
            GovernanceError::InvalidLockParameters
        );
        // Rejected update leaves the old params in place
        assert_eq!(locker.min_lock_duration, 5);
    }

    #[test]
    fn test_locker_voting_power() {
        let locker = Locker::new(RecordKey::ZERO, addr(1), 4, 0, 100).unwrap();
        assert_eq!(locker.voting_power(25).unwrap(), 100);
        assert_eq!(
            locker.voting_power(u64::MAX).unwrap_err(),
            GovernanceError::NumericalOverflow
        );
    }

    #[test]
    fn test_escrow_creation() {
        let escrow = EscrowAccount::new(addr(1), RecordKey::ZERO, 7, 100, 50, 1_000).unwrap();
        assert_eq!(escrow.unlocks_at, 1_050);
        assert!(!escrow.withdrawn);

        assert_eq!(
            EscrowAccount::new(addr(1), RecordKey::ZERO, 7, 0, 50, 1_000).unwrap_err(),
            GovernanceError::InvalidLockParameters
        );
    }
}
