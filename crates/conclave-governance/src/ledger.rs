//! In-memory token ledger.
//!
//! Stands in for the external fungible-token transfer primitive: user
//! balances plus one escrow balance per governor. Both legs of a transfer
//! are validated before either is applied, so a failed transfer moves
//! nothing.

use std::collections::HashMap;
use conclave_types::{Address, RecordKey};
use crate::error::GovernanceError;

/// Token balances keyed by identity, escrow balances keyed by governor.
#[derive(Debug, Default)]
pub struct TokenLedger {
    balances: HashMap<Address, u64>,
    escrows: HashMap<RecordKey, u64>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an identity's balance.
    pub fn balance_of(&self, identity: &Address) -> u64 {
        self.balances.get(identity).copied().unwrap_or(0)
    }

    /// Get a governor's escrow balance.
    pub fn escrow_balance(&self, governor: &RecordKey) -> u64 {
        self.escrows.get(governor).copied().unwrap_or(0)
    }

    /// Mint tokens to an identity (test setup / faucet path).
    pub fn credit(&mut self, identity: Address, amount: u64) -> Result<(), GovernanceError> {
        let balance = self.balances.entry(identity).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(GovernanceError::NumericalOverflow)?;
        Ok(())
    }

    /// Move `amount` from a user's balance into a governor's escrow.
    ///
    /// # Errors
    /// - `InsufficientBalance` if the user holds less than `amount`
    /// - `NumericalOverflow` if the escrow balance would overflow
    pub fn transfer_to_escrow(
        &mut self,
        user: &Address,
        governor: &RecordKey,
        amount: u64,
    ) -> Result<(), GovernanceError> {
        let balance = self.balance_of(user);
        let debited = balance
            .checked_sub(amount)
            .ok_or(GovernanceError::InsufficientBalance)?;
        let credited = self
            .escrow_balance(governor)
            .checked_add(amount)
            .ok_or(GovernanceError::NumericalOverflow)?;

        self.balances.insert(*user, debited);
        self.escrows.insert(*governor, credited);
        Ok(())
    }

    /// Move `amount` from a governor's escrow back to a user's balance.
    pub fn transfer_from_escrow(
        &mut self,
        governor: &RecordKey,
        user: &Address,
        amount: u64,
    ) -> Result<(), GovernanceError> {
        let debited = self
            .escrow_balance(governor)
            .checked_sub(amount)
            .ok_or(GovernanceError::InsufficientBalance)?;
        let credited = self
            .balance_of(user)
            .checked_add(amount)
            .ok_or(GovernanceError::NumericalOverflow)?;

        self.escrows.insert(*governor, debited);
        self.balances.insert(*user, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    fn governor_key() -> RecordKey {
        RecordKey::governor(&addr(99))
    }

    #[test]
    fn test_balances_default_zero() {
        let ledger = TokenLedger::new();
        assert_eq!(ledger.balance_of(&addr(1)), 0);
        assert_eq!(ledger.escrow_balance(&governor_key()), 0);
    }

    #[test]
    fn test_credit() {
        let mut ledger = TokenLedger::new();
        ledger.credit(addr(1), 1_000).unwrap();
        ledger.credit(addr(1), 500).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 1_500);
    }

    #[test]
    fn test_transfer_to_escrow() {
        let mut ledger = TokenLedger::new();
        ledger.credit(addr(1), 1_000).unwrap();

        ledger.transfer_to_escrow(&addr(1), &governor_key(), 100).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 900);
        assert_eq!(ledger.escrow_balance(&governor_key()), 100);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = TokenLedger::new();
        ledger.credit(addr(1), 50).unwrap();

        assert_eq!(
            ledger
                .transfer_to_escrow(&addr(1), &governor_key(), 100)
                .unwrap_err(),
            GovernanceError::InsufficientBalance
        );
        // Nothing moved
        assert_eq!(ledger.balance_of(&addr(1)), 50);
        assert_eq!(ledger.escrow_balance(&governor_key()), 0);
    }

    #[test]
    fn test_escrow_round_trip() {
        let mut ledger = TokenLedger::new();
        ledger.credit(addr(1), 1_000).unwrap();

        ledger.transfer_to_escrow(&addr(1), &governor_key(), 100).unwrap();
        ledger.transfer_from_escrow(&governor_key(), &addr(1), 100).unwrap();

        assert_eq!(ledger.balance_of(&addr(1)), 1_000);
        assert_eq!(ledger.escrow_balance(&governor_key()), 0);
    }

    #[test]
    fn test_escrow_overdraw_fails() {
        let mut ledger = TokenLedger::new();
        assert_eq!(
            ledger
                .transfer_from_escrow(&governor_key(), &addr(1), 1)
                .unwrap_err(),
            GovernanceError::InsufficientBalance
        );
    }
}
