//! The governance engine: operation surface, approvals and record maps.
//!
//! Records live in arena-style maps keyed by their derived [`RecordKey`];
//! whether a key is already present is the engine's sole de-duplication
//! mechanism. Every mutating operation takes a pre-verified [`ApproverSet`]
//! and the current unix time, evaluates all guards before touching any
//! state, and either applies completely or returns an error having changed
//! nothing.

use std::collections::{HashMap, HashSet};
use conclave_types::{Address, RecordKey};
use tracing::{debug, info};

use crate::error::GovernanceError;
use crate::governor::Governor;
use crate::ledger::TokenLedger;
use crate::lock::{EscrowAccount, LockAccount, Locker};
use crate::proposal::{Proposal, ProposalInstruction, ProposalState};
use crate::vote::{Vote, VoteSide, VoteState};

/// The set of identities whose approval accompanies a request, verified by
/// the surrounding signing infrastructure before the engine is called.
///
/// The organization multisig's internal m-of-n quorum is opaque here: once
/// the wallet as a whole approves, its own identity appears in the set.
#[derive(Debug, Clone, Default)]
pub struct ApproverSet {
    approved: HashSet<Address>,
}

impl ApproverSet {
    /// Create an empty approver set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity's approval (builder style).
    pub fn approve(mut self, identity: Address) -> Self {
        self.approved.insert(identity);
        self
    }

    /// Check whether an identity has approved.
    pub fn contains(&self, identity: &Address) -> bool {
        self.approved.contains(identity)
    }

    /// Assert an identity's approval is present.
    pub fn require(&self, identity: &Address) -> Result<(), GovernanceError> {
        if self.contains(identity) {
            Ok(())
        } else {
            Err(GovernanceError::SignatureVerificationFailed)
        }
    }
}

impl FromIterator<Address> for ApproverSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            approved: iter.into_iter().collect(),
        }
    }
}

/// Governance engine for any number of organizations.
#[derive(Debug, Default)]
pub struct GovernanceEngine {
    governors: HashMap<RecordKey, Governor>,
    proposals: HashMap<RecordKey, Proposal>,
    votes: HashMap<RecordKey, Vote>,
    locks: HashMap<RecordKey, LockAccount>,
    lockers: HashMap<RecordKey, Locker>,
    escrows: HashMap<RecordKey, EscrowAccount>,
    ledger: TokenLedger,
}

impl GovernanceEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- read access -----------------------------------------------------

    pub fn governor(&self, key: &RecordKey) -> Option<&Governor> {
        self.governors.get(key)
    }

    pub fn proposal(&self, key: &RecordKey) -> Option<&Proposal> {
        self.proposals.get(key)
    }

    pub fn vote(&self, key: &RecordKey) -> Option<&Vote> {
        self.votes.get(key)
    }

    pub fn lock(&self, key: &RecordKey) -> Option<&LockAccount> {
        self.locks.get(key)
    }

    pub fn locker(&self, key: &RecordKey) -> Option<&Locker> {
        self.lockers.get(key)
    }

    pub fn escrow(&self, key: &RecordKey) -> Option<&EscrowAccount> {
        self.escrows.get(key)
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Mutable ledger access, used to fund balances from outside the engine.
    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    // ---- governor management ---------------------------------------------

    /// Create the governor for an organization at
    /// `derive(["governor", owner])`.
    pub fn init_governor(
        &mut self,
        owner: Address,
        vote_threshold: u8,
        timelock_delay: u64,
        electorate: Address,
        governance_mint: Address,
        approvals: &ApproverSet,
    ) -> Result<RecordKey, GovernanceError> {
        approvals.require(&owner)?;

        let key = RecordKey::governor(&owner);
        if self.governors.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }

        let governor = Governor::new(owner, electorate, governance_mint, vote_threshold, timelock_delay)?;
        self.governors.insert(key, governor);

        info!(%key, %owner, vote_threshold, timelock_delay, "governor created");
        Ok(key)
    }

    /// Register a voter or update an existing voter's weight.
    pub fn add_voter(
        &mut self,
        governor_key: &RecordKey,
        identity: Address,
        weight: u64,
        approvals: &ApproverSet,
    ) -> Result<(), GovernanceError> {
        let governor = self
            .governors
            .get_mut(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        governor.upsert_voter(identity, weight);
        debug!(governor = %governor_key, voter = %identity, weight, "voter registered");
        Ok(())
    }

    // ---- proposal lifecycle ----------------------------------------------

    /// Create a Draft proposal at the key derived from the governor's
    /// current counter, then increment the counter. The two happen in the
    /// same call, so two proposals can never collide on a key.
    pub fn create_proposal(
        &mut self,
        governor_key: &RecordKey,
        proposer: Address,
        instructions: Vec<ProposalInstruction>,
        approvals: &ApproverSet,
    ) -> Result<RecordKey, GovernanceError> {
        let governor = self
            .governors
            .get_mut(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&proposer)?;

        if instructions.is_empty() {
            return Err(GovernanceError::InvalidInstructions);
        }
        if !governor.is_voter(&proposer) {
            return Err(GovernanceError::UnauthorisedVoter);
        }

        let id = governor.proposal_count;
        let key = RecordKey::proposal(governor_key, id);
        if self.proposals.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }

        let proposal = Proposal::new(
            *governor_key,
            proposer,
            id,
            instructions,
            governor.timelock_delay,
        )?;
        governor.proposal_count += 1;
        self.proposals.insert(key, proposal);

        info!(%key, governor = %governor_key, id, "proposal created");
        Ok(key)
    }

    /// Open a proposal's voting window (Draft -> Active).
    pub fn activate_proposal(
        &mut self,
        proposal_key: &RecordKey,
        voting_period: u64,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        proposal.activate(now, voting_period, governor.timelock_delay)?;
        info!(%proposal_key, voting_period, activated_at = now, "proposal activated");
        Ok(())
    }

    /// Cancel a Draft proposal. Terminal; never reactivatable.
    pub fn cancel_proposal(
        &mut self,
        proposal_key: &RecordKey,
        proposer: &Address,
        approvals: &ApproverSet,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        proposal.cancel(proposer)?;
        info!(%proposal_key, "proposal canceled");
        Ok(())
    }

    /// Resolve an Active proposal's outcome after its window elapsed.
    pub fn finalise_proposal(
        &mut self,
        proposal_key: &RecordKey,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<ProposalState, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        let outcome = proposal.finalise(now, governor.vote_threshold)?;
        info!(%proposal_key, ?outcome, "proposal finalised");
        Ok(outcome)
    }

    /// Queue a Succeeded proposal behind its timelock.
    pub fn queue_proposal(
        &mut self,
        proposal_key: &RecordKey,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        proposal.queue(now)?;
        info!(
            %proposal_key,
            queued_at = proposal.queued_at,
            ready_to_execute_at = proposal.ready_to_execute_at,
            "proposal queued"
        );
        Ok(())
    }

    /// Execute a Queued proposal once its timelock elapsed.
    pub fn execute_proposal(
        &mut self,
        proposal_key: &RecordKey,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;

        proposal.execute(now)?;
        info!(%proposal_key, executed_at = now, "proposal executed");
        Ok(())
    }

    // ---- voting ----------------------------------------------------------

    /// Create a Pending vote record at `derive(["vote", proposal, voter])`.
    /// A second attempt for the same pair collides on the key and fails.
    pub fn create_vote(
        &mut self,
        proposal_key: &RecordKey,
        voter: Address,
        approvals: &ApproverSet,
    ) -> Result<RecordKey, GovernanceError> {
        let proposal = self
            .proposals
            .get(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(&voter)?;

        if !governor.is_voter(&voter) {
            return Err(GovernanceError::UnauthorisedVoter);
        }
        if proposal.state != ProposalState::Active {
            return Err(GovernanceError::InvalidStateTransition);
        }

        let key = RecordKey::vote(proposal_key, &voter);
        if self.votes.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }

        self.votes.insert(key, Vote::new(*proposal_key, voter));
        debug!(%key, proposal = %proposal_key, %voter, "vote record created");
        Ok(key)
    }

    /// Cast a Pending vote with an explicit weight. One-shot: a repeat call
    /// on the same record fails.
    pub fn cast_vote(
        &mut self,
        proposal_key: &RecordKey,
        voter: &Address,
        side: VoteSide,
        weight: u64,
        approvals: &ApproverSet,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(voter)?;

        if !governor.is_voter(voter) {
            return Err(GovernanceError::UnauthorisedVoter);
        }
        if proposal.state != ProposalState::Active {
            return Err(GovernanceError::InvalidStateTransition);
        }

        let vote_key = RecordKey::vote(proposal_key, voter);
        let vote = self
            .votes
            .get_mut(&vote_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        if vote.state != VoteState::Pending {
            return Err(GovernanceError::InvalidStateTransition);
        }

        // Tally first: an overflow aborts before the vote record is touched.
        proposal.record_cast(side, weight)?;
        vote.set(side, weight);

        debug!(%vote_key, ?side, weight, "vote cast");
        Ok(())
    }

    /// Set or re-point a vote using the voter's current registry weight.
    ///
    /// Idempotent: the previous contribution is removed from its old bucket
    /// before the full weight lands in the new one, so repeated calls never
    /// double-count.
    pub fn set_vote(
        &mut self,
        proposal_key: &RecordKey,
        voter: &Address,
        side: VoteSide,
        approvals: &ApproverSet,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(proposal_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        let governor = self
            .governors
            .get(&proposal.governor)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(voter)?;

        let new_weight = governor
            .voter_weight(voter)
            .ok_or(GovernanceError::UnauthorisedVoter)?;
        if proposal.state != ProposalState::Active {
            return Err(GovernanceError::InvalidStateTransition);
        }

        let vote_key = RecordKey::vote(proposal_key, voter);
        let vote = self
            .votes
            .get_mut(&vote_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;

        proposal.move_vote(vote.side, vote.weight, side, new_weight)?;
        vote.set(side, new_weight);

        debug!(%vote_key, ?side, weight = new_weight, "vote set");
        Ok(())
    }

    // ---- token locking ---------------------------------------------------

    /// Move `amount` tokens into the governor's escrow for `duration`
    /// seconds. The lock record lands at
    /// `derive(["lock", governor, user, lock_id])`; reusing an id collides.
    #[allow(clippy::too_many_arguments)]
    pub fn lock_tokens(
        &mut self,
        governor_key: &RecordKey,
        user: Address,
        amount: u64,
        duration: u64,
        lock_id: u64,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<RecordKey, GovernanceError> {
        let governor = self
            .governors
            .get(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(&user)?;

        if !governor.is_voter(&user) {
            return Err(GovernanceError::UnauthorisedVoter);
        }

        let lock = LockAccount::new(*governor_key, user, lock_id, amount, duration, now)?;
        let key = RecordKey::lock(governor_key, &user, lock_id);
        if self.locks.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }

        self.ledger.transfer_to_escrow(&user, governor_key, amount)?;
        let unlocks_at = lock.unlocks_at;
        self.locks.insert(key, lock);

        info!(%key, %user, amount, unlocks_at, "tokens locked");
        Ok(key)
    }

    /// Release an expired lock's tokens back to their owner and mark the
    /// record withdrawn. The flag is the sole replay guard.
    pub fn withdraw_tokens(
        &mut self,
        governor_key: &RecordKey,
        user: &Address,
        lock_id: u64,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let governor = self
            .governors
            .get(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(user)?;

        let key = RecordKey::lock(governor_key, user, lock_id);
        let lock = self
            .locks
            .get_mut(&key)
            .ok_or(GovernanceError::AccountNotInitialized)?;

        if &lock.user != user {
            return Err(GovernanceError::UnauthorisedVoter);
        }
        if lock.withdrawn {
            return Err(GovernanceError::AlreadyWithdrawn);
        }
        if !lock.is_expired(now) {
            return Err(GovernanceError::LockNotExpired);
        }

        self.ledger
            .transfer_from_escrow(governor_key, user, lock.amount)?;
        lock.withdrawn = true;

        info!(%key, %user, amount = lock.amount, "tokens withdrawn");
        Ok(())
    }

    // ---- locker policy ---------------------------------------------------

    /// Create the governor's locker policy record, one per governor.
    pub fn create_locker(
        &mut self,
        governor_key: &RecordKey,
        voting_power_multiplier: u64,
        min_lock_duration: u64,
        max_lock_duration: u64,
        approvals: &ApproverSet,
    ) -> Result<RecordKey, GovernanceError> {
        let governor = self
            .governors
            .get(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        if !governor.initialised {
            return Err(GovernanceError::GovernorNotInitialised);
        }

        let key = RecordKey::locker(governor_key);
        if self.lockers.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }

        let locker = Locker::new(
            *governor_key,
            governor.owner,
            voting_power_multiplier,
            min_lock_duration,
            max_lock_duration,
        )?;
        self.lockers.insert(key, locker);

        info!(%key, governor = %governor_key, "locker created");
        Ok(key)
    }

    /// Replace the locker policy parameters.
    pub fn set_locker_params(
        &mut self,
        governor_key: &RecordKey,
        voting_power_multiplier: u64,
        min_lock_duration: u64,
        max_lock_duration: u64,
        approvals: &ApproverSet,
    ) -> Result<(), GovernanceError> {
        let governor = self
            .governors
            .get(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        if !governor.initialised {
            return Err(GovernanceError::GovernorNotInitialised);
        }

        let key = RecordKey::locker(governor_key);
        let locker = self
            .lockers
            .get_mut(&key)
            .ok_or(GovernanceError::AccountNotInitialized)?;

        locker.set_params(voting_power_multiplier, min_lock_duration, max_lock_duration)?;
        debug!(%key, "locker params updated");
        Ok(())
    }

    /// Escrow tokens under the governor's locker policy; duration must fall
    /// within the policy bounds.
    #[allow(clippy::too_many_arguments)]
    pub fn create_escrow(
        &mut self,
        governor_key: &RecordKey,
        user: Address,
        amount: u64,
        duration: u64,
        escrow_id: u64,
        approvals: &ApproverSet,
        now: u64,
    ) -> Result<RecordKey, GovernanceError> {
        let governor = self
            .governors
            .get(governor_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        approvals.require(&governor.owner)?;
        approvals.require(&user)?;

        if !governor.is_voter(&user) {
            return Err(GovernanceError::UnauthorisedVoter);
        }

        let locker_key = RecordKey::locker(governor_key);
        let locker = self
            .lockers
            .get_mut(&locker_key)
            .ok_or(GovernanceError::AccountNotInitialized)?;
        if !locker.duration_in_bounds(duration) {
            return Err(GovernanceError::InvalidLockParameters);
        }

        let escrow = EscrowAccount::new(user, locker_key, escrow_id, amount, duration, now)?;
        let key = RecordKey::escrow(&locker_key, &user, escrow_id);
        if self.escrows.contains_key(&key) {
            return Err(GovernanceError::AccountAlreadyInUse);
        }
        let new_total = locker
            .total_locked
            .checked_add(amount)
            .ok_or(GovernanceError::NumericalOverflow)?;

        self.ledger.transfer_to_escrow(&user, governor_key, amount)?;
        locker.total_locked = new_total;
        self.escrows.insert(key, escrow);

        info!(%key, %user, amount, duration, "escrow created");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_approver_set_membership() {
        let approvals = ApproverSet::new().approve(addr(1)).approve(addr(2));
        assert!(approvals.contains(&addr(1)));
        assert!(!approvals.contains(&addr(3)));
        assert!(approvals.require(&addr(2)).is_ok());
        assert_eq!(
            approvals.require(&addr(3)).unwrap_err(),
            GovernanceError::SignatureVerificationFailed
        );
    }

    #[test]
    fn test_approver_set_from_iter() {
        let approvals: ApproverSet = [addr(1), addr(2)].into_iter().collect();
        assert!(approvals.contains(&addr(1)));
        assert!(approvals.contains(&addr(2)));
    }

    #[test]
    fn test_init_governor_requires_owner_approval() {
        let mut engine = GovernanceEngine::new();
        let empty = ApproverSet::new();
        assert_eq!(
            engine
                .init_governor(addr(1), 60, 3600, addr(2), addr(3), &empty)
                .unwrap_err(),
            GovernanceError::SignatureVerificationFailed
        );

        let approvals = ApproverSet::new().approve(addr(1));
        let key = engine
            .init_governor(addr(1), 60, 3600, addr(2), addr(3), &approvals)
            .unwrap();
        assert_eq!(key, RecordKey::governor(&addr(1)));
        assert!(engine.governor(&key).is_some());
    }

    #[test]
    fn test_init_governor_twice_collides() {
        let mut engine = GovernanceEngine::new();
        let approvals = ApproverSet::new().approve(addr(1));
        engine
            .init_governor(addr(1), 60, 3600, addr(2), addr(3), &approvals)
            .unwrap();
        assert_eq!(
            engine
                .init_governor(addr(1), 50, 60, addr(2), addr(3), &approvals)
                .unwrap_err(),
            GovernanceError::AccountAlreadyInUse
        );
    }

    #[test]
    fn test_missing_governor_reference() {
        let mut engine = GovernanceEngine::new();
        let approvals = ApproverSet::new().approve(addr(1));
        let bogus = RecordKey::governor(&addr(42));
        assert_eq!(
            engine.add_voter(&bogus, addr(2), 10, &approvals).unwrap_err(),
            GovernanceError::AccountNotInitialized
        );
    }
}
