//! Proposal lifecycle management.
//!
//! Proposals go through states:
//! Draft -> Active -> Succeeded/Defeated -> Queued -> Executed,
//! with Draft -> Canceled as a side branch. Executed, Canceled and Defeated
//! are terminal. Every transition is guarded; an out-of-order call fails
//! `InvalidStateTransition` and leaves the record untouched.

use conclave_types::{Address, RecordKey};
use crate::error::GovernanceError;
use crate::vote::VoteSide;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    /// Created, not yet open for voting
    Draft,
    /// Voting window is open
    Active,
    /// Voting ended, threshold cleared
    Succeeded,
    /// Voting ended, threshold missed (or no votes cast)
    Defeated,
    /// Succeeded and waiting out the timelock
    Queued,
    /// Timelock elapsed and the proposal was executed
    Executed,
    /// Canceled while still in Draft
    Canceled,
}

impl ProposalState {
    /// Check if the proposal is in its voting window.
    pub fn is_active(&self) -> bool {
        matches!(self, ProposalState::Active)
    }

    /// Check if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Executed | ProposalState::Canceled | ProposalState::Defeated
        )
    }
}

/// One account reference inside an opaque proposal instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionAccount {
    pub identity: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// One opaque instruction carried by a proposal. The engine stores these
/// verbatim; interpreting them is the executing runtime's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalInstruction {
    /// Target identity the instruction is addressed to
    pub target: Address,
    /// Accounts touched by the instruction
    pub accounts: Vec<InstructionAccount>,
    /// Opaque payload bytes
    pub data: Vec<u8>,
}

/// One governance item with a bounded instruction payload and a lifecycle
/// state.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Governor this proposal belongs to
    pub governor: RecordKey,
    /// Identity that created the proposal
    pub proposer: Address,
    /// Sequence number; equals the governor's counter value at creation
    pub id: u64,
    /// Instruction payload, never empty
    pub instructions: Vec<ProposalInstruction>,
    /// Current lifecycle state
    pub state: ProposalState,
    /// Voting window length in seconds, set at activation
    pub voting_period: u64,
    /// Unix time of activation (0 while Draft)
    pub activated_at: u64,
    /// Unix time of queueing (0 until Queued)
    pub queued_at: u64,
    /// Earliest unix time execution is allowed (0 until Queued)
    pub ready_to_execute_at: u64,
    /// Timelock snapshot copied from the governor at activation, so later
    /// governor config changes do not retroactively affect this proposal
    pub timelock_delay: u64,
    /// Weighted tally buckets
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
}

impl Proposal {
    /// Create a new proposal in Draft.
    ///
    /// # Errors
    /// - `InvalidInstructions` if the instruction list is empty
    pub fn new(
        governor: RecordKey,
        proposer: Address,
        id: u64,
        instructions: Vec<ProposalInstruction>,
        timelock_delay: u64,
    ) -> Result<Self, GovernanceError> {
        if instructions.is_empty() {
            return Err(GovernanceError::InvalidInstructions);
        }

        Ok(Self {
            governor,
            proposer,
            id,
            instructions,
            state: ProposalState::Draft,
            voting_period: 0,
            activated_at: 0,
            queued_at: 0,
            ready_to_execute_at: 0,
            timelock_delay,
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
        })
    }

    /// Open the voting window (Draft -> Active).
    ///
    /// Snapshots `timelock_delay` from the governor's current config.
    pub fn activate(
        &mut self,
        now: u64,
        voting_period: u64,
        timelock_delay: u64,
    ) -> Result<(), GovernanceError> {
        if self.state != ProposalState::Draft {
            return Err(GovernanceError::InvalidStateTransition);
        }
        if voting_period == 0 {
            return Err(GovernanceError::InvalidVotingPeriod);
        }

        self.state = ProposalState::Active;
        self.activated_at = now;
        self.voting_period = voting_period;
        self.timelock_delay = timelock_delay;
        Ok(())
    }

    /// Cancel the proposal (Draft -> Canceled). Terminal.
    ///
    /// # Errors
    /// - `InvalidStateTransition` if not Draft
    /// - `UnauthorisedCancellation` if `caller` is not the stored proposer
    pub fn cancel(&mut self, caller: &Address) -> Result<(), GovernanceError> {
        if self.state != ProposalState::Draft {
            return Err(GovernanceError::InvalidStateTransition);
        }
        if &self.proposer != caller {
            return Err(GovernanceError::UnauthorisedCancellation);
        }

        self.state = ProposalState::Canceled;
        Ok(())
    }

    /// Resolve the outcome once the voting window has elapsed
    /// (Active -> Succeeded/Defeated).
    ///
    /// The quorum base is the votes actually cast, abstentions included in
    /// the denominator. Succeeds when the for-side reaches `vote_threshold`
    /// percent of that base and strictly exceeds the against-side.
    pub fn finalise(
        &mut self,
        now: u64,
        vote_threshold: u8,
    ) -> Result<ProposalState, GovernanceError> {
        if self.state != ProposalState::Active {
            return Err(GovernanceError::InvalidStateTransition);
        }

        let end_time = self
            .activated_at
            .checked_add(self.voting_period)
            .ok_or(GovernanceError::NumericalOverflow)?;
        if now < end_time {
            return Err(GovernanceError::VotingPeriodActive);
        }

        let total_cast = self
            .for_votes
            .checked_add(self.against_votes)
            .and_then(|v| v.checked_add(self.abstain_votes))
            .ok_or(GovernanceError::NumericalOverflow)?;

        self.state = if total_cast > 0 {
            let for_percent = (self.for_votes as u128) * 100 / (total_cast as u128);
            if for_percent >= vote_threshold as u128 && self.for_votes > self.against_votes {
                ProposalState::Succeeded
            } else {
                ProposalState::Defeated
            }
        } else {
            ProposalState::Defeated
        };

        Ok(self.state)
    }

    /// Queue a succeeded proposal behind the timelock (Succeeded -> Queued).
    pub fn queue(&mut self, now: u64) -> Result<(), GovernanceError> {
        if self.state != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidStateTransition);
        }

        self.queued_at = now;
        self.ready_to_execute_at = now
            .checked_add(self.timelock_delay)
            .ok_or(GovernanceError::NumericalOverflow)?;
        self.state = ProposalState::Queued;
        Ok(())
    }

    /// Execute once the timelock has elapsed (Queued -> Executed). Terminal.
    pub fn execute(&mut self, now: u64) -> Result<(), GovernanceError> {
        if self.state != ProposalState::Queued {
            return Err(GovernanceError::InvalidStateTransition);
        }
        if now < self.ready_to_execute_at {
            return Err(GovernanceError::TimelockNotExpired);
        }

        self.state = ProposalState::Executed;
        Ok(())
    }

    /// Add `weight` to one tally bucket. Overflow leaves the tally untouched.
    pub fn record_cast(&mut self, side: VoteSide, weight: u64) -> Result<(), GovernanceError> {
        let bucket = self.bucket_mut(side);
        *bucket = bucket
            .checked_add(weight)
            .ok_or(GovernanceError::NumericalOverflow)?;
        Ok(())
    }

    /// Move a voter's contribution from one bucket to another.
    ///
    /// Computes all three buckets into temporaries first and commits only if
    /// every checked operation succeeds, so a failing call never leaves the
    /// tally half-updated.
    pub fn move_vote(
        &mut self,
        old_side: VoteSide,
        old_weight: u64,
        new_side: VoteSide,
        new_weight: u64,
    ) -> Result<(), GovernanceError> {
        let mut buckets = [self.for_votes, self.against_votes, self.abstain_votes];

        let old_idx = Self::bucket_index(old_side);
        buckets[old_idx] = buckets[old_idx]
            .checked_sub(old_weight)
            .ok_or(GovernanceError::NumericalOverflow)?;

        let new_idx = Self::bucket_index(new_side);
        buckets[new_idx] = buckets[new_idx]
            .checked_add(new_weight)
            .ok_or(GovernanceError::NumericalOverflow)?;

        [self.for_votes, self.against_votes, self.abstain_votes] = buckets;
        Ok(())
    }

    /// Total votes cast across all buckets (checked).
    pub fn total_votes(&self) -> Result<u64, GovernanceError> {
        self.for_votes
            .checked_add(self.against_votes)
            .and_then(|v| v.checked_add(self.abstain_votes))
            .ok_or(GovernanceError::NumericalOverflow)
    }

    fn bucket_mut(&mut self, side: VoteSide) -> &mut u64 {
        match side {
            VoteSide::For => &mut self.for_votes,
            VoteSide::Against => &mut self.against_votes,
            VoteSide::Abstain => &mut self.abstain_votes,
        }
    }

    fn bucket_index(side: VoteSide) -> usize {
        match side {
            VoteSide::For => 0,
            VoteSide::Against => 1,
            VoteSide::Abstain => 2,
        }
    }
}
