//! Governor records: per-organization root configuration and voter registry.

use conclave_types::Address;
use crate::error::GovernanceError;

/// One entry of the voter registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterInfo {
    /// Voter identity
    pub identity: Address,
    /// Voting weight
    pub weight: u64,
}

/// Root configuration record for one organization.
///
/// Owned by the organization's multisig wallet; every authorization check in
/// the engine resolves against this record. Created once, never deleted.
#[derive(Debug, Clone)]
pub struct Governor {
    /// Owning multisig identity
    pub owner: Address,
    /// Electorate identity
    pub electorate: Address,
    /// Governance token identity
    pub governance_mint: Address,
    /// Percentage of cast votes the for-side must reach (0..=100)
    pub vote_threshold: u8,
    /// Seconds between queueing a succeeded proposal and it becoming executable
    pub timelock_delay: u64,
    /// Monotonic counter consumed by proposal creation
    pub proposal_count: u64,
    /// Ordered voter registry, identities unique
    pub voters: Vec<VoterInfo>,
    /// Set once at creation
    pub initialised: bool,
}

impl Governor {
    /// Create a new governor.
    ///
    /// # Errors
    /// - `InvalidVoteThreshold` if `vote_threshold > 100`
    /// - `InvalidTimelockDelay` if `timelock_delay == 0`
    pub fn new(
        owner: Address,
        electorate: Address,
        governance_mint: Address,
        vote_threshold: u8,
        timelock_delay: u64,
    ) -> Result<Self, GovernanceError> {
        if vote_threshold > 100 {
            return Err(GovernanceError::InvalidVoteThreshold);
        }
        if timelock_delay == 0 {
            return Err(GovernanceError::InvalidTimelockDelay);
        }

        Ok(Self {
            owner,
            electorate,
            governance_mint,
            vote_threshold,
            timelock_delay,
            proposal_count: 0,
            voters: Vec::new(),
            initialised: true,
        })
    }

    /// Check if an identity is in the registry.
    pub fn is_voter(&self, identity: &Address) -> bool {
        self.voters.iter().any(|v| &v.identity == identity)
    }

    /// Look up the registry weight of an identity.
    pub fn voter_weight(&self, identity: &Address) -> Option<u64> {
        self.voters
            .iter()
            .find(|v| &v.identity == identity)
            .map(|v| v.weight)
    }

    /// Append a new registry entry or update the weight of an existing one.
    /// Idempotent by identity; duplicate identities merge rather than duplicate.
    pub fn upsert_voter(&mut self, identity: Address, weight: u64) {
        match self.voters.iter_mut().find(|v| v.identity == identity) {
            Some(existing) => existing.weight = weight,
            None => self.voters.push(VoterInfo { identity, weight }),
        }
    }

    /// Total registered voting weight.
    pub fn total_weight(&self) -> u64 {
        self.voters.iter().map(|v| v.weight).sum()
    }
}
