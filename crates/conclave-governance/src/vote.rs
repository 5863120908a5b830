//! Per-voter vote records.
//!
//! One record exists per (proposal, voter) pair; its derived address is what
//! prevents a second record for the same pair from ever being created.

use conclave_types::{Address, RecordKey};

/// Vote side options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSide {
    For,
    Against,
    Abstain,
}

/// Whether the vote has been cast yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    /// Record created, no tally contribution yet
    Pending,
    /// Side chosen and weight contributed to the tally
    Cast,
}

/// One voter's tally contribution to one proposal.
#[derive(Debug, Clone)]
pub struct Vote {
    /// Proposal this vote belongs to
    pub proposal: RecordKey,
    /// Voter identity
    pub voter: Address,
    /// Chosen side; Abstain until first cast
    pub side: VoteSide,
    /// Weight currently contributed to the tally
    pub weight: u64,
    /// Pending or Cast
    pub state: VoteState,
}

impl Vote {
    /// Create a fresh Pending record with no tally contribution.
    pub fn new(proposal: RecordKey, voter: Address) -> Self {
        Self {
            proposal,
            voter,
            side: VoteSide::Abstain,
            weight: 0,
            state: VoteState::Pending,
        }
    }

    /// Record the chosen side and weight and mark the vote Cast. The
    /// tally contribution and state guards are the engine's business.
    pub fn set(&mut self, side: VoteSide, weight: u64) {
        self.side = side;
        self.weight = weight;
        self.state = VoteState::Cast;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote() -> Vote {
        Vote::new(RecordKey::ZERO, Address::from_bytes([1u8; 32]))
    }

    #[test]
    fn test_vote_starts_pending() {
        let v = vote();
        assert_eq!(v.state, VoteState::Pending);
        assert_eq!(v.side, VoteSide::Abstain);
        assert_eq!(v.weight, 0);
    }

    #[test]
    fn test_set_overwrites() {
        let mut v = vote();
        v.set(VoteSide::For, 100);
        assert_eq!(v.state, VoteState::Cast);
        assert_eq!(v.side, VoteSide::For);

        v.set(VoteSide::Against, 70);
        assert_eq!(v.side, VoteSide::Against);
        assert_eq!(v.weight, 70);
        assert_eq!(v.state, VoteState::Cast);
    }
}
