//! Conclave Governance - weighted governance for multisig organizations.
//!
//! This crate provides:
//! - Governor records with a weighted voter registry
//! - Proposal lifecycle management with a timelock before execution
//! - Per-voter vote records and an overflow-safe tally
//! - Token locks backing voting weight with a verifiable holding period
//!
//! Every mutating operation goes through [`engine::GovernanceEngine`],
//! which takes a pre-verified approver set and the current time as inputs.
//! Signature verification, the multisig wallet's internal quorum, and the
//! surrounding runtime are external collaborators.

pub mod engine;
pub mod error;
pub mod governor;
pub mod ledger;
pub mod lock;
pub mod proposal;
pub mod vote;

pub use engine::{ApproverSet, GovernanceEngine};
pub use error::GovernanceError;
pub use governor::{Governor, VoterInfo};
pub use ledger::TokenLedger;
pub use lock::{EscrowAccount, LockAccount, Locker};
pub use proposal::{InstructionAccount, Proposal, ProposalInstruction, ProposalState};
pub use vote::{Vote, VoteSide, VoteState};
