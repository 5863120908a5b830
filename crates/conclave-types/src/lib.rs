//! Conclave Types - Core type definitions for the Conclave governance engine.
//!
//! This crate provides the fundamental types shared across the engine:
//! - Identities (32-byte, Bech32m encoded)
//! - Record keys (32-byte, blake3-derived deterministic addresses)

pub mod address;
pub mod error;
pub mod key;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use error::TypesError;
pub use key::RecordKey;
