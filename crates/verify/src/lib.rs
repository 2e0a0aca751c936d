//! Verification of EIP-1186 account+storage proofs against a known state root,
//! and the trie-path primitives that make that verification possible.

pub mod eip1186;
pub mod path;
pub mod proof;
pub mod utils;

pub use eip1186::{Account, AccountError, StorageError, VerifyProofError};
pub use proof::{ProofError, SingleProofPath, Verified};
