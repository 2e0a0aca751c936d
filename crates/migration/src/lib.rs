//! The Migration Coordinator (§4.F): the state machine that drives relay and
//! proxy deployment, initial bulk migration, on-chain verification, and
//! incremental storage synchronization.

pub mod abi;
pub mod bytecode;
mod coordinator;

pub use abi::{Proxy, Relay};
pub use bytecode::{clone_runtime_bytecode, CloneError};
pub use coordinator::{ContractArtifacts, MigrationCoordinator, MigrationOutcome, SyncOutcome};

use sync_codec::HeaderError;
use sync_diff::DiffError;
use sync_proof::ProofAssemblyError;
use sync_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{0}")]
    Rpc(#[from] RpcError),
    #[error("{0}")]
    Diff(#[from] DiffError),
    #[error("{0}")]
    Proof(#[from] ProofAssemblyError),
    #[error("{0}")]
    Header(#[from] HeaderError),
    #[error("{0}")]
    Clone(#[from] CloneError),
    #[error("contract call failed: {0}")]
    Contract(String),
    #[error("source address {0:?} has no code at block {1}")]
    NotFound(ethers::types::Address, u64),
    #[error("operation requires state {expected}, engine is in {actual}")]
    State {
        expected: &'static str,
        actual: sync_types::EngineState,
    },
    #[error("verification failed: {0}")]
    Verification(String),
}
