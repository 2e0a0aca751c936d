//! Changed-key discovery between two blocks or two chains (§4.C).
//!
//! Three interchangeable strategies produce the same `Diff` shape: `storage`
//! (full re-enumeration + value comparison), `getProof` (EIP-1186 snapshots at
//! two blocks), and `srcTx` (transaction state-diff replay). Strategy choice is
//! the caller's; this crate never picks one on its own.

mod deployment;
mod get_proof;
mod src_tx;
mod storage;

pub use deployment::find_deployment_block;
pub use get_proof::diff_via_get_proof;
pub use src_tx::diff_via_src_tx;
pub use storage::diff_via_storage;

use sync_enumerator::EnumeratorError;
use sync_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("RpcError {0}")]
    Rpc(#[from] RpcError),
    #[error("EnumeratorError {0}")]
    Enumerator(#[from] EnumeratorError),
}
