//! Top-level wiring for the Storage Synchronization Engine: the unified
//! [`EngineError`] every leaf crate's error folds into (§4.I, §7), and the
//! bootstrap helpers that turn a loaded [`EngineConfig`] into a running
//! [`MigrationCoordinator`] over either a keystore-backed signer or an
//! unlocked node account (§4.F `init`, §6 "Configuration surface").
//!
//! This crate is intentionally thin: the engine's actual behavior lives in
//! the `sync_*` leaf crates it re-exports and unifies here.

use std::sync::Arc;

use ethers::{
    prelude::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use log::error;
use sync_config::{ConfigError, EngineConfig, SignerConfig};
use sync_migration::{ContractArtifacts, MigrationCoordinator, MigrationError};
use sync_rpc::{RpcClient, RpcError};
use thiserror::Error;

pub use sync_config as config;
pub use sync_migration as migration;
pub use sync_types::EngineState;

/// The unified error type callers match on, folding every leaf crate's error
/// enum into the kinds enumerated in SPEC_FULL.md §7: Config, NotFound, RPC,
/// Verification, State, and Fatal. `NoOp` is deliberately absent here — per
/// §7 it is never an `Err`, only a success-carrying outcome variant
/// (`SyncOutcome::NoOp`) returned from [`MigrationCoordinator::migrate_changes_to_proxy`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Coarse classification used purely for log-level selection (§7's
    /// propagation rules: RPC fan-out failures are process-fatal, everything
    /// else is a regular operation failure the caller can inspect and retry
    /// from a checkpoint).
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_) | EngineError::Rpc(_))
            || matches!(self, EngineError::Migration(MigrationError::Rpc(_)))
    }

    /// Logs this error at the level its kind warrants, then returns it
    /// unchanged, so call sites can `return Err(err.logged())`.
    pub fn logged(self) -> Self {
        if self.is_fatal() {
            error!("fatal engine error: {self}");
        } else {
            error!("engine operation failed: {self}");
        }
        self
    }
}

/// The two target-chain transports the coordinator can drive, selected by
/// [`SignerConfig`] (§4.F `init`: "decrypt keystore ... or fall back to an
/// unlocked node account").
pub enum TargetMiddleware {
    Keystore(Arc<SignerMiddleware<Provider<Http>, LocalWallet>>),
    Unlocked(Arc<Provider<Http>>),
}

/// Connects the source/target RPC facade and resolves the target-chain
/// signer from `config`, without yet attaching to any relay/proxy. This is
/// the non-state-machine half of §4.F's `init`; the coordinator itself
/// performs the state-machine half once constructed with the result.
pub async fn bootstrap(
    config: &EngineConfig,
) -> Result<(RpcClient<Http>, TargetMiddleware), EngineError> {
    let rpc = RpcClient::new(&config.source_endpoint, &config.target_endpoint, config.batch_size)
        .map_err(EngineError::Rpc)?;

    let target_provider = Provider::<Http>::try_from(config.target_endpoint.as_str())
        .map_err(|e| EngineError::Fatal(format!("invalid target endpoint: {e}")))?;

    let middleware = match &config.signer {
        SignerConfig::Keystore { path, password } => {
            let chain_id = target_provider
                .get_chainid()
                .await
                .map_err(|e| EngineError::Fatal(format!("failed to read target chain id: {e}")))?;
            let wallet = LocalWallet::decrypt_keystore(path, password)
                .map_err(|e| EngineError::Fatal(format!("failed to decrypt keystore: {e}")))?
                .with_chain_id(chain_id.as_u64());
            TargetMiddleware::Keystore(Arc::new(SignerMiddleware::new(target_provider, wallet)))
        }
        SignerConfig::UnlockedAccount(_) => {
            TargetMiddleware::Unlocked(Arc::new(target_provider))
        }
    };

    Ok((rpc, middleware))
}

/// Builds a [`ContractArtifacts`] bundle from already-fetched bytecode. The
/// relay/proxy bytecode itself comes from the on-chain collaborator build
/// (out of scope, §1) — this is just the typed hand-off point.
pub fn contract_artifacts(
    relay_bytecode: Option<ethers::types::Bytes>,
    proxy_bytecode: Option<ethers::types::Bytes>,
) -> ContractArtifacts {
    ContractArtifacts {
        relay_bytecode,
        proxy_bytecode,
    }
}

/// Convenience alias for a coordinator driven by a keystore-backed signer.
pub type KeystoreCoordinator =
    MigrationCoordinator<Http, SignerMiddleware<Provider<Http>, LocalWallet>>;
/// Convenience alias for a coordinator driven by an unlocked node account.
pub type UnlockedCoordinator = MigrationCoordinator<Http, Provider<Http>>;
