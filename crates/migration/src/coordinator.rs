//! Orchestration for the Migration Coordinator's operations (§4.F).
//!
//! The coordinator owns two distinct clients: an [`sync_rpc::RpcClient`] for
//! the read-heavy source/target queries (enumeration, proofs, tracing), and a
//! target-chain [`Middleware`] (plain `Provider` for an unlocked node account,
//! or `SignerMiddleware` wrapping a keystore wallet) for submitting and
//! deploying contracts. The two are independent: nothing here assumes the
//! `Middleware`'s transport matches the `RpcClient`'s.

use std::sync::Arc;

use ethers::{
    abi::Abi,
    contract::ContractFactory,
    providers::{JsonRpcClient, Middleware},
    types::{Address, Bytes, H256},
};
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use sync_codec::encode_header;
use sync_proof::assemble_proof;
use sync_rpc::{NodeSide, RpcClient};
use sync_types::{BlockTag, Diff, DiffEntry, EngineState};

use crate::{
    abi::{Proxy, Relay, PROXY_ABI, RELAY_ABI},
    bytecode::clone_runtime_bytecode,
    MigrationError,
};

/// Bytecode blobs for the relay and proxy contract templates. These are
/// produced by compiling the on-chain collaborators (out of scope for this
/// crate, per SPEC_FULL.md §1) and handed to the coordinator as opaque bytes.
#[derive(Debug, Clone, Default)]
pub struct ContractArtifacts {
    pub relay_bytecode: Option<Bytes>,
    pub proxy_bytecode: Option<Bytes>,
}

/// Result of `migrateSrcContract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Migrated { chunks: usize, gas_used: ethers::types::U256 },
}

/// Result of `migrateChangesToProxy`. `NoOp` is carried as a success value,
/// never as an `Err` (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    NoOp,
    Synchronized { keys_updated: usize },
}

pub struct MigrationCoordinator<P: JsonRpcClient, M: Middleware> {
    rpc: RpcClient<P>,
    target: Arc<M>,
    artifacts: ContractArtifacts,
    state: EngineState,
    source_address: Address,
    relay_address: Option<Address>,
    proxy_address: Option<Address>,
    logic_address: Option<Address>,
    src_block: BlockTag,
    batch_size: usize,
    chunk_size: usize,
    page_size: usize,
}

impl<P: JsonRpcClient, M: Middleware> MigrationCoordinator<P, M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: RpcClient<P>,
        target: Arc<M>,
        source_address: Address,
        artifacts: ContractArtifacts,
        relay_address: Option<Address>,
        proxy_address: Option<Address>,
        batch_size: usize,
        chunk_size: usize,
        page_size: usize,
    ) -> Self {
        MigrationCoordinator {
            rpc,
            target,
            artifacts,
            state: EngineState::Uninitialized,
            source_address,
            relay_address,
            proxy_address,
            logic_address: None,
            src_block: BlockTag::Latest,
            batch_size: batch_size.max(1),
            chunk_size: chunk_size.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Borrows the underlying RPC facade, e.g. for a caller-driven diff
    /// strategy ahead of [`Self::migrate_changes_to_proxy`].
    pub fn rpc(&self) -> &RpcClient<P> {
        &self.rpc
    }

    fn require_state(
        &self,
        predicate: impl Fn(EngineState) -> bool,
        expected_name: &'static str,
    ) -> Result<(), MigrationError> {
        if !predicate(self.state) {
            return Err(MigrationError::State {
                expected: expected_name,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn relay(&self) -> Option<Relay<M>> {
        self.relay_address
            .map(|addr| Relay::new(addr, self.target.clone()))
    }

    fn proxy(&self) -> Option<Proxy<M>> {
        self.proxy_address
            .map(|addr| Proxy::new(addr, self.target.clone()))
    }

    /// Attaches to any pre-existing relay/proxy addresses and resolves the
    /// engine's starting state (§4.F, `init`).
    pub async fn init(&mut self) -> Result<(), MigrationError> {
        if !self.state.can_init() {
            return Err(MigrationError::State {
                expected: "Uninitialized",
                actual: self.state,
            });
        }

        if let Some(proxy_addr) = self.proxy_address {
            let proxy = Proxy::new(proxy_addr, self.target.clone());
            let relay_addr: Address = proxy
                .get_relay_address()
                .call()
                .await
                .map_err(|e| MigrationError::Contract(e.to_string()))?;
            let logic_addr: Address = proxy
                .get_logic_address()
                .call()
                .await
                .map_err(|e| MigrationError::Contract(e.to_string()))?;
            self.relay_address.get_or_insert(relay_addr);
            self.logic_address = Some(logic_addr);

            let relay = Relay::new(relay_addr, self.target.clone());
            let migrated: bool = relay
                .get_migration_state(proxy_addr)
                .call()
                .await
                .map_err(|e| MigrationError::Contract(e.to_string()))?;
            self.state = if migrated {
                info!("init: attached to already-migrated proxy {proxy_addr:?}");
                EngineState::Migrated
            } else {
                EngineState::Initialized
            };
        } else {
            self.state = EngineState::Initialized;
        }

        Ok(())
    }

    /// Performs the initial bulk migration of `source_address`'s storage at
    /// `src_block` (§4.F, `migrateSrcContract`).
    pub async fn migrate_src_contract(
        &mut self,
        src_block: BlockTag,
    ) -> Result<MigrationOutcome, MigrationError> {
        self.require_state(EngineState::can_migrate_src_contract, "Initialized")?;
        self.src_block = src_block;

        let resolved_block = match src_block {
            BlockTag::Number(n) => n,
            _ => self.rpc.get_block_number(NodeSide::Source).await?.as_u64(),
        };

        let code = self
            .rpc
            .get_code(NodeSide::Source, self.source_address, src_block)
            .await?;
        if code.0.is_empty() {
            self.state = EngineState::Failed;
            return Err(MigrationError::NotFound(self.source_address, resolved_block));
        }

        if self.relay_address.is_none() {
            self.deploy_relay().await?;
        }

        let keys = sync_enumerator::enumerate_keys(
            &self.rpc,
            NodeSide::Source,
            self.source_address,
            src_block,
            self.page_size,
        )
        .await
        .map_err(|e| MigrationError::Contract(e.to_string()))?;

        let proof = assemble_proof(
            &self.rpc,
            NodeSide::Source,
            self.source_address,
            keys.clone(),
            src_block,
            false,
        )
        .await?;

        let relay = self.relay().expect("relay deployed above");
        relay
            .add_block(proof.state_root.0, proof.block_number.into())
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        info!(
            "migrateSrcContract: registered source state root at block {}",
            proof.block_number
        );

        self.state = EngineState::LogicDeployed;
        let logic_address = self.deploy_logic(code).await?;
        self.logic_address = Some(logic_address);

        self.state = EngineState::ProxyDeployed;
        let proxy_address = self.deploy_proxy(logic_address).await?;
        self.proxy_address = Some(proxy_address);

        // Fetched sequentially (not via the bounded fan-out helper) to honor
        // issue order against the single-threaded `src_block` snapshot.
        let mut entries = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = self
                .rpc
                .get_storage_at(NodeSide::Source, self.source_address, *key, src_block)
                .await?;
            entries.push(DiffEntry {
                key: *key,
                src_value: value,
                target_value: H256::zero(),
            });
        }
        let (ordered_keys, ordered_values) = Diff::from_entries(entries).key_value_pairs();

        let chunks: Vec<(Vec<H256>, Vec<H256>)> = ordered_keys
            .chunks(self.chunk_size)
            .zip(ordered_values.chunks(self.chunk_size))
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        let chunk_count = chunks.len();

        let proxy = self.proxy().expect("proxy deployed above");
        let batch_size = self.batch_size;
        let gas_used = stream::iter(chunks.into_iter().enumerate())
            .map(|(i, (keys_chunk, values_chunk))| {
                let proxy = proxy.clone();
                async move {
                    debug!("migrateSrcContract: submitting chunk {}/{chunk_count}", i + 1);
                    let receipt = proxy
                        .add_storage(keys_chunk, values_chunk)
                        .send()
                        .await
                        .map_err(|e| MigrationError::Contract(e.to_string()))?
                        .await
                        .map_err(|e| MigrationError::Contract(e.to_string()))?
                        .ok_or_else(|| {
                            MigrationError::Contract("addStorage tx dropped from mempool".into())
                        })?;
                    Ok::<_, MigrationError>(receipt.gas_used.unwrap_or_default())
                }
            })
            .buffered(batch_size)
            .try_fold(ethers::types::U256::zero(), |acc, gas| async move { Ok(acc + gas) })
            .await?;

        self.verify_migration(src_block, proof.block_number, resolved_block)
            .await?;

        self.state = EngineState::Migrated;
        Ok(MigrationOutcome::Migrated {
            chunks: chunk_count,
            gas_used,
        })
    }

    async fn verify_migration(
        &self,
        src_block: BlockTag,
        src_block_num: u64,
        _resolved_src_block: u64,
    ) -> Result<(), MigrationError> {
        let proxy_address = self.proxy_address.expect("proxy deployed before verify");
        let target_block_number = self.rpc.get_block_number(NodeSide::Target).await?;

        let src_account_proof = assemble_proof(
            &self.rpc,
            NodeSide::Source,
            self.source_address,
            vec![],
            src_block,
            false,
        )
        .await?;
        let proxy_account_proof = assemble_proof(
            &self.rpc,
            NodeSide::Target,
            proxy_address,
            vec![],
            BlockTag::Number(target_block_number.as_u64()),
            false,
        )
        .await?;

        let target_header = self
            .rpc
            .get_block_with_txs(NodeSide::Target, BlockTag::Number(target_block_number.as_u64()))
            .await?
            .ok_or_else(|| MigrationError::NotFound(proxy_address, target_block_number.as_u64()))?;
        let encoded_header = encode_header(&target_header)?;

        let relay = self.relay().expect("relay deployed before verify");
        relay
            .verify_migrate_contract(
                Bytes::from(src_account_proof.payload),
                Bytes::from(proxy_account_proof.payload),
                Bytes::from(encoded_header),
                proxy_address,
                target_block_number.as_u64().into(),
                src_block_num.into(),
            )
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;

        let migrated: bool = relay
            .get_migration_state(proxy_address)
            .call()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        if !migrated {
            warn!("verifyMigrateContract returned but migration flag is still false");
            return Err(MigrationError::Verification(
                "relay migration flag remained false after verifyMigrateContract".into(),
            ));
        }
        Ok(())
    }

    /// Applies an incremental diff to an already-migrated proxy (§4.F,
    /// `migrateChangesToProxy`). An empty `diff` is a no-op success.
    ///
    /// `target_block` is the newest *source*-chain block the diff should be
    /// proved at (§2, §4.F) — not a target-chain height.
    pub async fn migrate_changes_to_proxy(
        &mut self,
        diff: &Diff,
        target_block: BlockTag,
    ) -> Result<SyncOutcome, MigrationError> {
        self.require_state(EngineState::can_migrate_changes, "Migrated")?;

        if diff.is_empty() {
            return Ok(SyncOutcome::NoOp);
        }

        self.state = EngineState::Synchronizing;
        let proxy_address = self.proxy_address.expect("Migrated implies proxy deployed");
        let keys = diff.keys();

        // `target_block` names the newest *source* block to prove the diff
        // at (§2: "D proves them at the newest source block"), not a
        // target-chain height — the proxy's on-chain verifier resolves the
        // state root via `relay.getStateRoot(blockNumber)` keyed on that same
        // source block number, so the proof, the `addBlock` registration, and
        // the `updateStorage` block number argument must all agree on it.
        let proof = assemble_proof(
            &self.rpc,
            NodeSide::Source,
            self.source_address,
            keys.clone(),
            target_block,
            false,
        )
        .await?;

        let relay = self.relay().expect("Migrated implies relay deployed");
        relay
            .add_block(proof.state_root.0, proof.block_number.into())
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;

        let proxy = Proxy::new(proxy_address, self.target.clone());
        proxy
            .update_storage(Bytes::from(proof.payload), proof.block_number.into())
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;

        self.src_block = BlockTag::Number(proof.block_number);
        self.state = EngineState::Migrated;
        Ok(SyncOutcome::Synchronized {
            keys_updated: keys.len(),
        })
    }

    /// Reads the relay's latest attested block number.
    pub async fn get_latest_block_number(&self) -> Result<u64, MigrationError> {
        let relay = self.relay().ok_or_else(|| {
            MigrationError::Contract("no relay attached".to_string())
        })?;
        let n: ethers::types::U256 = relay
            .get_latest_block_number()
            .call()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        Ok(n.as_u64())
    }

    /// Reads the relay's current synchronized block number for this proxy and
    /// rewrites the engine's cached `src_block` to match.
    pub async fn get_current_block_number(&mut self) -> Result<u64, MigrationError> {
        let proxy_address = self
            .proxy_address
            .ok_or_else(|| MigrationError::Contract("no proxy attached".to_string()))?;
        let relay = self
            .relay()
            .ok_or_else(|| MigrationError::Contract("no relay attached".to_string()))?;
        let n: ethers::types::U256 = relay
            .get_current_block_number(proxy_address)
            .call()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        let number = n.as_u64();
        self.src_block = BlockTag::Number(number);
        Ok(number)
    }

    async fn deploy_relay(&mut self) -> Result<Address, MigrationError> {
        let bytecode = self
            .artifacts
            .relay_bytecode
            .clone()
            .ok_or_else(|| MigrationError::Contract("no relay bytecode configured".into()))?;
        let factory = ContractFactory::new(RELAY_ABI.clone(), bytecode, self.target.clone());
        let contract = factory
            .deploy(())
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        let address = contract.address();
        info!("migrateSrcContract: deployed relay at {address:?}");
        self.relay_address = Some(address);
        Ok(address)
    }

    async fn deploy_logic(&self, runtime_code: Bytes) -> Result<Address, MigrationError> {
        let initcode = clone_runtime_bytecode(&runtime_code)?;
        let factory = ContractFactory::new(Abi::default(), initcode, self.target.clone());
        let contract = factory
            .deploy(())
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        let address = contract.address();
        info!("migrateSrcContract: deployed logic clone at {address:?}");
        Ok(address)
    }

    async fn deploy_proxy(&self, logic_address: Address) -> Result<Address, MigrationError> {
        let bytecode = self
            .artifacts
            .proxy_bytecode
            .clone()
            .ok_or_else(|| MigrationError::Contract("no proxy bytecode configured".into()))?;
        let relay_address = self.relay_address.expect("relay deployed before proxy");
        let factory = ContractFactory::new(PROXY_ABI.clone(), bytecode, self.target.clone());
        let contract = factory
            .deploy((self.source_address, logic_address, relay_address))
            .map_err(|e| MigrationError::Contract(e.to_string()))?
            .send()
            .await
            .map_err(|e| MigrationError::Contract(e.to_string()))?;
        let address = contract.address();
        info!("migrateSrcContract: deployed proxy at {address:?}");
        Ok(address)
    }
}
