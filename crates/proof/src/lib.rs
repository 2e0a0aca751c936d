//! Fetches an EIP-1186 proof, verifies it locally against the block's state
//! root, and RLP-encodes it into the payload the proxy contract parses (§4.D).
//!
//! The on-chain verifier's "optimized" (prefix-factored) wire format is not
//! implemented here — `optimize: bool` always produces the plain concatenated
//! form regardless of its value, per the open question in SPEC_FULL.md §9;
//! flipping it to `true` is a no-op reserved for once a target verifier that
//! actually parses the factored form exists.

use ethers::{
    providers::JsonRpcClient,
    types::{Bytes, EIP1186ProofResponse, H256},
};
use rlp::RlpStream;
use sync_rpc::{NodeSide, RpcClient, RpcError};
use sync_types::BlockTag;
use sync_verify::{eip1186::verify_proof, Account, VerifyProofError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofAssemblyError {
    #[error("RpcError {0}")]
    Rpc(#[from] RpcError),
    #[error("block {0} not found while assembling proof")]
    BlockNotFound(u64),
    #[error("local verification failed before submission: {0}")]
    Verification(#[from] VerifyProofError),
}

/// An RLP-encoded `[accountRecord, accountNodesRLP, storageProofsRLP]` payload
/// that has already been verified against the state root of the block it was
/// fetched at.
#[derive(Debug, Clone)]
pub struct OptimizedProof {
    pub block_number: u64,
    pub state_root: H256,
    pub payload: Vec<u8>,
}

/// Fetches `eth_getProof(address, keys, block)`, verifies it locally, and
/// encodes the canonical proxy payload.
pub async fn assemble_proof<P: JsonRpcClient>(
    client: &RpcClient<P>,
    side: NodeSide,
    address: ethers::types::Address,
    keys: Vec<H256>,
    block: BlockTag,
    optimize: bool,
) -> Result<OptimizedProof, ProofAssemblyError> {
    let block_header = client
        .get_block_with_txs(side, block)
        .await?
        .ok_or_else(|| match block {
            BlockTag::Number(n) => ProofAssemblyError::BlockNotFound(n),
            _ => ProofAssemblyError::BlockNotFound(0),
        })?;
    let state_root = block_header.state_root;

    let proof = client.get_proof(side, address, keys, block).await?;
    verify_proof(state_root.as_bytes(), &proof)?;

    let payload = encode_optimized_proof(&proof, optimize);

    Ok(OptimizedProof {
        block_number: block_header
            .number
            .map(|n| n.as_u64())
            .unwrap_or_default(),
        state_root,
        payload,
    })
}

/// Canonicalizes an already-verified proof into the outer
/// `[accountRecord, accountNodesRLP, storageProofsRLP]` RLP payload (§3, §4.D).
pub fn encode_optimized_proof(proof: &EIP1186ProofResponse, _optimize: bool) -> Vec<u8> {
    let account = Account {
        nonce: proof.nonce.as_u64().into(),
        balance: proof.balance,
        storage_hash: proof.storage_hash,
        code_hash: proof.code_hash,
    };
    let account_rlp = rlp::encode(&account);
    let account_nodes_rlp = encode_raw_node_list(&proof.account_proof);
    let storage_proofs_rlp = encode_storage_proofs(proof);

    let mut outer = RlpStream::new_list(3);
    outer.append_raw(&account_rlp, 1);
    outer.append_raw(&account_nodes_rlp, 1);
    outer.append_raw(&storage_proofs_rlp, 1);
    outer.out().to_vec()
}

fn encode_raw_node_list(nodes: &[Bytes]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(nodes.len());
    for node in nodes {
        stream.append_raw(node, 1);
    }
    stream.out().to_vec()
}

fn encode_storage_proofs(proof: &EIP1186ProofResponse) -> Vec<u8> {
    let mut stream = RlpStream::new_list(proof.storage_proof.len());
    for entry in &proof.storage_proof {
        let mut key_bytes = [0u8; 32];
        entry.key.to_big_endian(&mut key_bytes);
        let value_rlp = rlp::encode(&entry.value);
        let nodes_rlp = encode_raw_node_list(&entry.proof);

        let mut item = RlpStream::new_list(3);
        item.append(&key_bytes.to_vec());
        item.append_raw(&value_rlp, 1);
        item.append_raw(&nodes_rlp, 1);
        stream.append_raw(&item.out(), 1);
    }
    stream.out().to_vec()
}
