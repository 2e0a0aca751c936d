//! The `getProof` diff strategy (§4.C): enumerate the source key set once,
//! then compare EIP-1186 snapshots of that same key set at two blocks.

use ethers::{providers::JsonRpcClient, types::Address};
use sync_enumerator::enumerate_keys;
use sync_rpc::{NodeSide, RpcClient};
use sync_types::{BlockTag, Diff, DiffEntry};

use crate::DiffError;

/// Enumerates `address`'s keys at `from_block`, then fetches `eth_getProof` for
/// that key set at both `from_block` and `to_block` and diffs the storage
/// values entry by entry.
///
/// Does not discover keys created strictly after `from_block` — the caller
/// should pair this with a periodic full [`crate::diff_via_storage`] pass.
pub async fn diff_via_get_proof<P: JsonRpcClient>(
    client: &RpcClient<P>,
    side: NodeSide,
    address: Address,
    from_block: BlockTag,
    to_block: BlockTag,
    page_size: usize,
) -> Result<Diff, DiffError> {
    let keys = enumerate_keys(client, side, address, from_block, page_size).await?;
    if keys.is_empty() {
        return Ok(Diff::new());
    }

    let from_proof = client
        .get_proof(side, address, keys.clone(), from_block)
        .await?;
    let to_proof = client.get_proof(side, address, keys, to_block).await?;

    let entries = to_proof
        .storage_proof
        .into_iter()
        .zip(from_proof.storage_proof)
        .map(|(to_entry, from_entry)| {
            debug_assert_eq!(to_entry.key, from_entry.key);
            DiffEntry {
                key: h256_from_u256(to_entry.key),
                src_value: h256_from_u256(from_entry.value),
                target_value: h256_from_u256(to_entry.value),
            }
        })
        .collect();

    Ok(Diff::from_entries(entries))
}

// EIP-1186 proof responses carry keys/values as `U256`; the rest of this
// workspace deals in left-padded `H256`, so normalize at the boundary.
fn h256_from_u256(value: ethers::types::U256) -> ethers::types::H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    ethers::types::H256::from(bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::{EIP1186ProofResponse, StorageProof, H256, U256};

    fn client_with(mock: &MockProvider) -> RpcClient<MockProvider> {
        RpcClient::from_providers(Provider::new(mock.clone()), Provider::new(mock.clone()), 10)
    }

    fn proof_response(key: H256, value: u64) -> EIP1186ProofResponse {
        EIP1186ProofResponse {
            address: Address::zero(),
            balance: U256::zero(),
            code_hash: H256::zero(),
            nonce: U256::zero(),
            storage_hash: H256::zero(),
            account_proof: vec![],
            storage_proof: vec![StorageProof {
                key: U256::from_big_endian(key.as_bytes()),
                value: U256::from(value),
                proof: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn no_keys_is_an_empty_diff_without_fetching_proofs() {
        let mock = MockProvider::new();
        mock.push(Vec::<H256>::new()).unwrap();
        let client = client_with(&mock);

        let diff = diff_via_get_proof(
            &client,
            NodeSide::Source,
            Address::zero(),
            BlockTag::Number(1),
            BlockTag::Number(2),
            256,
        )
        .await
        .unwrap();

        assert!(diff.is_empty());
    }

    #[tokio::test]
    async fn disagreeing_storage_values_produce_an_entry() {
        let mock = MockProvider::new();
        let key = H256::from_low_u64_be(5);
        mock.push(vec![key]).unwrap();
        mock.push(proof_response(key, 1)).unwrap();
        mock.push(proof_response(key, 2)).unwrap();
        let client = client_with(&mock);

        let diff = diff_via_get_proof(
            &client,
            NodeSide::Source,
            Address::zero(),
            BlockTag::Number(1),
            BlockTag::Number(2),
            256,
        )
        .await
        .unwrap();

        assert_eq!(diff.len(), 1);
        assert_eq!(diff.entries()[0].target_value, H256::from_low_u64_be(2));
    }
}
