//! The `srcTx` diff strategy (§4.C): replay every transaction touching the
//! contract across a block range and fold `stateDiff.storage` entries into a
//! single per-key final value.

use std::collections::HashMap;

use ethers::{
    providers::JsonRpcClient,
    types::{Address, H256},
};
use log::debug;
use sync_rpc::{trace::StateDiffEntry, NodeSide, RpcClient};
use sync_types::{BlockTag, Diff, DiffEntry};

use crate::DiffError;

/// Replays every transaction in `(from_block, to_block]` whose `to` is
/// `address`, folding `stateDiff.storage` entries in block order so the last
/// write to a key wins. Keys whose final value is all-zero are still emitted,
/// with `src_value == H256::zero()`, so the caller can clear the mirrored slot.
pub async fn diff_via_src_tx<P: JsonRpcClient>(
    client: &RpcClient<P>,
    side: NodeSide,
    address: Address,
    from_block: u64,
    to_block: u64,
    current_values: &HashMap<H256, H256>,
) -> Result<Diff, DiffError> {
    if from_block >= to_block {
        return Ok(Diff::new());
    }

    let mut final_values: HashMap<H256, H256> = HashMap::new();

    for block_number in (from_block + 1)..=to_block {
        let block = client
            .get_block_with_txs(side, BlockTag::Number(block_number))
            .await?;
        let Some(block) = block else {
            continue;
        };

        for tx in &block.transactions {
            let touches_contract =
                tx.to == Some(address) || (tx.to.is_none() && tx.from == address);
            if !touches_contract {
                continue;
            }

            let trace = client.trace_replay_transaction(side, tx.hash).await?;
            let Some(state_diff) = trace.state_diff else {
                debug!("srcTx: {:?} touched {address:?} but has no stateDiff", tx.hash);
                continue;
            };
            let Some(account_diff) = state_diff.get(&address) else {
                debug!(
                    "srcTx: {:?} touched {address:?} but stateDiff has no entry for it",
                    tx.hash
                );
                continue;
            };

            for (key, entry) in &account_diff.storage {
                if let Some(new_value) = entry.new_value() {
                    final_values.insert(*key, new_value);
                } else if matches!(entry, StateDiffEntry::Unchanged(_)) {
                    continue;
                }
            }
        }
    }

    let entries = final_values
        .into_iter()
        .map(|(key, src_value)| {
            let target_value = current_values.get(&key).copied().unwrap_or(H256::zero());
            DiffEntry {
                key,
                src_value,
                target_value,
            }
        })
        .collect();

    Ok(Diff::from_entries(entries))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn empty_range_is_a_no_op() {
        let mock = ethers::providers::MockProvider::new();
        let provider = ethers::providers::Provider::new(mock.clone());
        let client = RpcClient::from_providers(provider.clone(), provider, 10);

        let diff = diff_via_src_tx(
            &client,
            NodeSide::Source,
            Address::zero(),
            10,
            10,
            &HashMap::new(),
        )
        .await
        .unwrap();

        assert!(diff.is_empty());
    }
}
