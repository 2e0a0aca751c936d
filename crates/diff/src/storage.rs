//! The `storage` diff strategy (§4.C): full re-enumeration of both sides plus
//! a value comparison over the union of their key sets.

use std::collections::HashSet;

use ethers::{providers::JsonRpcClient, types::Address};
use sync_enumerator::enumerate_keys;
use sync_rpc::{NodeSide, RpcClient};
use sync_types::{BlockTag, Diff, DiffEntry};

use crate::DiffError;

/// Enumerates `src_address` on the source chain at `src_block` and
/// `target_address` on the target chain at `target_block`, then fetches the
/// current value of every key present on either side and emits an entry for
/// every key whose values disagree.
///
/// Requires the Parity `parity_listStorageKeys` extension on both endpoints.
pub async fn diff_via_storage<P: JsonRpcClient>(
    client: &RpcClient<P>,
    src_address: Address,
    src_block: BlockTag,
    target_address: Address,
    target_block: BlockTag,
    page_size: usize,
) -> Result<Diff, DiffError> {
    let src_keys = enumerate_keys(
        client,
        NodeSide::Source,
        src_address,
        src_block,
        page_size,
    )
    .await?;
    let target_keys = enumerate_keys(
        client,
        NodeSide::Target,
        target_address,
        target_block,
        page_size,
    )
    .await?;

    let mut union: Vec<_> = src_keys
        .into_iter()
        .chain(target_keys)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    union.sort();

    let mut entries = Vec::with_capacity(union.len());
    for key in union {
        let src_value = client
            .get_storage_at(NodeSide::Source, src_address, key, src_block)
            .await?;
        let target_value = client
            .get_storage_at(NodeSide::Target, target_address, key, target_block)
            .await?;
        entries.push(DiffEntry {
            key,
            src_value,
            target_value,
        });
    }

    Ok(Diff::from_entries(entries))
}
