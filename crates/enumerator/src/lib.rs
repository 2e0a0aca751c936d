//! Full enumeration of a contract's non-zero storage keys at a block (§4.B).
//!
//! Paging terminates when a page returns fewer than the requested page size.
//! Keys are emitted in the order the node returns them (trie pre-order) so
//! downstream proof assembly never needs to re-sort.

use std::collections::HashSet;

use ethers::{providers::JsonRpcClient, types::{Address, H256}};
use log::debug;
use sync_rpc::{NodeSide, RpcClient, RpcError};
use sync_types::{BlockTag, KeyPage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnumeratorError {
    #[error("RpcError {0}")]
    RpcError(#[from] RpcError),
}

/// Page size *P* used by [`enumerate_keys`] when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Enumerates every non-zero storage key of `address` at `block`, paging
/// through `parity_listStorageKeys` until a short page is returned.
///
/// De-duplicates defensively across page boundaries: some node implementations
/// include the cursor key as the first entry of the next page (§9, open question).
pub async fn enumerate_keys<P: JsonRpcClient>(
    client: &RpcClient<P>,
    side: NodeSide,
    address: Address,
    block: BlockTag,
    page_size: usize,
) -> Result<Vec<H256>, EnumeratorError> {
    let page_size = page_size.min(256).max(1);
    let mut seen: HashSet<H256> = HashSet::new();
    let mut keys: Vec<H256> = Vec::new();
    let mut cursor: Option<H256> = None;

    loop {
        let returned = client
            .parity_list_storage_keys(side, address, page_size, cursor, block)
            .await?;
        let page = KeyPage::new(returned, page_size);
        debug!(
            "enumerator: page of {} keys for {:?} at {block} (cursor {:?})",
            page.keys.len(),
            address,
            cursor
        );

        let is_full = page.is_full();
        let next_cursor = page.next_cursor();

        for key in page.keys {
            if seen.insert(key) {
                keys.push(key);
            }
        }

        if !is_full {
            break;
        }
        cursor = next_cursor;
    }

    Ok(keys)
}
