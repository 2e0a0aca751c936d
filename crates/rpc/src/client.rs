//! Typed wrappers for the node methods the engine depends on (§6), bound to
//! either the source or the target chain endpoint.
//!
//! Generic over the JSON-RPC transport so tests can swap in
//! `ethers::providers::MockProvider` instead of a live `Http` connection.

use ethers::{
    providers::{Http, JsonRpcClient, Middleware, Provider, ProviderError},
    types::{Address, Block, BlockId, Bytes, EIP1186ProofResponse, Transaction, H256, U64},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use sync_types::BlockTag;
use thiserror::Error;

use crate::trace::TraceReplayResponse;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Provider error calling {method} on {side:?}: {source}")]
    Provider {
        method: &'static str,
        side: NodeSide,
        #[source]
        source: ProviderError,
    },
}

/// Which chain a call is directed at — used purely for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSide {
    Source,
    Target,
}

/// A single owner of the two node transports; every component borrows this
/// immutably rather than holding its own connection (§9, "Shared-owned RPC handle").
pub struct RpcClient<P: JsonRpcClient = Http> {
    source: Provider<P>,
    target: Provider<P>,
    /// Bound on in-flight requests per pipeline stage (*B* in §4.A). Default 50.
    pub batch_size: usize,
}

impl RpcClient<Http> {
    pub fn new(source_url: &str, target_url: &str, batch_size: usize) -> Result<Self, RpcError> {
        let source =
            Provider::<Http>::try_from(source_url).map_err(|e| RpcError::Provider {
                method: "connect",
                side: NodeSide::Source,
                source: ProviderError::CustomError(e.to_string()),
            })?;
        let target =
            Provider::<Http>::try_from(target_url).map_err(|e| RpcError::Provider {
                method: "connect",
                side: NodeSide::Target,
                source: ProviderError::CustomError(e.to_string()),
            })?;
        Ok(RpcClient::from_providers(source, target, batch_size))
    }
}

impl<P: JsonRpcClient> RpcClient<P> {
    /// Builds a facade directly from two provider handles. The production
    /// entry point is [`RpcClient::new`]; this constructor exists so tests can
    /// wire in `Provider<MockProvider>` instead.
    pub fn from_providers(source: Provider<P>, target: Provider<P>, batch_size: usize) -> Self {
        RpcClient {
            source,
            target,
            batch_size: batch_size.max(1),
        }
    }

    pub fn source(&self) -> &Provider<P> {
        &self.source
    }

    pub fn target(&self) -> &Provider<P> {
        &self.target
    }

    fn provider(&self, side: NodeSide) -> &Provider<P> {
        match side {
            NodeSide::Source => &self.source,
            NodeSide::Target => &self.target,
        }
    }

    /// `eth_getBlockByNumber(tag, includeTxs)`.
    pub async fn get_block_with_txs(
        &self,
        side: NodeSide,
        tag: BlockTag,
    ) -> Result<Option<Block<Transaction>>, RpcError> {
        self.provider(side)
            .get_block_with_txs(BlockId::from(tag))
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getBlockByNumber",
                side,
                source,
            })
    }

    /// `eth_getTransactionByHash(hash)`.
    pub async fn get_transaction(
        &self,
        side: NodeSide,
        hash: H256,
    ) -> Result<Option<Transaction>, RpcError> {
        self.provider(side)
            .get_transaction(hash)
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getTransactionByHash",
                side,
                source,
            })
    }

    /// `eth_getTransactionReceipt(hash)`.
    pub async fn get_transaction_receipt(
        &self,
        side: NodeSide,
        hash: H256,
    ) -> Result<Option<ethers::types::TransactionReceipt>, RpcError> {
        self.provider(side)
            .get_transaction_receipt(hash)
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getTransactionReceipt",
                side,
                source,
            })
    }

    /// `eth_getCode(address, tag)`.
    pub async fn get_code(
        &self,
        side: NodeSide,
        address: Address,
        tag: BlockTag,
    ) -> Result<Bytes, RpcError> {
        self.provider(side)
            .get_code(address, Some(BlockId::from(tag)))
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getCode",
                side,
                source,
            })
    }

    /// `eth_getProof(address, keys, tag)`.
    pub async fn get_proof(
        &self,
        side: NodeSide,
        address: Address,
        keys: Vec<H256>,
        tag: BlockTag,
    ) -> Result<EIP1186ProofResponse, RpcError> {
        self.provider(side)
            .get_proof(address, keys, Some(BlockId::from(tag)))
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getProof",
                side,
                source,
            })
    }

    /// `eth_getStorageAt(address, slot, tag)`.
    pub async fn get_storage_at(
        &self,
        side: NodeSide,
        address: Address,
        slot: H256,
        tag: BlockTag,
    ) -> Result<H256, RpcError> {
        self.provider(side)
            .get_storage_at(address, slot, Some(BlockId::from(tag)))
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_getStorageAt",
                side,
                source,
            })
    }

    /// `eth_blockNumber`.
    pub async fn get_block_number(&self, side: NodeSide) -> Result<U64, RpcError> {
        self.provider(side)
            .get_block_number()
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_blockNumber",
                side,
                source,
            })
    }

    /// The Parity extension `parity_listStorageKeys(address, count, offset)`.
    ///
    /// Returns up to `count` keys strictly greater than `offset` (or from the
    /// smallest, when `offset` is `None`), in trie pre-order.
    pub async fn parity_list_storage_keys(
        &self,
        side: NodeSide,
        address: Address,
        count: usize,
        offset: Option<H256>,
        tag: BlockTag,
    ) -> Result<Vec<H256>, RpcError> {
        let params = json!([address, count, offset, tag_to_param(tag)]);
        self.raw_request(side, "parity_listStorageKeys", params)
            .await
    }

    /// `trace_replayTransaction(hash, ["stateDiff"])`.
    pub async fn trace_replay_transaction(
        &self,
        side: NodeSide,
        hash: H256,
    ) -> Result<TraceReplayResponse, RpcError> {
        let params = json!([hash, ["stateDiff"]]);
        self.raw_request(side, "trace_replayTransaction", params)
            .await
    }

    /// `eth_sendRawTransaction`.
    pub async fn send_raw_transaction(&self, side: NodeSide, raw: Bytes) -> Result<H256, RpcError> {
        let pending = self
            .provider(side)
            .send_raw_transaction(raw)
            .await
            .map_err(|source| RpcError::Provider {
                method: "eth_sendRawTransaction",
                side,
                source,
            })?;
        Ok(pending.tx_hash())
    }

    async fn raw_request<Params: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        side: NodeSide,
        method: &'static str,
        params: Params,
    ) -> Result<R, RpcError> {
        self.provider(side)
            .request(method, params)
            .await
            .map_err(|source| RpcError::Provider {
                method,
                side,
                source,
            })
    }
}

fn tag_to_param(tag: BlockTag) -> serde_json::Value {
    match tag {
        BlockTag::Number(n) => json!(format!("0x{n:x}")),
        BlockTag::Latest => json!("latest"),
        BlockTag::Earliest => json!("earliest"),
        BlockTag::Pending => json!("pending"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::providers::MockProvider;

    fn mock_client() -> (RpcClient<MockProvider>, MockProvider, MockProvider) {
        let source_mock = MockProvider::new();
        let target_mock = MockProvider::new();
        let source = Provider::new(source_mock.clone());
        let target = Provider::new(target_mock.clone());
        (
            RpcClient::from_providers(source, target, 10),
            source_mock,
            target_mock,
        )
    }

    #[test]
    fn tag_to_param_hex_encodes_numbers() {
        assert_eq!(tag_to_param(BlockTag::Number(255)), json!("0xff"));
    }

    #[test]
    fn tag_to_param_passes_through_sentinels() {
        assert_eq!(tag_to_param(BlockTag::Latest), json!("latest"));
        assert_eq!(tag_to_param(BlockTag::Earliest), json!("earliest"));
        assert_eq!(tag_to_param(BlockTag::Pending), json!("pending"));
    }

    #[test]
    fn connecting_to_malformed_urls_is_a_provider_error() {
        let result = RpcClient::new("not-a-url", "also-not-a-url", 10);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn parity_list_storage_keys_decodes_mocked_response() {
        let (client, source_mock, _target_mock) = mock_client();
        let keys = vec![H256::from_low_u64_be(1), H256::from_low_u64_be(2)];
        source_mock.push(keys.clone()).unwrap();

        let result = client
            .parity_list_storage_keys(
                NodeSide::Source,
                Address::zero(),
                256,
                None,
                BlockTag::Latest,
            )
            .await
            .unwrap();
        assert_eq!(result, keys);
    }
}
