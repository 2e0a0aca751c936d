//! Bounded binary search for a contract's deployment block (§4.C).

use ethers::{providers::JsonRpcClient, types::Address};
use sync_rpc::{NodeSide, RpcClient};
use sync_types::BlockTag;

use crate::DiffError;

/// Finds the lowest block in `[0, latest]` at which `address` has non-empty
/// code, i.e. the contract's deployment block. Returns `None` if `address`
/// has no code even at `latest`.
pub async fn find_deployment_block<P: JsonRpcClient>(
    client: &RpcClient<P>,
    side: NodeSide,
    address: Address,
    latest: u64,
) -> Result<Option<u64>, DiffError> {
    let has_code_at_latest = !client
        .get_code(side, address, BlockTag::Number(latest))
        .await?
        .0
        .is_empty();
    if !has_code_at_latest {
        return Ok(None);
    }

    let mut low = 0u64;
    let mut high = latest;
    while low < high {
        let mid = low + (high - low) / 2;
        let has_code = !client
            .get_code(side, address, BlockTag::Number(mid))
            .await?
            .0
            .is_empty();
        if has_code {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    Ok(Some(low))
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::Bytes;

    fn client_with_codes(codes: Vec<Bytes>) -> RpcClient<MockProvider> {
        let mock = MockProvider::new();
        for code in codes {
            mock.push(code).unwrap();
        }
        let provider = Provider::new(mock.clone());
        RpcClient::from_providers(provider.clone(), provider, 10)
    }

    #[tokio::test]
    async fn no_code_at_latest_returns_none() {
        let client = client_with_codes(vec![Bytes::default()]);
        let result = find_deployment_block(&client, NodeSide::Source, Address::zero(), 100)
            .await
            .unwrap();
        assert_eq!(result, None);
    }
}
