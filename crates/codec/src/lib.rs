//! RLP encoding of a block header for on-chain re-hashing (§4.G).
//!
//! Encodes the 13 mandatory fields as an RLP list; when `mixHash` and `nonce`
//! are both present (PoW variant) two more fields are appended, for 15 total.
//! `Keccak256(encode(header))` must equal the canonical block hash reported
//! by the node — this is the property `relay.verifyMigrateContract` leans on
//! to re-derive a trusted header from untrusted calldata.

use ethers::types::{Block, H256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("block is missing required field `{0}`")]
    MissingField(&'static str),
}

/// RLP-encodes `block`'s header fields. `TX` is unconstrained: callers
/// commonly have a `Block<Transaction>` on hand from other RPC calls and
/// there is no need to re-fetch a transaction-free block just for this.
pub fn encode_header<TX>(block: &Block<TX>) -> Result<Vec<u8>, HeaderError> {
    let number = block.number.ok_or(HeaderError::MissingField("number"))?;
    let is_pow = block.mix_hash.is_some() && block.nonce.is_some();
    let field_count = if is_pow { 15 } else { 13 };

    let mut stream = rlp::RlpStream::new_list(field_count);
    stream.append(&block.parent_hash);
    stream.append(&block.uncles_hash);
    stream.append(&block.author.unwrap_or_default());
    stream.append(&block.state_root);
    stream.append(&block.transactions_root);
    stream.append(&block.receipts_root);
    stream.append(&block.logs_bloom.unwrap_or_default());
    stream.append(&block.difficulty);
    stream.append(&number);
    stream.append(&block.gas_limit);
    stream.append(&block.gas_used);
    stream.append(&block.timestamp);
    stream.append(&block.extra_data.to_vec());

    if is_pow {
        stream.append(&block.mix_hash.unwrap());
        stream.append(&block.nonce.unwrap());
    }

    Ok(stream.out().to_vec())
}

/// Computes the block hash an encoded header would produce, for comparison
/// against the node-reported hash.
pub fn header_hash(encoded: &[u8]) -> H256 {
    H256::from(ethers::utils::keccak256(encoded))
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::{Address, Block, Bloom, Bytes, H64, U256, U64};

    fn base_block() -> Block<()> {
        Block {
            parent_hash: H256::repeat_byte(0x11),
            uncles_hash: H256::repeat_byte(0x22),
            author: Some(Address::repeat_byte(0x33)),
            state_root: H256::repeat_byte(0x44),
            transactions_root: H256::repeat_byte(0x55),
            receipts_root: H256::repeat_byte(0x66),
            number: Some(U64::from(42)),
            gas_used: U256::from(21_000),
            gas_limit: U256::from(30_000_000),
            extra_data: Bytes::from_static(b"reth"),
            logs_bloom: Some(Bloom::default()),
            timestamp: U256::from(1_700_000_000u64),
            difficulty: U256::zero(),
            mix_hash: None,
            nonce: None,
            ..Default::default()
        }
    }

    #[test]
    fn poa_header_has_thirteen_fields() {
        let block = base_block();
        let encoded = encode_header(&block).unwrap();
        let rlp = rlp::Rlp::new(&encoded);
        assert_eq!(rlp.item_count().unwrap(), 13);
    }

    #[test]
    fn pow_header_has_fifteen_fields_and_round_trips_mix_hash_and_nonce() {
        let mut block = base_block();
        block.mix_hash = Some(H256::repeat_byte(0x77));
        block.nonce = Some(H64::repeat_byte(0x88));

        let encoded = encode_header(&block).unwrap();
        let rlp = rlp::Rlp::new(&encoded);
        assert_eq!(rlp.item_count().unwrap(), 15);

        let mix_hash: H256 = rlp.val_at(13).unwrap();
        let nonce: H64 = rlp.val_at(14).unwrap();
        assert_eq!(mix_hash, block.mix_hash.unwrap());
        assert_eq!(nonce, block.nonce.unwrap());
    }

    #[test]
    fn integer_fields_round_trip_through_minimal_encoding() {
        let block = base_block();
        let encoded = encode_header(&block).unwrap();
        let rlp = rlp::Rlp::new(&encoded);

        let difficulty: U256 = rlp.val_at(7).unwrap();
        let number: U64 = rlp.val_at(8).unwrap();
        let gas_limit: U256 = rlp.val_at(9).unwrap();
        assert_eq!(difficulty, U256::zero());
        assert_eq!(number, U64::from(42));
        assert_eq!(gas_limit, U256::from(30_000_000));
    }

    #[test]
    fn missing_block_number_is_an_error() {
        let mut block = base_block();
        block.number = None;
        assert!(matches!(
            encode_header(&block),
            Err(HeaderError::MissingField("number"))
        ));
    }

    /// Mainnet genesis block, hard-coded field-for-field, checked against its
    /// well-known canonical hash rather than a value re-derived in this test.
    #[test]
    fn header_hash_matches_mainnet_genesis() {
        let empty_list_hash: H256 =
            "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d4934"
                .parse()
                .unwrap();
        let empty_trie_hash: H256 =
            "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
                .parse()
                .unwrap();
        let state_root: H256 = "0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"
            .parse()
            .unwrap();
        let extra_data: H256 = "0x11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa"
            .parse()
            .unwrap();

        let block = Block::<()> {
            parent_hash: H256::zero(),
            uncles_hash: empty_list_hash,
            author: Some(Address::zero()),
            state_root,
            transactions_root: empty_trie_hash,
            receipts_root: empty_trie_hash,
            number: Some(U64::zero()),
            gas_used: U256::zero(),
            gas_limit: U256::from(5_000u64),
            extra_data: Bytes::from(extra_data.as_bytes().to_vec()),
            logs_bloom: Some(Bloom::default()),
            timestamp: U256::zero(),
            difficulty: U256::from(0x0400000000u64),
            mix_hash: Some(H256::zero()),
            nonce: Some(H64::from_low_u64_be(0x42)),
            ..Default::default()
        };

        let encoded = encode_header(&block).unwrap();
        let expected: H256 = "0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa"
            .parse()
            .unwrap();
        assert_eq!(header_hash(&encoded), expected);
    }
}
