//! Verifies an EIP-1186 style proof

use ethers::{
    types::{EIP1186ProofResponse, StorageProof, H256, U256, U64},
    utils::keccak256,
};

use rlp_derive::{RlpDecodable, RlpEncodable};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    proof::{ProofError, SingleProofPath, Verified},
    utils::hex_encode,
};

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, RlpEncodable, RlpDecodable)]
pub struct Account {
    pub nonce: U64,
    pub balance: U256,
    pub storage_hash: H256,
    pub code_hash: H256,
}

impl Account {
    fn is_empty(&self) -> bool {
        let empty = Account::default();
        self.eq(&empty)
    }
}

#[derive(Debug, Error)]
pub enum VerifyProofError {
    #[error("Proof not valid for account {account}, AccountError {source} ")]
    AccountError {
        source: AccountError,
        account: String,
    },
    #[error(
        "Proof not valid for account {account} storage key {storage_key}, StorageError {source}"
    )]
    StorageError {
        source: StorageError,
        account: String,
        storage_key: String,
    },
    #[error("Proof is empty")]
    EmptyProof,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("ProofError {0}")]
    ProofError(#[from] ProofError),
    #[error("Proof is empty")]
    EmptyProof,
    #[error("A valid exclusion proof exists, but the claimed account is not empty")]
    ExclusionProofForNonEmptyAccount,
    #[error("Unexpected inclusion proof for an empty account, expected exclusion proof")]
    InclusionProofForEmptyAccount,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("ProofError {0}")]
    ProofError(#[from] ProofError),
    #[error("A valid exclusion proof exists, but the claimed storage is not empty")]
    ExclusionProofForNonZeroValue,
    #[error("Unexpected inclusion proof for a storage value of zero, expected exclusion proof")]
    InclusionProofForZeroValue,
}

/// Verifies a single account proof with respect to a state roof. The
/// proof is of the form returned by eth_getProof.
pub fn verify_proof(
    block_state_root: &[u8],
    proof: &EIP1186ProofResponse,
) -> Result<(), VerifyProofError> {
    // Account
    verify_account_component(block_state_root, proof).map_err(|source| {
        VerifyProofError::AccountError {
            source,
            account: hex_encode(proof.address),
        }
    })?;

    // Storage proofs for this account
    for storage_proof in &proof.storage_proof {
        verify_account_storage_component(&proof.storage_hash.0, storage_proof.clone()).map_err(
            |source| VerifyProofError::StorageError {
                source,
                account: hex_encode(proof.address),
                storage_key: hex_encode(storage_proof.key),
            },
        )?;
    }
    Ok(())
}

pub fn verify_account_component(
    block_state_root: &[u8],
    proof: &EIP1186ProofResponse,
) -> Result<(), AccountError> {
    let claimed_account = Account {
        nonce: proof.nonce,
        balance: proof.balance,
        storage_hash: proof.storage_hash,
        code_hash: proof.code_hash,
    };

    let account_prover = SingleProofPath {
        proof: proof.account_proof.clone(),
        root: H256::from_slice(block_state_root).0,
        path: keccak256(proof.address.as_bytes()),
        claimed_value: rlp::encode(&claimed_account).to_vec(),
    };

    match account_prover.verify()? {
        Verified::Inclusion => {
            if claimed_account == Account::default() {
                return Err(AccountError::InclusionProofForEmptyAccount);
            }
        }
        Verified::Exclusion => match claimed_account.is_empty() {
            true => {}
            false => return Err(AccountError::ExclusionProofForNonEmptyAccount),
        },
    }
    Ok(())
}

/// Verfies a single storage proof with respect to a known storage hash.
fn verify_account_storage_component(
    storage_hash: &[u8; 32],
    storage_proof: StorageProof,
) -> Result<(), StorageError> {
    let rlp_value = rlp::encode(&storage_proof.value).to_vec();

    // TODO: See yellow paper (205). Account for cases where entire node is <32 bytes.

    let storage_prover = SingleProofPath {
        proof: storage_proof.proof,
        root: *storage_hash,
        path: keccak256(storage_proof.key),
        claimed_value: rlp_value,
    };

    match storage_prover.verify()? {
        Verified::Inclusion => {
            if storage_proof.value == U256::from(0) {
                return Err(StorageError::InclusionProofForZeroValue);
            }
        }
        Verified::Exclusion => match storage_proof.value.is_zero() {
            true => {}
            false => return Err(StorageError::ExclusionProofForNonZeroValue),
        },
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::{H160, U256};
    use rlp::RlpStream;

    /// Builds a single-account trie with one leaf at nibble path `first_nibble`
    /// followed by the rest of `keccak(address)`, whose leaf holds `account`.
    /// Returns (state_root, account_proof, keccak(address)).
    fn build_single_account_trie(address: H160, account: &Account) -> (H256, Vec<Vec<u8>>, H256) {
        let path = keccak256(address.as_bytes());
        let nibbles: Vec<u8> = path.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect();
        let leaf_nibbles = &nibbles[1..];

        let is_odd = leaf_nibbles.len() % 2 == 1;
        let mut hp = vec![if is_odd {
            0x20 | leaf_nibbles[0]
        } else {
            0x20
        }];
        let body = if is_odd {
            &leaf_nibbles[1..]
        } else {
            leaf_nibbles
        };
        for pair in body.chunks(2) {
            hp.push((pair[0] << 4) | pair[1]);
        }

        let account_rlp = rlp::encode(account).to_vec();
        let mut leaf_stream = RlpStream::new_list(2);
        leaf_stream.append(&hp);
        leaf_stream.append(&account_rlp);
        let leaf_rlp = leaf_stream.out().to_vec();
        let leaf_hash = H256::from(keccak256(&leaf_rlp));

        let mut branch_items: Vec<Vec<u8>> = vec![Vec::new(); 17];
        branch_items[nibbles[0] as usize] = leaf_hash.as_bytes().to_vec();
        let mut branch_stream = RlpStream::new_list(17);
        for item in &branch_items {
            branch_stream.append(item);
        }
        let branch_rlp = branch_stream.out().to_vec();
        let root = H256::from(keccak256(&branch_rlp));

        (root, vec![branch_rlp, leaf_rlp], H256::from(path))
    }

    #[test]
    fn verifies_inclusion_of_a_populated_account() {
        let address = H160::repeat_byte(0xaa);
        let account = Account {
            nonce: 1.into(),
            balance: U256::from(1_000u64).into(),
            storage_hash: H256::repeat_byte(0x11),
            code_hash: H256::repeat_byte(0x22),
        };
        let (root, proof, _path) = build_single_account_trie(address, &account);

        let response = EIP1186ProofResponse {
            address,
            account_proof: proof.into_iter().map(Into::into).collect(),
            balance: account.balance,
            code_hash: account.code_hash,
            nonce: account.nonce,
            storage_hash: account.storage_hash,
            storage_proof: vec![],
        };
        verify_proof(root.as_bytes(), &response).expect("inclusion proof must verify");
    }

    #[test]
    fn rejects_inclusion_proof_for_an_empty_account() {
        let address = H160::repeat_byte(0xaa);
        let account = Account::default();
        let (root, proof, _path) = build_single_account_trie(address, &account);

        let response = EIP1186ProofResponse {
            address,
            account_proof: proof.into_iter().map(Into::into).collect(),
            balance: account.balance,
            code_hash: account.code_hash,
            nonce: account.nonce,
            storage_hash: account.storage_hash,
            storage_proof: vec![],
        };
        let err = verify_proof(root.as_bytes(), &response).unwrap_err();
        assert!(matches!(
            err,
            VerifyProofError::AccountError {
                source: AccountError::InclusionProofForEmptyAccount,
                ..
            }
        ));
    }
}
