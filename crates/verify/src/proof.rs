//! Verification of a single Merkle-Patricia trie proof path (account-in-state-trie
//! or slot-in-storage-trie) against a known root.

use std::collections::HashMap;

use ethers::{types::H256, utils::keccak256};
use thiserror::Error;

use crate::{
    path::{decode_hex_prefix, NibblePath, PathError, PathNature},
    utils::hex_encode,
};

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("Unable to retrieve node using node hash {0}")]
    NoNodeForHash(String),
    #[error("Branch node does not have enough items")]
    BranchItemMissing,
    #[error("Node has invalid item count {0}")]
    NodeHasInvalidItemCount(usize),
    #[error("An extension node is present as the final node in the path")]
    FinalExtension,
    #[error("The leaf path was expected to be complete")]
    LeafPathIncomplete,
    #[error("The leaf/branch value does not match the claimed value")]
    IncorrectLeafData,
    #[error("PathError {0}")]
    PathError(#[from] PathError),
    #[error("Traversal exceeded the maximum possible trie depth")]
    TraversalTooDeep,
}

/// Outcome of verifying one proof: either the claimed value is present at the
/// path (inclusion), or the path is provably absent (exclusion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verified {
    Inclusion,
    Exclusion,
}

/// A reference to the next node to visit during traversal: either a hash that
/// must be resolved against the supplied proof nodes, or an inlined node (the
/// RLP-encoding optimization for nodes whose encoding is shorter than 32 bytes).
enum NodeRef {
    Hash(H256),
    Inline(Vec<u8>),
}

fn node_ref_from_item(item: &[u8]) -> NodeRef {
    if item.len() == 32 {
        NodeRef::Hash(H256::from_slice(item))
    } else {
        NodeRef::Inline(item.to_vec())
    }
}

/// One inclusion/exclusion claim against a trie identified by `root`: does the
/// path `keccak256(address)` or `keccak256(slot_key)` lead to `claimed_value`?
pub struct SingleProofPath {
    /// Proof nodes, in the order returned by `eth_getProof`, root first.
    pub proof: Vec<ethers::types::Bytes>,
    pub root: [u8; 32],
    pub path: [u8; 32],
    /// The RLP-encoded value expected at `path`, if present.
    pub claimed_value: Vec<u8>,
}

impl SingleProofPath {
    pub fn verify(&self) -> Result<Verified, ProofError> {
        let mut by_hash: HashMap<H256, Vec<u8>> = HashMap::new();
        for node in &self.proof {
            let hash = H256::from(keccak256(node.as_ref()));
            by_hash.insert(hash, node.to_vec());
        }

        let mut traversal = NibblePath::init(&self.path);
        let mut current = NodeRef::Hash(H256::from(self.root));
        // A well-formed 64-nibble path cannot require more than 65 hops.
        for _ in 0..=64 {
            let node_rlp: Vec<u8> = match current {
                NodeRef::Hash(hash) => by_hash
                    .get(&hash)
                    .ok_or_else(|| ProofError::NoNodeForHash(hex_encode(hash)))?
                    .clone(),
                NodeRef::Inline(ref bytes) => bytes.clone(),
            };
            let items: Vec<Vec<u8>> = rlp::decode_list(&node_rlp);

            match items.len() {
                17 => {
                    if traversal.is_exhausted() {
                        let value = items.get(16).ok_or(ProofError::BranchItemMissing)?;
                        return match value.is_empty() {
                            true => Ok(Verified::Exclusion),
                            false => compare_value(value, &self.claimed_value),
                        };
                    }
                    let nibble = traversal.visit_path_nibble()? as usize;
                    let item = items.get(nibble).ok_or(ProofError::BranchItemMissing)?;
                    if item.is_empty() {
                        return Ok(Verified::Exclusion);
                    }
                    current = node_ref_from_item(item);
                }
                2 => {
                    let (is_leaf, nibbles) = decode_hex_prefix(&items[0])?;
                    match traversal.match_or_mismatch(&nibbles)? {
                        PathNature::SubPathDiverges => return Ok(Verified::Exclusion),
                        PathNature::PathEnds => {
                            if !is_leaf {
                                return Err(ProofError::FinalExtension);
                            }
                            return compare_value(&items[1], &self.claimed_value);
                        }
                        PathNature::SubPathMatches => {
                            if is_leaf {
                                return Err(ProofError::LeafPathIncomplete);
                            }
                            current = node_ref_from_item(&items[1]);
                        }
                    }
                }
                n => return Err(ProofError::NodeHasInvalidItemCount(n)),
            }
        }
        Err(ProofError::TraversalTooDeep)
    }
}

fn compare_value(found: &[u8], claimed: &[u8]) -> Result<Verified, ProofError> {
    if found == claimed {
        Ok(Verified::Inclusion)
    } else {
        Err(ProofError::IncorrectLeafData)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::Bytes;
    use rlp::RlpStream;

    /// Builds a minimal two-node trie: root branch node with a single leaf
    /// child at nibble `0`, holding `value` at the remaining path nibbles.
    fn build_single_leaf_trie(remaining_nibbles: &[u8], value: &[u8]) -> (H256, Vec<Bytes>) {
        let mut leaf_path = remaining_nibbles.to_vec();
        let is_odd = leaf_path.len() % 2 == 1;
        let mut hp = vec![if is_odd { 0x20 | leaf_path[0] } else { 0x20 }];
        let start = if is_odd { 1 } else { 0 };
        if is_odd {
            leaf_path = leaf_path[1..].to_vec();
        } else {
            leaf_path = leaf_path.to_vec();
        }
        let _ = start;
        for pair in leaf_path.chunks(2) {
            if pair.len() == 2 {
                hp.push((pair[0] << 4) | pair[1]);
            }
        }

        let mut leaf_stream = RlpStream::new_list(2);
        leaf_stream.append(&hp);
        leaf_stream.append(&value.to_vec());
        let leaf_rlp = leaf_stream.out().to_vec();
        let leaf_hash = H256::from(keccak256(&leaf_rlp));

        let mut branch_items: Vec<Vec<u8>> = vec![Vec::new(); 17];
        branch_items[0] = leaf_hash.as_bytes().to_vec();
        let mut branch_stream = RlpStream::new_list(17);
        for item in &branch_items {
            branch_stream.append(item);
        }
        let branch_rlp = branch_stream.out().to_vec();
        let root = H256::from(keccak256(&branch_rlp));

        (
            root,
            vec![Bytes::from(branch_rlp), Bytes::from(leaf_rlp)],
        )
    }

    #[test]
    fn verifies_inclusion_through_branch_then_leaf() {
        // path = 0x0 followed by 63 more nibbles; encode a path whose first nibble is 0
        // so the branch at slot 0 is followed, and the remaining 63 nibbles are the leaf path.
        let mut path = [0u8; 32];
        path[0] = 0x00; // first nibble 0
        let remaining_nibbles: Vec<u8> = NibblePathTestHelper::nibbles(&path)[1..].to_vec();
        let value = b"hello-world-value".to_vec();
        let (root, proof) = build_single_leaf_trie(&remaining_nibbles, &value);

        let prover = SingleProofPath {
            proof,
            root: root.0,
            path,
            claimed_value: value,
        };
        assert_eq!(prover.verify().unwrap(), Verified::Inclusion);
    }

    #[test]
    fn detects_exclusion_on_empty_branch_slot() {
        let mut path = [0u8; 32];
        path[0] = 0x10; // nibble 1, but the branch only has a child at nibble 0
        let other_remaining: Vec<u8> = NibblePathTestHelper::nibbles(&[0u8; 32])[1..].to_vec();
        let (root, proof) = build_single_leaf_trie(&other_remaining, b"unused");

        let prover = SingleProofPath {
            proof,
            root: root.0,
            path,
            claimed_value: b"whatever".to_vec(),
        };
        assert_eq!(prover.verify().unwrap(), Verified::Exclusion);
    }

    struct NibblePathTestHelper;
    impl NibblePathTestHelper {
        fn nibbles(bytes: &[u8]) -> Vec<u8> {
            let mut out = Vec::with_capacity(bytes.len() * 2);
            for b in bytes {
                out.push(b >> 4);
                out.push(b & 0x0f);
            }
            out
        }
    }
}
