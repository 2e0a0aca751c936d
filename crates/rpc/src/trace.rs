//! Response shape of `trace_replayTransaction(hash, ["stateDiff"])`, scoped to
//! the `stateDiff.storage` object the `srcTx` diff strategy (§4.C) reads.

use std::collections::HashMap;

use ethers::types::{Address, H256};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TraceReplayResponse {
    #[serde(rename = "stateDiff")]
    pub state_diff: Option<HashMap<Address, AccountDiff>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountDiff {
    pub storage: HashMap<H256, StateDiffEntry>,
}

/// One storage slot's change, as reported by Parity/OpenEthereum-style
/// `stateDiff` tracing. A slot entry is one of three shapes:
/// `"="` (untouched), `{"*": {"from": ..., "to": ...}}` (modified), or
/// `{"+": value}` (created).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StateDiffEntry {
    Unchanged(UnchangedMarker),
    Modified {
        #[serde(rename = "*")]
        change: FromTo,
    },
    Created {
        #[serde(rename = "+")]
        value: H256,
    },
    Deleted {
        #[serde(rename = "-")]
        value: H256,
    },
}

/// Parity encodes "untouched" as the literal string `"="`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnchangedMarker(String);

#[derive(Debug, Clone, Deserialize)]
pub struct FromTo {
    pub from: H256,
    pub to: H256,
}

impl StateDiffEntry {
    /// The slot's value after this transaction, if this entry represents a
    /// genuine write (modification or creation); `None` for untouched/deleted.
    pub fn new_value(&self) -> Option<H256> {
        match self {
            StateDiffEntry::Modified { change } => Some(change.to),
            StateDiffEntry::Created { value } => Some(*value),
            StateDiffEntry::Deleted { .. } => Some(H256::zero()),
            StateDiffEntry::Unchanged(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_modified_entry() {
        let json = r#"{"*": {"from": "0x0000000000000000000000000000000000000000000000000000000000000001", "to": "0x0000000000000000000000000000000000000000000000000000000000000002"}}"#;
        let entry: StateDiffEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.new_value(), Some(H256::from_low_u64_be(2)));
    }

    #[test]
    fn parses_created_entry() {
        let json = r#"{"+": "0x00000000000000000000000000000000000000000000000000000000000003e8"}"#;
        let entry: StateDiffEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.new_value(), Some(H256::from_low_u64_be(1000)));
    }

    #[test]
    fn parses_unchanged_entry() {
        let json = r#""=""#;
        let entry: StateDiffEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.new_value(), None);
    }
}
