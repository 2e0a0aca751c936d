//! A block tag: either a concrete number or one of the node's sentinel tags.

use std::fmt;

use ethers::types::{BlockId, BlockNumber};

/// Either a concrete block number or one of the `latest` / `earliest` / `pending` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Number(u64),
    Latest,
    Earliest,
    Pending,
}

impl BlockTag {
    /// Resolves this tag against a known current height, for tags that need one
    /// (`Latest` and `Pending` both resolve to `current`; `Earliest` resolves to `0`).
    pub fn resolve(self, current: u64) -> u64 {
        match self {
            BlockTag::Number(n) => n,
            BlockTag::Latest | BlockTag::Pending => current,
            BlockTag::Earliest => 0,
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

impl From<BlockTag> for BlockId {
    fn from(tag: BlockTag) -> Self {
        match tag {
            BlockTag::Number(n) => BlockId::Number(BlockNumber::Number(n.into())),
            BlockTag::Latest => BlockId::Number(BlockNumber::Latest),
            BlockTag::Earliest => BlockId::Number(BlockNumber::Earliest),
            BlockTag::Pending => BlockId::Number(BlockNumber::Pending),
        }
    }
}

impl From<BlockTag> for BlockNumber {
    fn from(tag: BlockTag) -> Self {
        match tag {
            BlockTag::Number(n) => BlockNumber::Number(n.into()),
            BlockTag::Latest => BlockNumber::Latest,
            BlockTag::Earliest => BlockNumber::Earliest,
            BlockTag::Pending => BlockNumber::Pending,
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Number(n) => write!(f, "{n}"),
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Earliest => write!(f, "earliest"),
            BlockTag::Pending => write!(f, "pending"),
        }
    }
}
