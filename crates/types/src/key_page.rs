//! The result of one `parity_listStorageKeys` call (§4.B).

use ethers::types::H256;

/// Up to *count* keys plus the cursor to pass to the next page request, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<H256>,
    pub page_size: usize,
}

impl KeyPage {
    pub fn new(keys: Vec<H256>, page_size: usize) -> Self {
        KeyPage { keys, page_size }
    }

    /// A page is full when it returned exactly `page_size` keys; a full page means
    /// another page must be requested.
    pub fn is_full(&self) -> bool {
        self.keys.len() == self.page_size
    }

    /// The cursor to continue paging from: the last key in this page.
    pub fn next_cursor(&self) -> Option<H256> {
        self.keys.last().copied()
    }
}
