//! A `Diff` is the output shape shared by all three diff strategies (§4.C).

use ethers::types::H256;

/// One storage slot whose value disagrees between the source and the target (or
/// between two source blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEntry {
    pub key: H256,
    pub src_value: H256,
    pub target_value: H256,
}

/// An ordered, key-ascending list of changed slots.
///
/// The zero value never appears in a persisted diff as a standalone entry absence
/// marker: a slot that has been cleared is represented explicitly with
/// `src_value == H256::zero()` so the caller can zero the mirrored slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    entries: Vec<DiffEntry>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a diff from entries, sorting by key and dropping entries where the
    /// two sides already agree.
    pub fn from_entries(mut entries: Vec<DiffEntry>) -> Self {
        entries.retain(|e| e.src_value != e.target_value);
        entries.sort_by_key(|e| e.key);
        Diff { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Keys touched by this diff, in ascending order.
    pub fn keys(&self) -> Vec<H256> {
        self.entries.iter().map(|e| e.key).collect()
    }

    /// The final value for each key, as seen by the source side.
    pub fn key_value_pairs(&self) -> (Vec<H256>, Vec<H256>) {
        let keys = self.entries.iter().map(|e| e.key).collect();
        let values = self.entries.iter().map(|e| e.src_value).collect();
        (keys, values)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn h(n: u64) -> H256 {
        H256::from_low_u64_be(n)
    }

    #[test]
    fn from_entries_sorts_by_key_and_drops_equal_values() {
        let diff = Diff::from_entries(vec![
            DiffEntry {
                key: h(3),
                src_value: h(1),
                target_value: h(1),
            },
            DiffEntry {
                key: h(1),
                src_value: h(9),
                target_value: h(0),
            },
            DiffEntry {
                key: h(2),
                src_value: h(5),
                target_value: h(4),
            },
        ]);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.keys(), vec![h(1), h(2)]);
    }

    #[test]
    fn empty_diff_has_no_keys() {
        let diff = Diff::new();
        assert!(diff.is_empty());
        assert!(diff.keys().is_empty());
    }
}
