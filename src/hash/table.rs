// Block index for delta generation.
//
// Maps a weak checksum to every signature block sharing it. Weak collisions
// are expected; a candidate only matches once its strong checksum equals the
// digest of the exact window bytes.

use std::collections::HashMap;

use super::strong::StrongHasher;
use crate::sync::signature::BlockRecord;

struct Candidate {
    index: u64,
    strong: Vec<u8>,
}

/// Weak-checksum lookup table over signature records.
///
/// Candidates within a bucket keep insertion order, so for duplicate blocks
/// the first record inserted wins. Built per delta call and never shared.
#[derive(Default)]
pub struct BlockIndex {
    buckets: HashMap<u32, Vec<Candidate>>,
    len: usize,
}

impl BlockIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one signature record.
    pub fn insert(&mut self, record: BlockRecord) {
        self.buckets
            .entry(record.weak_checksum)
            .or_default()
            .push(Candidate {
                index: record.index,
                strong: record.strong_checksum,
            });
        self.len += 1;
    }

    /// Whether any record has weak checksum `weak`.
    #[inline]
    pub fn contains_weak(&self, weak: u32) -> bool {
        self.buckets.contains_key(&weak)
    }

    /// Find the block matching `window`.
    ///
    /// The strong digest is computed only when the weak checksum has
    /// candidates. Returns the matching block index, or `None` when no
    /// candidate's strong checksum confirms.
    pub fn find(&self, weak: u32, window: &[u8], hasher: &dyn StrongHasher) -> Option<u64> {
        let candidates = self.buckets.get(&weak)?;
        let strong = hasher.digest(window);
        candidates
            .iter()
            .find(|c| c.strong == strong)
            .map(|c| c.index)
    }

    /// Number of records indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct weak checksums.
    pub fn distinct_weak(&self) -> usize {
        self.buckets.len()
    }
}

impl FromIterator<BlockRecord> for BlockIndex {
    fn from_iter<I: IntoIterator<Item = BlockRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

impl Extend<BlockRecord> for BlockIndex {
    fn extend<I: IntoIterator<Item = BlockRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::rolling;
    use crate::hash::strong::Sha256Hasher;

    fn record(index: u64, data: &[u8]) -> BlockRecord {
        BlockRecord {
            index,
            weak_checksum: rolling::checksum(data),
            strong_checksum: Sha256Hasher.digest(data),
        }
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = BlockIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.find(rolling::checksum(b"abc"), b"abc", &Sha256Hasher), None);
    }

    #[test]
    fn exact_block_found() {
        let index: BlockIndex = [record(0, b"abc"), record(1, b"def")].into_iter().collect();
        assert_eq!(index.len(), 2);
        assert_eq!(index.find(rolling::checksum(b"def"), b"def", &Sha256Hasher), Some(1));
    }

    #[test]
    fn weak_collision_needs_strong_confirmation() {
        let index: BlockIndex = [record(0, &[1, 0, 1])].into_iter().collect();
        let window = [0u8, 2, 0];
        let weak = rolling::checksum(&window);
        assert!(index.contains_weak(weak));
        assert_eq!(index.find(weak, &window, &Sha256Hasher), None);
    }

    #[test]
    fn duplicates_resolve_to_first_inserted() {
        let index: BlockIndex = [record(0, b"xyz"), record(1, b"abc"), record(2, b"abc")]
            .into_iter()
            .collect();
        assert_eq!(index.distinct_weak(), 2);
        for _ in 0..3 {
            assert_eq!(index.find(rolling::checksum(b"abc"), b"abc", &Sha256Hasher), Some(1));
        }
    }

    #[test]
    fn extend_appends() {
        let mut index = BlockIndex::new();
        index.extend([record(4, b"1234")]);
        index.insert(record(5, b"5678"));
        assert_eq!(index.len(), 2);
        assert_eq!(index.find(rolling::checksum(b"5678"), b"5678", &Sha256Hasher), Some(5));
    }
}
