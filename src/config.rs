// Synchronization options shared by all three stages.
//
// The same block size must be used for the signature, the delta built from
// it, and the patch applied with that delta.

use crate::error::{Error, Result};
use crate::hash::strong::StrongHash;

/// Default block size (6 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 6 * 1024;

/// Default literal bound as a multiple of the block size.
pub const LITERAL_RUN_FACTOR: usize = 10;

/// Default bounded-channel capacity for the threaded pipeline.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for signature, delta and patch.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Size of each old-content block in bytes (the last block may be shorter).
    pub block_size: usize,
    /// Upper bound on the payload of a single literal operation.
    pub max_literal_run: usize,
    /// Strong digest used to confirm weak-checksum candidates.
    pub strong_hash: StrongHash,
    /// Merge runs of consecutive block copies into block ranges.
    pub coalesce_blocks: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }
}

impl SyncOptions {
    /// Options for `block_size` with the default literal bound
    /// (`LITERAL_RUN_FACTOR` blocks).
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            max_literal_run: block_size.saturating_mul(LITERAL_RUN_FACTOR),
            strong_hash: StrongHash::default(),
            coalesce_blocks: false,
        }
    }

    /// Reject options no stage can run with.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::Config("block size must be positive".into()));
        }
        if self.max_literal_run == 0 {
            return Err(Error::Config("literal run bound must be positive".into()));
        }
        if self.strong_hash.hasher().digest_len() == 0 {
            return Err(Error::Config(format!(
                "strong hash {} produces an empty digest",
                self.strong_hash.hasher().name()
            )));
        }
        Ok(())
    }
}
