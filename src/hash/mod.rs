// Checksums and block lookup for rsync-style matching.
//
// This module provides:
// - The weak rolling checksum (O(1) per-byte window updates)
// - Pluggable strong digests that confirm weak candidates
// - The weak-checksum index over signature records

pub mod rolling;
pub mod strong;
pub mod table;

pub use rolling::RollingChecksum;
pub use strong::{StrongHash, StrongHasher};
pub use table::BlockIndex;
