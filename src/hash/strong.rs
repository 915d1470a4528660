// Strong block digests.
//
// Provides a pluggable `StrongHasher` trait with built-in implementations:
//   - SHA-256 (default) and SHA-512 via sha2
//   - BLAKE3 (feature-gated `blake3`)
//   - External/custom digests via the trait
//
// Signature streams record the hasher ID so the delta side can pick the
// same algorithm:
//   ID 1 = SHA-256
//   ID 2 = SHA-512
//   ID 3 = BLAKE3

use std::sync::Arc;

use sha2::Digest;

/// Hasher ID for SHA-256.
pub const SHA256_ID: u8 = 1;
/// Hasher ID for SHA-512.
pub const SHA512_ID: u8 = 2;
/// Hasher ID for BLAKE3.
pub const BLAKE3_ID: u8 = 3;

// ---------------------------------------------------------------------------
// StrongHasher trait
// ---------------------------------------------------------------------------

/// A fixed-length digest over a byte sequence.
///
/// Any algorithm whose accidental collisions are negligible can confirm
/// weak-checksum candidates. The surrounding algorithm only relies on equal
/// inputs producing equal digests of `digest_len()` bytes.
///
/// # Implementing a custom hasher
///
/// ```no_run
/// use rdelta::hash::strong::StrongHasher;
///
/// struct Fnv;
///
/// impl StrongHasher for Fnv {
///     fn id(&self) -> u8 { 200 }
///     fn name(&self) -> &'static str { "fnv64" }
///     fn digest_len(&self) -> usize { 8 }
///     fn digest(&self, data: &[u8]) -> Vec<u8> {
///         let mut h: u64 = 0xcbf29ce484222325;
///         for &b in data {
///             h = (h ^ b as u64).wrapping_mul(0x100000001b3);
///         }
///         h.to_be_bytes().to_vec()
///     }
/// }
/// ```
pub trait StrongHasher: Send + Sync {
    /// ID stored in signature streams. Custom hashers should avoid 1..=3.
    fn id(&self) -> u8;

    /// Short display name.
    fn name(&self) -> &'static str;

    /// Length of every digest in bytes.
    fn digest_len(&self) -> usize;

    /// Digest of `data`.
    fn digest(&self, data: &[u8]) -> Vec<u8>;
}

// ---------------------------------------------------------------------------
// Built-in hashers
// ---------------------------------------------------------------------------

/// SHA-256 (32-byte digests).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl StrongHasher for Sha256Hasher {
    fn id(&self) -> u8 {
        SHA256_ID
    }

    fn name(&self) -> &'static str {
        "sha256"
    }

    fn digest_len(&self) -> usize {
        32
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        sha2::Sha256::digest(data).to_vec()
    }
}

/// SHA-512 (64-byte digests).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Hasher;

impl StrongHasher for Sha512Hasher {
    fn id(&self) -> u8 {
        SHA512_ID
    }

    fn name(&self) -> &'static str {
        "sha512"
    }

    fn digest_len(&self) -> usize {
        64
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        sha2::Sha512::digest(data).to_vec()
    }
}

/// BLAKE3 (32-byte digests).
#[cfg(feature = "blake3")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

#[cfg(feature = "blake3")]
impl StrongHasher for Blake3Hasher {
    fn id(&self) -> u8 {
        BLAKE3_ID
    }

    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest_len(&self) -> usize {
        blake3::OUT_LEN
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// The strong digest algorithm to use.
#[derive(Clone, Default)]
pub enum StrongHash {
    /// SHA-256 (ID 1).
    #[default]
    Sha256,
    /// SHA-512 (ID 2).
    Sha512,
    /// BLAKE3 (ID 3).
    #[cfg(feature = "blake3")]
    Blake3,
    /// A hasher provided by the caller.
    Custom(Arc<dyn StrongHasher>),
}

impl std::fmt::Debug for StrongHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "Sha256"),
            Self::Sha512 => write!(f, "Sha512"),
            #[cfg(feature = "blake3")]
            Self::Blake3 => write!(f, "Blake3"),
            Self::Custom(h) => write!(f, "Custom({}, id={})", h.name(), h.id()),
        }
    }
}

impl StrongHash {
    /// The hasher implementation.
    pub fn hasher(&self) -> &dyn StrongHasher {
        match self {
            Self::Sha256 => &Sha256Hasher,
            Self::Sha512 => &Sha512Hasher,
            #[cfg(feature = "blake3")]
            Self::Blake3 => &Blake3Hasher,
            Self::Custom(h) => h.as_ref(),
        }
    }

    /// ID recorded in signature streams.
    pub fn id(&self) -> u8 {
        self.hasher().id()
    }

    /// Built-in algorithm for a stream ID, if known.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            SHA256_ID => Some(Self::Sha256),
            SHA512_ID => Some(Self::Sha512),
            #[cfg(feature = "blake3")]
            BLAKE3_ID => Some(Self::Blake3),
            _ => None,
        }
    }

    /// Built-in algorithm by display name, if known.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Some(Self::Sha256),
            "sha512" | "sha-512" => Some(Self::Sha512),
            #[cfg(feature = "blake3")]
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }
}
