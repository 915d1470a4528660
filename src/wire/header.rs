// Stream headers for signature and delta files.
//
// Both start with a 4-byte magic and a version byte:
//
//   signature: "RDSG" 0x01 <block_size> <hash id: u8> <digest_len>
//   delta:     "RDDL" 0x01 <block_size> <max_literal_run>
//
// Integers are varints unless noted.

use std::io::{Read, Write};

use super::{malformed, varint};
use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::hash::StrongHash;

pub const SIGNATURE_MAGIC: [u8; 4] = *b"RDSG";
pub const DELTA_MAGIC: [u8; 4] = *b"RDDL";
pub const FORMAT_VERSION: u8 = 1;

/// Refuse headers announcing blocks larger than this.
pub const MAX_BLOCK_SIZE: usize = 1 << 30;

fn write_preamble<W: Write + ?Sized>(w: &mut W, magic: &[u8; 4]) -> Result<()> {
    w.write_all(magic)?;
    w.write_all(&[FORMAT_VERSION])?;
    Ok(())
}

fn read_preamble<R: Read + ?Sized>(r: &mut R, magic: &[u8; 4], what: &str) -> Result<()> {
    let mut head = [0u8; 5];
    r.read_exact(&mut head).map_err(|e| malformed(what, e))?;
    if head[..4] != magic[..] {
        return Err(Error::Format(format!(
            "not a {what}: expected magic {:?}, got {:02X?}",
            String::from_utf8_lossy(magic),
            &head[..4]
        )));
    }
    if head[4] != FORMAT_VERSION {
        return Err(Error::Format(format!(
            "unsupported {what} version {:#04X}",
            head[4]
        )));
    }
    Ok(())
}

fn check_block_size(block_size: usize, what: &str) -> Result<()> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(Error::Format(format!(
            "{what} declares block size {block_size}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Signature header
// ---------------------------------------------------------------------------

/// Parameters a signature was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    pub block_size: usize,
    pub hash_id: u8,
    pub digest_len: usize,
}

impl SignatureHeader {
    pub fn from_options(opts: &SyncOptions) -> Self {
        let hasher = opts.strong_hash.hasher();
        Self {
            block_size: opts.block_size,
            hash_id: hasher.id(),
            digest_len: hasher.digest_len(),
        }
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_preamble(w, &SIGNATURE_MAGIC)?;
        varint::write_usize(w, self.block_size)?;
        w.write_all(&[self.hash_id])?;
        varint::write_usize(w, self.digest_len)?;
        Ok(())
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        const WHAT: &str = "signature header";
        read_preamble(r, &SIGNATURE_MAGIC, "signature stream")?;
        let block_size = varint::read_usize(r).map_err(|e| malformed(WHAT, e))?;
        check_block_size(block_size, WHAT)?;
        let mut id = [0u8; 1];
        r.read_exact(&mut id).map_err(|e| malformed(WHAT, e))?;
        let digest_len = varint::read_usize(r).map_err(|e| malformed(WHAT, e))?;
        Ok(Self {
            block_size,
            hash_id: id[0],
            digest_len,
        })
    }

    /// Resolve the header's hash id to a built-in algorithm.
    pub fn strong_hash(&self) -> Result<StrongHash> {
        let hash = StrongHash::from_id(self.hash_id).ok_or_else(|| {
            Error::Format(format!("unknown strong hash id {}", self.hash_id))
        })?;
        self.check_hash(&hash)?;
        Ok(hash)
    }

    /// Confirm `hash` is the algorithm this header was written with.
    pub fn check_hash(&self, hash: &StrongHash) -> Result<()> {
        let hasher = hash.hasher();
        if hasher.id() != self.hash_id || hasher.digest_len() != self.digest_len {
            return Err(Error::Format(format!(
                "signature uses hash id {} ({}-byte digests), not {}",
                self.hash_id,
                self.digest_len,
                hasher.name()
            )));
        }
        Ok(())
    }

    /// Options matching this header, with the literal bound derived from
    /// the block size.
    pub fn to_options(&self) -> Result<SyncOptions> {
        Ok(SyncOptions {
            strong_hash: self.strong_hash()?,
            ..SyncOptions::with_block_size(self.block_size)
        })
    }
}

// ---------------------------------------------------------------------------
// Delta header
// ---------------------------------------------------------------------------

/// Parameters a delta was generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaHeader {
    pub block_size: usize,
    pub max_literal_run: usize,
}

impl DeltaHeader {
    pub fn from_options(opts: &SyncOptions) -> Self {
        Self {
            block_size: opts.block_size,
            max_literal_run: opts.max_literal_run,
        }
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_preamble(w, &DELTA_MAGIC)?;
        varint::write_usize(w, self.block_size)?;
        varint::write_usize(w, self.max_literal_run)?;
        Ok(())
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        const WHAT: &str = "delta header";
        read_preamble(r, &DELTA_MAGIC, "delta stream")?;
        let block_size = varint::read_usize(r).map_err(|e| malformed(WHAT, e))?;
        check_block_size(block_size, WHAT)?;
        let max_literal_run = varint::read_usize(r).map_err(|e| malformed(WHAT, e))?;
        if max_literal_run == 0 {
            return Err(Error::Format("delta header declares no literal bound".into()));
        }
        Ok(Self {
            block_size,
            max_literal_run,
        })
    }

    /// Options for applying this delta.
    pub fn to_options(&self) -> SyncOptions {
        SyncOptions {
            max_literal_run: self.max_literal_run,
            ..SyncOptions::with_block_size(self.block_size)
        }
    }
}
