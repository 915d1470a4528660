// Signature builder.
//
// Reads the old content once, sequentially, one block at a time, and yields
// a weak + strong checksum record per block. Only one block is buffered.

use std::io::Read;

use super::read_full;
use crate::config::SyncOptions;
use crate::error::{EmitError, Error, Result};
use crate::hash::rolling;
use crate::hash::strong::StrongHash;

/// Checksums of one old-content block.
///
/// `index * block_size` is the block's byte offset; the final block may be
/// shorter than `block_size` and is summed over the bytes present only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockRecord {
    /// 0-based block position.
    pub index: u64,
    /// Weak rolling checksum of the block.
    pub weak_checksum: u32,
    /// Strong digest of the block.
    pub strong_checksum: Vec<u8>,
}

/// Iterator over the block records of a reader.
///
/// Stops after the first error.
pub struct BlockSignatures<R: Read> {
    reader: R,
    strong_hash: StrongHash,
    buf: Vec<u8>,
    next_index: u64,
    done: bool,
}

impl<R: Read> BlockSignatures<R> {
    /// Start reading `reader` in blocks of `opts.block_size`.
    pub fn new(reader: R, opts: &SyncOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            reader,
            strong_hash: opts.strong_hash.clone(),
            buf: vec![0u8; opts.block_size],
            next_index: 0,
            done: false,
        })
    }

    /// Number of records produced so far.
    pub fn blocks_read(&self) -> u64 {
        self.next_index
    }

    fn next_record(&mut self) -> Result<Option<BlockRecord>> {
        let n = read_full(&mut self.reader, &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        let block = &self.buf[..n];
        let record = BlockRecord {
            index: self.next_index,
            weak_checksum: rolling::checksum(block),
            strong_checksum: self.strong_hash.hasher().digest(block),
        };
        self.next_index += 1;
        if n < self.buf.len() {
            // Short block: nothing can follow it.
            self.done = true;
        }
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for BlockSignatures<R> {
    type Item = Result<BlockRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Build the signature of `reader`, handing each record to `emit` in order.
///
/// A failing `emit` aborts before the next block is read and surfaces as
/// `Error::Emit`. Empty input emits nothing.
pub fn build_signature<R, F, E>(reader: R, opts: &SyncOptions, mut emit: F) -> Result<()>
where
    R: Read,
    F: FnMut(BlockRecord) -> std::result::Result<(), E>,
    E: Into<EmitError>,
{
    let mut blocks = BlockSignatures::new(reader, opts)?;
    for record in blocks.by_ref() {
        emit(record?).map_err(Error::emit)?;
    }
    log::debug!(
        "signature: {} blocks of {} bytes ({})",
        blocks.blocks_read(),
        opts.block_size,
        opts.strong_hash.hasher().name()
    );
    Ok(())
}
