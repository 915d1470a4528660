// Delta applicator.
//
// DeltaApplier rebuilds the new content from a seekable view of the old
// content plus an operation stream:
//   - Literal payloads are written verbatim
//   - Block copies seek to `index * block_size` and copy up to one block
//     (a short final block is expected, an empty read is an invalid reference)
//
// Output already written is not rolled back on error. The stream ending is
// the only success condition; total length is not checked here.

use std::io::{Read, Seek, SeekFrom, Write};

use super::ops::Operation;
use super::read_full;
use crate::config::SyncOptions;
use crate::error::{Error, Result};

/// Streaming delta applicator with progress tracking.
pub struct DeltaApplier<W: Write, S: Read + Seek> {
    output: W,
    source: S,
    /// Position of block 0 within `source`.
    base: u64,
    block_size: usize,
    /// Reusable block buffer.
    block: Vec<u8>,
    bytes_written: u64,
    operations_applied: u64,
}

impl<W: Write, S: Read + Seek> DeltaApplier<W, S> {
    /// Create an applicator writing to `output` and copying blocks from `source`.
    pub fn new(output: W, source: S, opts: &SyncOptions) -> Result<Self> {
        Self::with_base(output, source, 0, opts)
    }

    /// Like [`new`](Self::new), for old content starting at byte `base` of `source`.
    pub fn with_base(output: W, source: S, base: u64, opts: &SyncOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            output,
            source,
            base,
            block_size: opts.block_size,
            block: vec![0u8; opts.block_size],
            bytes_written: 0,
            operations_applied: 0,
        })
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Literal(data) => {
                self.output.write_all(data)?;
                self.bytes_written += data.len() as u64;
            }
            Operation::BlockCopy { index } => self.copy_block(*index)?,
            Operation::BlockRange { first, last } => {
                for index in *first..=*last {
                    self.copy_block(index)?;
                }
            }
        }
        self.operations_applied += 1;
        Ok(())
    }

    fn copy_block(&mut self, index: u64) -> Result<()> {
        let offset = index
            .checked_mul(self.block_size as u64)
            .ok_or(Error::InvalidBlockReference {
                index,
                offset: u64::MAX,
            })?;
        let position = self
            .base
            .checked_add(offset)
            .ok_or(Error::InvalidBlockReference { index, offset })?;
        self.source.seek(SeekFrom::Start(position))?;
        let n = read_full(&mut self.source, &mut self.block)?;
        if n == 0 {
            return Err(Error::InvalidBlockReference { index, offset });
        }
        self.output.write_all(&self.block[..n])?;
        self.bytes_written += n as u64;
        Ok(())
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Operations applied so far.
    pub fn operations_applied(&self) -> u64 {
        self.operations_applied
    }

    /// Flush the output and return it.
    pub fn finish(mut self) -> Result<W> {
        self.output.flush()?;
        log::debug!(
            "patch: {} operations, {} bytes written",
            self.operations_applied,
            self.bytes_written
        );
        Ok(self.output)
    }
}

/// Apply `operations` in arrival order, writing the reconstruction to `output`.
///
/// `operations` may be any sequential source, including the receiving end of
/// a channel fed by a concurrent generator. Returns the bytes written.
pub fn apply_delta<W, S, I>(output: W, old: S, operations: I, opts: &SyncOptions) -> Result<u64>
where
    W: Write,
    S: Read + Seek,
    I: IntoIterator<Item = Operation>,
{
    let mut applier = DeltaApplier::new(output, old, opts)?;
    for op in operations {
        applier.apply(&op)?;
    }
    let written = applier.bytes_written();
    applier.finish()?;
    Ok(written)
}

/// Like [`apply_delta`], for fallible operation streams (e.g. a delta file reader).
pub fn try_apply_delta<W, S, I, E>(
    output: W,
    old: S,
    operations: I,
    opts: &SyncOptions,
) -> Result<u64>
where
    W: Write,
    S: Read + Seek,
    I: IntoIterator<Item = std::result::Result<Operation, E>>,
    E: Into<Error>,
{
    let mut applier = DeltaApplier::new(output, old, opts)?;
    for op in operations {
        applier.apply(&op.map_err(Into::<Error>::into)?)?;
    }
    let written = applier.bytes_written();
    applier.finish()?;
    Ok(written)
}
