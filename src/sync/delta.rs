// Delta generator.
//
// Slides a `block_size` window over the new content in a single pass:
//   - The weak checksum rolls in O(1) per byte; it is only recomputed from
//     scratch after a match skips the window past a whole block.
//   - Every weak hit is confirmed by the strong digest before a copy is emitted.
//   - Unmatched bytes accumulate in a literal buffer flushed at
//     `max_literal_run`, before each copy, and at end of input.
//
// The new content is streamed through a compacting buffer, so memory stays
// O(block_size + READ_CHUNK + max_literal_run) regardless of input length.

use std::io::{self, Read};

use super::ops::{Coalescer, Operation, OperationStats};
use super::signature::BlockRecord;
use crate::config::SyncOptions;
use crate::error::{EmitError, Error, Result};
use crate::hash::rolling::RollingChecksum;
use crate::hash::table::BlockIndex;

/// Bytes requested from the new-content reader per refill.
const READ_CHUNK: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Input window
// ---------------------------------------------------------------------------

/// Buffered view of the new content from the window start onward.
struct Window<R: Read> {
    reader: R,
    buf: Vec<u8>,
    /// Window start within `buf`.
    pos: usize,
    /// Absolute offset of `buf[0]` in the new content.
    base: u64,
    chunk: usize,
    eof: bool,
}

impl<R: Read> Window<R> {
    fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            base: 0,
            chunk: READ_CHUNK.max(block_size.saturating_add(1)),
            eof: false,
        }
    }

    /// Bytes buffered from the window start.
    #[inline]
    fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Absolute offset of the window start.
    fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Buffer at least `want` bytes past the window start, unless input ends first.
    fn fill(&mut self, want: usize) -> io::Result<()> {
        while !self.eof && self.available() < want {
            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.base += self.pos as u64;
                self.pos = 0;
            }
            let old_len = self.buf.len();
            self.buf.resize(old_len + self.chunk, 0);
            let n = loop {
                match self.reader.read(&mut self.buf[old_len..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.truncate(old_len);
                        return Err(e);
                    }
                }
            };
            self.buf.truncate(old_len + n);
            if n == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Generate the operations turning the signed old content into `reader`'s content.
///
/// Builds a private [`BlockIndex`] from `signature`, then streams the new
/// content once. Each operation is handed to `emit` in order; a failing
/// `emit` aborts immediately with `Error::Emit`. Empty input emits nothing.
pub fn build_delta<R, I, F, E>(reader: R, signature: I, opts: &SyncOptions, emit: F) -> Result<()>
where
    R: Read,
    I: IntoIterator<Item = BlockRecord>,
    F: FnMut(Operation) -> std::result::Result<(), E>,
    E: Into<EmitError>,
{
    opts.validate()?;
    let index: BlockIndex = signature.into_iter().collect();
    log::debug!(
        "delta: indexed {} blocks ({} distinct weak checksums)",
        index.len(),
        index.distinct_weak()
    );
    build_delta_with_index(reader, &index, opts, emit)
}

/// Like [`build_delta`], against an index the caller already built.
pub fn build_delta_with_index<R, F, E>(
    reader: R,
    index: &BlockIndex,
    opts: &SyncOptions,
    mut emit: F,
) -> Result<()>
where
    R: Read,
    F: FnMut(Operation) -> std::result::Result<(), E>,
    E: Into<EmitError>,
{
    opts.validate()?;
    let mut sink = |op: Operation| -> Result<()> { emit(op).map_err(Error::emit) };

    let stats = if opts.coalesce_blocks {
        let mut coalescer = Coalescer::default();
        let mut merged = |op: Operation| coalescer.push(op, &mut sink);
        let stats = generate(reader, index, opts, &mut merged)?;
        coalescer.finish(&mut sink)?;
        stats
    } else {
        generate(reader, index, opts, &mut sink)?
    };

    log::debug!(
        "delta: {} literal bytes in {} ops, {} block copies",
        stats.literal_bytes,
        stats.literal_ops,
        stats.copied_blocks
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Matching loop
// ---------------------------------------------------------------------------

fn generate<R, F>(
    reader: R,
    index: &BlockIndex,
    opts: &SyncOptions,
    emit: &mut F,
) -> Result<OperationStats>
where
    R: Read,
    F: FnMut(Operation) -> Result<()>,
{
    let block_size = opts.block_size;
    let hasher = opts.strong_hash.hasher();
    let mut window = Window::new(reader, block_size);
    let mut literal: Vec<u8> = Vec::new();
    let mut sum: Option<RollingChecksum> = None;
    let mut stats = OperationStats::default();

    loop {
        // One byte beyond the window so the next roll has its incoming byte.
        window.fill(block_size.saturating_add(1))?;
        let avail = window.available();
        if avail == 0 {
            break;
        }
        let start = window.pos;
        let len = avail.min(block_size);
        let bytes = &window.buf[start..start + len];
        let rolling = sum.get_or_insert_with(|| RollingChecksum::new(bytes));

        if let Some(block) = index.find(rolling.digest(), bytes, hasher) {
            log::trace!("block {block} matches new offset {}", window.offset());
            flush_literal(&mut literal, emit, &mut stats)?;
            let op = Operation::BlockCopy { index: block };
            stats.record(&op);
            emit(op)?;
            window.pos += len;
            sum = None;
            continue;
        }

        let out = bytes[0];
        if avail > block_size {
            rolling.roll(out, window.buf[start + block_size]);
        } else {
            rolling.roll_out(out);
        }
        window.pos += 1;

        literal.push(out);
        if literal.len() >= opts.max_literal_run {
            flush_literal(&mut literal, emit, &mut stats)?;
        }
    }

    flush_literal(&mut literal, emit, &mut stats)?;
    Ok(stats)
}

fn flush_literal<F>(literal: &mut Vec<u8>, emit: &mut F, stats: &mut OperationStats) -> Result<()>
where
    F: FnMut(Operation) -> Result<()>,
{
    if literal.is_empty() {
        return Ok(());
    }
    let op = Operation::Literal(std::mem::take(literal));
    stats.record(&op);
    emit(op)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
