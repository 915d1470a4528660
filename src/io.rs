// File-level helpers for signature, delta and patch.
//
// Wrap the streaming stages and the wire formats with buffered file I/O:
//   - signature_file: old file -> signature file
//   - delta_file:     signature file + new file -> delta file
//   - patch_file:     old file + delta file -> reconstructed file
//   - sync_file:      old file + new file -> reconstructed file (threaded)
//
// Delta and patch compute a streaming SHA-256 of the new content and of the
// reconstruction, so callers can verify the transfer end to end.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::hash::BlockIndex;
use crate::sync::{self, BlockSignatures, DeltaApplier, OperationStats};
use crate::wire::{DeltaReader, DeltaWriter, SignatureReader, SignatureWriter};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by [`signature_file`].
#[derive(Debug, Clone)]
pub struct SignatureStats {
    pub old_size: u64,
    pub blocks: u64,
    pub signature_size: u64,
}

/// Statistics returned by [`delta_file`].
#[derive(Debug, Clone)]
pub struct DeltaStats {
    pub new_size: u64,
    /// Records in the signature the delta was built against.
    pub signature_blocks: u64,
    pub operations: OperationStats,
    pub delta_size: u64,
    /// SHA-256 of the new content as read.
    pub new_sha256: [u8; 32],
}

/// Statistics returned by [`patch_file`].
#[derive(Debug, Clone)]
pub struct PatchStats {
    pub old_size: u64,
    pub delta_size: u64,
    pub operations: u64,
    pub output_size: u64,
    /// SHA-256 of the reconstruction as written.
    pub output_sha256: [u8; 32],
}

/// Statistics returned by [`sync_file`].
#[derive(Debug, Clone)]
pub struct SyncStats {
    pub old_size: u64,
    pub blocks: u64,
    pub operations: u64,
    pub output_size: u64,
    pub output_sha256: [u8; 32],
}

/// Delta settings that do not come from the signature header.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaFileOptions {
    /// Literal bound; defaults to the block size times the literal factor.
    pub max_literal_run: Option<usize>,
    pub coalesce_blocks: bool,
}

/// Lowercase hex of a digest.
pub fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// signature_file
// ---------------------------------------------------------------------------

/// Write the signature of `old_path` to `signature_path`.
pub fn signature_file(
    old_path: &Path,
    signature_path: &Path,
    opts: &SyncOptions,
) -> Result<SignatureStats> {
    let old = File::open(old_path)?;
    let old_size = old.metadata()?.len();
    let blocks = BlockSignatures::new(BufReader::with_capacity(BUF_SIZE, old), opts)?;

    let out = BufWriter::with_capacity(BUF_SIZE, File::create(signature_path)?);
    let mut writer = SignatureWriter::new(out, opts)?;
    for record in blocks {
        writer.write_record(&record?)?;
    }
    let blocks = writer.records_written();
    let signature_size = writer
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();

    log::debug!(
        "signature_file: {} -> {} ({blocks} blocks)",
        old_path.display(),
        signature_path.display()
    );
    Ok(SignatureStats {
        old_size,
        blocks,
        signature_size,
    })
}

// ---------------------------------------------------------------------------
// delta_file
// ---------------------------------------------------------------------------

/// Write the delta from the signed content to `new_path` into `delta_path`.
///
/// Block size and strong hash are taken from the signature header. A failed
/// write to `delta_path` is reported as [`Error::Io`].
pub fn delta_file(
    signature_path: &Path,
    new_path: &Path,
    delta_path: &Path,
    tuning: DeltaFileOptions,
) -> Result<DeltaStats> {
    let sig = SignatureReader::new(BufReader::with_capacity(
        BUF_SIZE,
        File::open(signature_path)?,
    ))?;
    let mut opts = sig.options().clone();
    if let Some(bound) = tuning.max_literal_run {
        opts.max_literal_run = bound;
    }
    opts.coalesce_blocks = tuning.coalesce_blocks;
    opts.validate()?;

    let index = sig.collect::<Result<BlockIndex>>()?;
    let signature_blocks = index.len() as u64;

    let mut new = HashingReader::new(BufReader::with_capacity(BUF_SIZE, File::open(new_path)?));
    let out = BufWriter::with_capacity(BUF_SIZE, File::create(delta_path)?);
    let mut writer = DeltaWriter::new(out, &opts)?;
    let mut operations = OperationStats::default();
    sync::build_delta_with_index(&mut new, &index, &opts, |op| {
        operations.record(&op);
        writer.write_op(&op)
    })
    .map_err(unwrap_emit)?;

    let delta_size = writer
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();
    let (new_size, new_sha256) = new.finish();

    Ok(DeltaStats {
        new_size,
        signature_blocks,
        operations,
        delta_size,
        new_sha256,
    })
}

/// The delta sink here is ours, so its errors keep their own variant.
fn unwrap_emit(err: Error) -> Error {
    match err {
        Error::Emit(inner) => match inner.downcast::<Error>() {
            Ok(err) => *err,
            Err(inner) => Error::Emit(inner),
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Apply `delta_path` to `old_path`, writing the reconstruction to `output_path`.
pub fn patch_file(old_path: &Path, delta_path: &Path, output_path: &Path) -> Result<PatchStats> {
    let old = File::open(old_path)?;
    let old_size = old.metadata()?.len();
    let delta = File::open(delta_path)?;
    let delta_size = delta.metadata()?.len();
    let ops = DeltaReader::new(BufReader::with_capacity(BUF_SIZE, delta))?;
    let opts = ops.options();

    let out = HashingWriter::new(BufWriter::with_capacity(
        BUF_SIZE,
        File::create(output_path)?,
    ));
    let mut applier = DeltaApplier::new(out, BufReader::with_capacity(BUF_SIZE, old), &opts)?;
    for op in ops {
        applier.apply(&op?)?;
    }
    let operations = applier.operations_applied();
    let (writer, output_size, output_sha256) = applier.finish()?.finish();
    writer.into_inner().map_err(|e| e.into_error())?;

    Ok(PatchStats {
        old_size,
        delta_size,
        operations,
        output_size,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// sync_file
// ---------------------------------------------------------------------------

/// Rebuild `new_path` into `output_path` from `old_path` with the threaded
/// pipeline, without intermediate files.
pub fn sync_file(
    old_path: &Path,
    new_path: &Path,
    output_path: &Path,
    opts: &SyncOptions,
    capacity: usize,
) -> Result<SyncStats> {
    let old = File::open(old_path)?;
    let old_size = old.metadata()?.len();
    let mut old = BufReader::with_capacity(BUF_SIZE, old);
    let new = BufReader::with_capacity(BUF_SIZE, File::open(new_path)?);
    let out = HashingWriter::new(BufWriter::with_capacity(
        BUF_SIZE,
        File::create(output_path)?,
    ));

    let (out, stats) = sync::sync_streams(&mut old, new, out, opts, capacity)?;
    let (writer, output_size, output_sha256) = out.finish();
    writer.into_inner().map_err(|e| e.into_error())?;

    Ok(SyncStats {
        old_size,
        blocks: stats.blocks,
        operations: stats.operations,
        output_size,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Hashing adapters
// ---------------------------------------------------------------------------

struct HashingReader<R: Read> {
    inner: R,
    hasher: Sha256,
    bytes: u64,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn finish(self) -> (u64, [u8; 32]) {
        (self.bytes, self.hasher.finalize().into())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}

struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn finish(self) -> (W, u64, [u8; 32]) {
        (self.inner, self.bytes, self.hasher.finalize().into())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
