// In-memory engine: the three stages over byte slices.
//
// Convenience wrappers for callers that already hold both versions in
// memory. They run the streaming stages sequentially and collect results:
//   - signature / delta / patch / sync work on records and operations
//   - diff / apply produce and consume the serialized delta stream

use std::convert::Infallible;
use std::io::Cursor;

use crate::config::SyncOptions;
use crate::error::Result;
use crate::sync::{self, BlockRecord, Operation};
use crate::wire::{DeltaReader, DeltaWriter};

/// Block signatures of `old`, in block order.
pub fn signature(old: &[u8], opts: &SyncOptions) -> Result<Vec<BlockRecord>> {
    let mut records = Vec::with_capacity(old.len() / opts.block_size.max(1) + 1);
    sync::build_signature(old, opts, |record| {
        records.push(record);
        Ok::<_, Infallible>(())
    })?;
    Ok(records)
}

/// Operations turning the signed content into `new`.
pub fn delta<I>(signature: I, new: &[u8], opts: &SyncOptions) -> Result<Vec<Operation>>
where
    I: IntoIterator<Item = BlockRecord>,
{
    let mut ops = Vec::new();
    sync::build_delta(new, signature, opts, |op| {
        ops.push(op);
        Ok::<_, Infallible>(())
    })?;
    Ok(ops)
}

/// Rebuild the new content from `old` and `ops`.
pub fn patch(old: &[u8], ops: &[Operation], opts: &SyncOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    sync::apply_delta(&mut out, Cursor::new(old), ops.iter().cloned(), opts)?;
    Ok(out)
}

/// Signature, delta and patch in sequence; returns the reconstruction of `new`.
pub fn sync(old: &[u8], new: &[u8], opts: &SyncOptions) -> Result<Vec<u8>> {
    let sig = signature(old, opts)?;
    let ops = delta(sig, new, opts)?;
    patch(old, &ops, opts)
}

/// Serialized delta (see [`crate::wire::delta`]) from `old` to `new`.
pub fn diff(old: &[u8], new: &[u8], opts: &SyncOptions) -> Result<Vec<u8>> {
    let sig = signature(old, opts)?;
    let mut writer = DeltaWriter::new(Vec::new(), opts)?;
    sync::build_delta(new, sig, opts, |op| writer.write_op(&op))?;
    writer.finish()
}

/// Apply a serialized delta to `old`. Block size comes from the delta header.
pub fn apply(old: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let reader = DeltaReader::new(delta)?;
    let opts = reader.options();
    let mut out = Vec::new();
    sync::try_apply_delta(&mut out, Cursor::new(old), reader, &opts)?;
    Ok(out)
}
