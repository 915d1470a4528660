// Threaded sync pipeline.
//
// Runs the three stages as independent sequential loops joined by bounded
// channels, so consumption overlaps production and a slow consumer blocks a
// fast producer:
//
//   old ──> signature thread ──records──> index (caller thread)
//   new ──> generator thread ──operations──> applicator (caller thread) ──> output
//
// When the applicator fails its receiver is dropped; the generator's next
// send fails and it stops with `Error::Emit`. The applicator's error wins.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, ScopedJoinHandle};

use super::delta::build_delta_with_index;
use super::ops::Operation;
use super::patch::DeltaApplier;
use super::signature::{BlockRecord, build_signature};
use crate::config::SyncOptions;
use crate::error::Result;
use crate::hash::table::BlockIndex;

/// Counters reported by [`sync_streams`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Signature blocks of the old content.
    pub blocks: u64,
    /// Operations applied.
    pub operations: u64,
    /// Bytes of reconstructed output.
    pub bytes_written: u64,
}

/// Reconstruct `new` into `output` using `old` through the full
/// signature → delta → patch pipeline.
///
/// `old` is read twice from its current position: sequentially for the
/// signature, then rewound to that position and used for random-access
/// block copies. `capacity` bounds both channels
/// (0 makes every hand-off a rendezvous).
pub fn sync_streams<O, N, W>(
    old: &mut O,
    new: N,
    output: W,
    opts: &SyncOptions,
    capacity: usize,
) -> Result<(W, PipelineStats)>
where
    O: Read + Seek + Send,
    N: Read + Send,
    W: Write,
{
    opts.validate()?;
    let start = old.stream_position()?;

    let signer_input = &mut *old;
    let index = thread::scope(|s| -> Result<BlockIndex> {
        let (tx, rx) = mpsc::sync_channel::<BlockRecord>(capacity);
        let signer = s.spawn(move || build_signature(signer_input, opts, |r| tx.send(r)));
        let index: BlockIndex = rx.into_iter().collect();
        join(signer)?;
        Ok(index)
    })?;

    old.seek(SeekFrom::Start(start))?;

    let source = &mut *old;
    let index_ref = &index;
    let (output, operations, bytes_written) = thread::scope(|s| -> Result<(W, u64, u64)> {
        let (tx, rx) = mpsc::sync_channel::<Operation>(capacity);
        let generator =
            s.spawn(move || build_delta_with_index(new, index_ref, opts, |op| tx.send(op)));
        let applied = drain(output, source, start, rx, opts);
        let generated = join(generator);
        let applied = applied?;
        generated?;
        Ok(applied)
    })?;

    let stats = PipelineStats {
        blocks: index.len() as u64,
        operations,
        bytes_written,
    };
    log::debug!(
        "pipeline: {} blocks, {} operations, {} bytes",
        stats.blocks,
        stats.operations,
        stats.bytes_written
    );
    Ok((output, stats))
}

/// Apply every operation from `ops`; the receiver is dropped on return.
fn drain<W, S>(
    output: W,
    source: S,
    base: u64,
    ops: Receiver<Operation>,
    opts: &SyncOptions,
) -> Result<(W, u64, u64)>
where
    W: Write,
    S: Read + Seek,
{
    let mut applier = DeltaApplier::with_base(output, source, base, opts)?;
    for op in ops {
        applier.apply(&op)?;
    }
    let operations = applier.operations_applied();
    let bytes_written = applier.bytes_written();
    Ok((applier.finish()?, operations, bytes_written))
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
