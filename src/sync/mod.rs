// The three rsync stages and the pipeline connecting them:
//
// - `signature`: BlockSignatures / build_signature: weak + strong sums per old block
// - `delta`: build_delta: sliding-window matching against a signature
// - `patch`: DeltaApplier / apply_delta: rebuild new content from old + operations
// - `ops`: Operation stream type, coalescing, stats
// - `pipeline`: threaded stages joined by bounded channels

use std::io::{self, Read};

pub mod delta;
pub mod ops;
pub mod patch;
pub mod pipeline;
pub mod signature;

pub use delta::{build_delta, build_delta_with_index};
pub use ops::{Operation, OperationStats};
pub use patch::{DeltaApplier, apply_delta, try_apply_delta};
pub use pipeline::{PipelineStats, sync_streams};
pub use signature::{BlockRecord, BlockSignatures, build_signature};

/// Read until `buf` is full or the reader is exhausted.
///
/// Returns the number of bytes read; less than `buf.len()` only at end of input.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
