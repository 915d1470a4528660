// Byte formats for persisting signatures and deltas.
//
// - `varint`: base-128 big-endian integers
// - `header`: magic, version and parameters for each stream kind
// - `signature`: SignatureWriter / SignatureReader
// - `delta`: DeltaWriter / DeltaReader
//
// Readers report damaged input as `Error::Format`; other I/O failures stay
// `Error::Io`.

use std::io;

use crate::error::Error;

pub mod delta;
pub mod header;
pub mod signature;
pub mod varint;

pub use delta::{DeltaReader, DeltaWriter};
pub use header::{DeltaHeader, SignatureHeader};
pub use signature::{SignatureReader, SignatureWriter};

/// Classify a read failure while decoding `what`.
pub(crate) fn malformed(what: &str, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => Error::Format(format!("truncated {what}")),
        io::ErrorKind::InvalidData => Error::Format(format!("{what}: {err}")),
        _ => Error::Io(err),
    }
}
