// Crate-wide error type.
//
// Every stage is fail-fast: errors are returned to the caller, never logged
// and swallowed, and never retried internally.

use std::io;

/// Boxed error produced by a caller-supplied record/operation consumer.
pub type EmitError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by signature generation, delta generation and patching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read, write or seek failure on a content source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The consumer of a record or operation rejected it (closed channel,
    /// cancelled transport, failed write).
    #[error("emit failed: {0}")]
    Emit(#[source] EmitError),

    /// A block copy points at or past the end of the old content.
    #[error("invalid block reference: block {index} (offset {offset}) is beyond the old content")]
    InvalidBlockReference {
        /// Block index carried by the operation.
        index: u64,
        /// Byte offset the index resolves to (saturated on overflow).
        offset: u64,
    },

    /// Invalid options supplied at setup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A serialized signature or delta stream is malformed.
    #[error("malformed stream: {0}")]
    Format(String),
}

impl Error {
    /// Wrap a consumer failure.
    pub fn emit<E: Into<EmitError>>(err: E) -> Self {
        Self::Emit(err.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("short"));
    }

    #[test]
    fn emit_keeps_source() {
        let err = Error::emit("receiver hung up");
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "emit failed: receiver hung up");
    }

    #[test]
    fn block_reference_message() {
        let err = Error::InvalidBlockReference {
            index: 7,
            offset: 21,
        };
        assert_eq!(
            err.to_string(),
            "invalid block reference: block 7 (offset 21) is beyond the old content"
        );
    }
}
