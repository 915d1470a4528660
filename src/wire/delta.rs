// Delta stream encoding.
//
// Layout after the header (see `header`):
//
//   0x01 <len: varint> <len bytes>          literal
//   0x02 <index: varint>                    block copy
//   0x03 <first: varint> <last: varint>     block range, first < last
//   0x00                                    end
//
// Literal lengths are checked against the header's `max_literal_run`, and a
// literal's buffer grows only as its bytes actually arrive.

use std::io::{Read, Write};

use super::header::DeltaHeader;
use super::{malformed, varint};
use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::sync::Operation;

const TAG_END: u8 = 0x00;
const TAG_LITERAL: u8 = 0x01;
const TAG_COPY: u8 = 0x02;
const TAG_RANGE: u8 = 0x03;

/// Writes a delta stream operation by operation.
pub struct DeltaWriter<W: Write> {
    inner: W,
    header: DeltaHeader,
    operations: u64,
}

impl<W: Write> DeltaWriter<W> {
    pub fn new(mut inner: W, opts: &SyncOptions) -> Result<Self> {
        opts.validate()?;
        let header = DeltaHeader::from_options(opts);
        header.encode(&mut inner)?;
        Ok(Self {
            inner,
            header,
            operations: 0,
        })
    }

    pub fn write_op(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Literal(data) => {
                if data.len() > self.header.max_literal_run {
                    return Err(Error::Format(format!(
                        "literal of {} bytes exceeds the stream bound {}",
                        data.len(),
                        self.header.max_literal_run
                    )));
                }
                self.inner.write_all(&[TAG_LITERAL])?;
                varint::write_usize(&mut self.inner, data.len())?;
                self.inner.write_all(data)?;
            }
            Operation::BlockCopy { index } => {
                self.inner.write_all(&[TAG_COPY])?;
                varint::write_u64(&mut self.inner, *index)?;
            }
            Operation::BlockRange { first, last } => {
                if last <= first {
                    return Err(Error::Format(format!("empty block range {first}..={last}")));
                }
                self.inner.write_all(&[TAG_RANGE])?;
                varint::write_u64(&mut self.inner, *first)?;
                varint::write_u64(&mut self.inner, *last)?;
            }
        }
        self.operations += 1;
        Ok(())
    }

    pub fn operations_written(&self) -> u64 {
        self.operations
    }

    /// Write the terminator, flush, and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.write_all(&[TAG_END])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads a delta stream as an iterator of operations.
///
/// Yields `Err` once for a malformed or truncated stream and then stops, so
/// it can feed [`try_apply_delta`](crate::sync::try_apply_delta) directly.
pub struct DeltaReader<R: Read> {
    inner: R,
    header: DeltaHeader,
    done: bool,
}

impl<R: Read> DeltaReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let header = DeltaHeader::decode(&mut inner)?;
        Ok(Self {
            inner,
            header,
            done: false,
        })
    }

    pub fn header(&self) -> &DeltaHeader {
        &self.header
    }

    /// Options for applying this delta.
    pub fn options(&self) -> SyncOptions {
        self.header.to_options()
    }

    fn read_op(&mut self) -> Result<Option<Operation>> {
        const WHAT: &str = "delta operation";
        let mut tag = [0u8; 1];
        self.inner
            .read_exact(&mut tag)
            .map_err(|e| malformed("delta stream (missing terminator)", e))?;
        let op = match tag[0] {
            TAG_END => return Ok(None),
            TAG_LITERAL => {
                let len = varint::read_usize(&mut self.inner).map_err(|e| malformed(WHAT, e))?;
                if len > self.header.max_literal_run {
                    return Err(Error::Format(format!(
                        "literal of {len} bytes exceeds the stream bound {}",
                        self.header.max_literal_run
                    )));
                }
                let mut data = Vec::new();
                (&mut self.inner)
                    .take(len as u64)
                    .read_to_end(&mut data)
                    .map_err(|e| malformed(WHAT, e))?;
                if data.len() < len {
                    return Err(Error::Format(format!("truncated {WHAT}")));
                }
                Operation::Literal(data)
            }
            TAG_COPY => {
                let index = varint::read_u64(&mut self.inner).map_err(|e| malformed(WHAT, e))?;
                Operation::BlockCopy { index }
            }
            TAG_RANGE => {
                let first = varint::read_u64(&mut self.inner).map_err(|e| malformed(WHAT, e))?;
                let last = varint::read_u64(&mut self.inner).map_err(|e| malformed(WHAT, e))?;
                if last <= first {
                    return Err(Error::Format(format!("empty block range {first}..={last}")));
                }
                Operation::BlockRange { first, last }
            }
            other => {
                return Err(Error::Format(format!("unknown delta operation tag {other:#04X}")));
            }
        };
        Ok(Some(op))
    }
}

impl<R: Read> Iterator for DeltaReader<R> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_op() {
            Ok(Some(op)) => Some(Ok(op)),
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
