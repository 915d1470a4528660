// Signature stream encoding.
//
// Layout after the header (see `header`):
//
//   0x01 <index: varint> <weak: u32 BE> <digest: digest_len bytes>   per block
//   0x00                                                             end
//
// Records appear in strictly increasing index order.

use std::io::{Read, Write};

use super::header::SignatureHeader;
use super::{malformed, varint};
use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::hash::StrongHash;
use crate::sync::BlockRecord;

const TAG_END: u8 = 0x00;
const TAG_BLOCK: u8 = 0x01;

/// Writes a signature stream record by record.
pub struct SignatureWriter<W: Write> {
    inner: W,
    header: SignatureHeader,
    records: u64,
}

impl<W: Write> SignatureWriter<W> {
    /// Write the header for `opts` and return a writer for its records.
    pub fn new(mut inner: W, opts: &SyncOptions) -> Result<Self> {
        opts.validate()?;
        let header = SignatureHeader::from_options(opts);
        header.encode(&mut inner)?;
        Ok(Self {
            inner,
            header,
            records: 0,
        })
    }

    pub fn write_record(&mut self, record: &BlockRecord) -> Result<()> {
        if record.strong_checksum.len() != self.header.digest_len {
            return Err(Error::Format(format!(
                "block {} has a {}-byte digest, stream expects {}",
                record.index,
                record.strong_checksum.len(),
                self.header.digest_len
            )));
        }
        self.inner.write_all(&[TAG_BLOCK])?;
        varint::write_u64(&mut self.inner, record.index)?;
        self.inner.write_all(&record.weak_checksum.to_be_bytes())?;
        self.inner.write_all(&record.strong_checksum)?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Write the terminator, flush, and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.write_all(&[TAG_END])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads a signature stream as an iterator of records.
///
/// The iterator yields `Err` once for a malformed or truncated stream and
/// then stops.
pub struct SignatureReader<R: Read> {
    inner: R,
    header: SignatureHeader,
    options: SyncOptions,
    next_min: u64,
    done: bool,
}

impl<R: Read> SignatureReader<R> {
    /// Parse the header; the hash must be one of the built-in algorithms.
    pub fn new(mut inner: R) -> Result<Self> {
        let header = SignatureHeader::decode(&mut inner)?;
        let options = header.to_options()?;
        Ok(Self::from_parts(inner, header, options))
    }

    /// Parse the header of a stream written with a caller-supplied hash.
    pub fn with_hash(mut inner: R, hash: StrongHash) -> Result<Self> {
        let header = SignatureHeader::decode(&mut inner)?;
        header.check_hash(&hash)?;
        let options = SyncOptions {
            strong_hash: hash,
            ..SyncOptions::with_block_size(header.block_size)
        };
        Ok(Self::from_parts(inner, header, options))
    }

    fn from_parts(inner: R, header: SignatureHeader, options: SyncOptions) -> Self {
        Self {
            inner,
            header,
            options,
            next_min: 0,
            done: false,
        }
    }

    pub fn header(&self) -> &SignatureHeader {
        &self.header
    }

    /// Options a delta against this signature must use.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn read_record(&mut self) -> Result<Option<BlockRecord>> {
        const WHAT: &str = "signature record";
        let mut tag = [0u8; 1];
        self.inner
            .read_exact(&mut tag)
            .map_err(|e| malformed("signature stream (missing terminator)", e))?;
        match tag[0] {
            TAG_END => return Ok(None),
            TAG_BLOCK => {}
            other => {
                return Err(Error::Format(format!(
                    "unknown signature record tag {other:#04X}"
                )));
            }
        }

        let index = varint::read_u64(&mut self.inner).map_err(|e| malformed(WHAT, e))?;
        if index < self.next_min {
            return Err(Error::Format(format!(
                "signature record {index} out of order"
            )));
        }
        let mut weak = [0u8; 4];
        self.inner
            .read_exact(&mut weak)
            .map_err(|e| malformed(WHAT, e))?;
        let mut strong = vec![0u8; self.header.digest_len];
        self.inner
            .read_exact(&mut strong)
            .map_err(|e| malformed(WHAT, e))?;

        self.next_min = index.saturating_add(1);
        Ok(Some(BlockRecord {
            index,
            weak_checksum: u32::from_be_bytes(weak),
            strong_checksum: strong,
        }))
    }
}

impl<R: Read> Iterator for SignatureReader<R> {
    type Item = Result<BlockRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
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
