// Variable-length integers for the signature and delta streams.
//
// Base-128, big-endian: most-significant group first, bit 7 set on every
// byte except the last. 300 encodes as 0x82 0x2C.

use std::io::{self, Read, Write};

/// Longest encoding of a `u64` (ceil(64 / 7)).
pub const MAX_LEN: usize = 10;

/// Bits that must be clear before the accumulator shifts left by 7.
const OVERFLOW_MASK: u64 = 0xFE00_0000_0000_0000;

/// Encode `value` into the tail of `buf`, returning the encoded slice.
pub fn encode(mut value: u64, buf: &mut [u8; MAX_LEN]) -> &[u8] {
    let mut start = MAX_LEN - 1;
    buf[start] = value as u8 & 0x7F;
    value >>= 7;
    while value != 0 {
        start -= 1;
        buf[start] = value as u8 | 0x80;
        value >>= 7;
    }
    &buf[start..]
}

/// Write `value` to `w`.
pub fn write_u64<W: Write + ?Sized>(w: &mut W, value: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_LEN];
    w.write_all(encode(value, &mut buf))
}

/// Write a `usize` to `w`.
pub fn write_usize<W: Write + ?Sized>(w: &mut W, value: usize) -> io::Result<()> {
    write_u64(w, value as u64)
}

/// Encoded length of `value` in bytes.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

/// Read one varint from a stream.
///
/// A stream ending mid-integer is `UnexpectedEof`; a value wider than 64
/// bits is `InvalidData`.
pub fn read_u64<R: Read + ?Sized>(r: &mut R) -> io::Result<u64> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)?;
        if value & OVERFLOW_MASK != 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint overflow"));
        }
        value = (value << 7) | u64::from(byte[0] & 0x7F);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// Read a varint that must fit in `usize`.
pub fn read_usize<R: Read + ?Sized>(r: &mut R) -> io::Result<usize> {
    let value = read_u64(r)?;
    usize::try_from(value)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "varint exceeds usize"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn big_endian_groups() {
        let mut buf = [0u8; MAX_LEN];
        assert_eq!(encode(0, &mut buf), &[0x00]);
        assert_eq!(encode(127, &mut buf), &[0x7F]);
        assert_eq!(encode(128, &mut buf), &[0x81, 0x00]);
        assert_eq!(encode(300, &mut buf), &[0x82, 0x2C]);
    }

    #[test]
    fn boundaries_survive_a_stream() {
        let values = [0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX];
        let mut out = Vec::new();
        for &v in &values {
            write_u64(&mut out, v).unwrap();
        }
        assert_eq!(
            out.len(),
            values.iter().map(|&v| encoded_len(v)).sum::<usize>()
        );
        let mut cursor = Cursor::new(out);
        for &v in &values {
            assert_eq!(read_u64(&mut cursor).unwrap(), v);
        }
    }

    #[test]
    fn max_value_uses_ten_bytes() {
        assert_eq!(encoded_len(u64::MAX), MAX_LEN);
    }

    #[test]
    fn truncated_is_eof() {
        let err = read_u64(&mut Cursor::new([0x81u8, 0x80])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn overlong_is_invalid() {
        let data = [0xFFu8; 11];
        let err = read_u64(&mut Cursor::new(data)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
