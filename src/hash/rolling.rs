// rsync weak rolling checksum.
//
// For a window x[0..n):
//   a = sum(x[i])            mod 2^16
//   b = sum((n - i) * x[i])  mod 2^16
//   checksum = (b << 16) | a
//
// Both sums are kept in wrapping u32 arithmetic and truncated on read; since
// 2^16 divides 2^32 the truncation commutes with every update.

/// Incrementally updatable weak checksum over a sliding window.
#[derive(Debug, Clone)]
pub struct RollingChecksum {
    a: u32,
    b: u32,
    len: usize,
}

impl RollingChecksum {
    /// Compute the checksum of `window` from scratch.
    pub fn new(window: &[u8]) -> Self {
        let mut a: u32 = 0;
        let mut b: u32 = 0;
        for &byte in window {
            a = a.wrapping_add(byte as u32);
            b = b.wrapping_add(a);
        }
        Self {
            a,
            b,
            len: window.len(),
        }
    }

    /// Slide a fixed-width window one byte: `out` leaves, `incoming` enters.
    #[inline(always)]
    pub fn roll(&mut self, out: u8, incoming: u8) {
        let out = out as u32;
        self.a = self.a.wrapping_sub(out).wrapping_add(incoming as u32);
        self.b = self
            .b
            .wrapping_sub((self.len as u32).wrapping_mul(out))
            .wrapping_add(self.a);
    }

    /// Drop the oldest byte without adding one (window shrinking at end of input).
    #[inline(always)]
    pub fn roll_out(&mut self, out: u8) {
        debug_assert!(self.len > 0);
        let out = out as u32;
        self.a = self.a.wrapping_sub(out);
        self.b = self.b.wrapping_sub((self.len as u32).wrapping_mul(out));
        self.len -= 1;
    }

    /// Current 32-bit checksum.
    #[inline(always)]
    pub fn digest(&self) -> u32 {
        ((self.b & 0xFFFF) << 16) | (self.a & 0xFFFF)
    }

    /// Number of bytes currently covered.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One-shot weak checksum of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    RollingChecksum::new(data).digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value() {
        // a = 97+98+99+100 = 394, b = 4*97 + 3*98 + 2*99 + 100 = 980
        assert_eq!(checksum(b"abcd"), (980 << 16) | 394);
    }

    #[test]
    fn empty_window() {
        let sum = RollingChecksum::new(b"");
        assert_eq!(sum.digest(), 0);
        assert!(sum.is_empty());
    }

    #[test]
    fn roll_matches_recompute() {
        let data = b"The quick brown fox jumps over the lazy dog";
        for width in [1, 3, 4, 8, 16] {
            let mut sum = RollingChecksum::new(&data[..width]);
            for i in 1..=data.len() - width {
                sum.roll(data[i - 1], data[i + width - 1]);
                assert_eq!(
                    sum.digest(),
                    checksum(&data[i..i + width]),
                    "width {width}, position {i}"
                );
            }
        }
    }

    #[test]
    fn roll_out_matches_recompute() {
        let data = b"shrinking window at end of stream";
        let mut sum = RollingChecksum::new(&data[data.len() - 8..]);
        for i in data.len() - 8..data.len() {
            sum.roll_out(data[i]);
            assert_eq!(sum.digest(), checksum(&data[i + 1..]));
            assert_eq!(sum.len(), data.len() - i - 1);
        }
        assert!(sum.is_empty());
    }

    #[test]
    fn high_bytes_wrap_consistently() {
        let data = vec![0xFFu8; 4096];
        let mut sum = RollingChecksum::new(&data[..1024]);
        for i in 1..=data.len() - 1024 {
            sum.roll(data[i - 1], data[i + 1023]);
        }
        assert_eq!(sum.digest(), checksum(&data[..1024]));
    }

    #[test]
    fn distinct_blocks_can_collide() {
        // a = 2, b = 4 for both.
        assert_eq!(checksum(&[1, 0, 1]), checksum(&[0, 2, 0]));
    }
}
