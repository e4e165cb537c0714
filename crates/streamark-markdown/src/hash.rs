use std::fmt;

/// Cache key for a segment's content.
///
/// A 32-bit rolling hash: cheap, deterministic across runs and platforms, and not collision
/// free. Two segments with the same hash are treated as the same content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentHash(u32);

impl SegmentHash {
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Hashes `content` as `h = h * 31 + unit` over its UTF-16 code units, wrapping at 32 bits.
pub fn content_hash(content: &str) -> SegmentHash {
    let h = content
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32));
    SegmentHash(h)
}

impl fmt::Display for SegmentHash {
    /// Signed base-36, e.g. `-1x3k2` or `7ps`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

        let signed = self.0 as i32;
        let mut n = (signed as i64).unsigned_abs();
        let mut buf = [0u8; 8];
        let mut i = buf.len();
        loop {
            i -= 1;
            buf[i] = DIGITS[(n % 36) as usize];
            n /= 36;
            if n == 0 {
                break;
            }
        }
        if signed < 0 {
            f.write_str("-")?;
        }
        // Only ASCII digits were written.
        f.write_str(std::str::from_utf8(&buf[i..]).unwrap_or_default())
    }
}
