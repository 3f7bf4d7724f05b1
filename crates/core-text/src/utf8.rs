//! Incremental UTF-8 helpers for byte-at-a-time terminal input.
//!
//! The key decoder reads one byte per syscall, so it needs to know how many
//! continuation bytes follow a lead byte before it can assemble a scalar.
//! Malformed sequences (bad lead, bad continuation, overlong, surrogate or
//! out-of-range values) decode to U+FFFD instead of aborting.

pub const REPLACEMENT: char = '\u{FFFD}';

/// Total sequence length implied by a lead byte, or `None` for a byte that
/// cannot start a sequence (continuation byte or 0xF8..=0xFF).
#[inline]
pub fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Assemble one scalar value from a complete sequence (lead + continuations).
pub fn decode_scalar(bytes: &[u8]) -> char {
    let Some(&lead) = bytes.first() else {
        return REPLACEMENT;
    };
    if sequence_len(lead) != Some(bytes.len()) {
        return REPLACEMENT;
    }
    if !bytes[1..].iter().all(|&b| is_continuation(b)) {
        return REPLACEMENT;
    }
    let cp = match bytes.len() {
        1 => u32::from(lead),
        2 => (u32::from(lead & 0x1F) << 6) | u32::from(bytes[1] & 0x3F),
        3 => {
            (u32::from(lead & 0x0F) << 12)
                | (u32::from(bytes[1] & 0x3F) << 6)
                | u32::from(bytes[2] & 0x3F)
        }
        _ => {
            (u32::from(lead & 0x07) << 18)
                | (u32::from(bytes[1] & 0x3F) << 12)
                | (u32::from(bytes[2] & 0x3F) << 6)
                | u32::from(bytes[3] & 0x3F)
        }
    };
    let min = match bytes.len() {
        1 => 0,
        2 => 0x80,
        3 => 0x800,
        _ => 0x10000,
    };
    if cp < min {
        return REPLACEMENT;
    }
    char::from_u32(cp).unwrap_or(REPLACEMENT)
}

/// Append the UTF-8 encoding of every codepoint in `cps` to `out`.
pub fn encode_into(cps: &[char], out: &mut String) {
    out.reserve(cps.len());
    out.extend(cps.iter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_lengths() {
        assert_eq!(sequence_len(b'a'), Some(1));
        assert_eq!(sequence_len(0xC3), Some(2));
        assert_eq!(sequence_len(0xE7), Some(3));
        assert_eq!(sequence_len(0xF0), Some(4));
        assert_eq!(sequence_len(0x80), None);
        assert_eq!(sequence_len(0xFF), None);
    }

    #[test]
    fn decodes_multibyte() {
        assert_eq!(decode_scalar("é".as_bytes()), 'é');
        assert_eq!(decode_scalar("界".as_bytes()), '界');
        assert_eq!(decode_scalar("😀".as_bytes()), '😀');
    }

    #[test]
    fn malformed_is_replacement() {
        assert_eq!(decode_scalar(&[0xC3, 0x41]), REPLACEMENT);
        assert_eq!(decode_scalar(&[0xC0, 0x80]), REPLACEMENT); // overlong NUL
        assert_eq!(decode_scalar(&[0xED, 0xA0, 0x80]), REPLACEMENT); // surrogate
        assert_eq!(decode_scalar(&[0x80]), REPLACEMENT);
        assert_eq!(decode_scalar(&[]), REPLACEMENT);
    }

    #[test]
    fn encode_appends() {
        let mut s = String::from(">");
        encode_into(&['a', '界'], &mut s);
        assert_eq!(s, ">a界");
    }
}
