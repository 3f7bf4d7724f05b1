//! Codepoint Display Width Oracle
//!
//! Single authoritative function `char_width` returning the terminal column
//! width of one Unicode scalar value. The line editor's redraw path uses it
//! for every codepoint; nothing else in the workspace measures width.
//!
//! Width Precedence Order:
//! 1. NUL is 0, other C0/C1 controls and DEL are -1.
//! 2. Static override table (pictographic widening, Hangul medial vowels and
//!    final consonants, ZERO WIDTH SPACE, soft hyphen).
//! 3. Baseline `unicode_width` (East Asian Wide / Fullwidth is 2, marks are 0).
//!
//! Invariants:
//! - The override table is sorted, non-overlapping, inclusive intervals (checked by tests).
//! - Over-estimation of pictographic width is preferred to under-estimation:
//!   an extra blank cell is harmless, a missing one drifts the cursor.

use unicode_width::UnicodeWidthChar;

/// Inclusive codepoint interval with its forced width.
type Override = (u32, u32, i8);

static OVERRIDES: &[Override] = &[
    // Soft hyphen renders as a visible hyphen in terminals.
    (0x00AD, 0x00AD, 1),
    (0x1160, 0x11FF, 0),
    (0x200B, 0x200B, 0),
    // Pictographic blocks, including members without emoji presentation.
    (0x1F300, 0x1F64F, 2),
    (0x1F900, 0x1F9FF, 2),
    (0x1FA70, 0x1FAFF, 2),
];

fn override_width(cp: u32) -> Option<i8> {
    OVERRIDES
        .binary_search_by(|&(lo, hi, _)| {
            if hi < cp {
                core::cmp::Ordering::Less
            } else if lo > cp {
                core::cmp::Ordering::Greater
            } else {
                core::cmp::Ordering::Equal
            }
        })
        .ok()
        .map(|i| OVERRIDES[i].2)
}

/// True for C0/C1 control codes and DEL (excluding NUL).
#[inline]
pub fn is_control(c: char) -> bool {
    let cp = c as u32;
    cp != 0 && (cp < 0x20 || (0x7F..0xA0).contains(&cp))
}

/// Return the column width of a single codepoint: -1 control, 0 zero-width, 1 normal, 2 wide.
#[inline]
pub fn char_width(c: char) -> i8 {
    if c == '\0' {
        return 0;
    }
    if is_control(c) {
        return -1;
    }
    if c.is_ascii() {
        return 1;
    }
    if let Some(w) = override_width(c as u32) {
        return w;
    }
    UnicodeWidthChar::width(c).map_or(-1, |w| w as i8)
}
