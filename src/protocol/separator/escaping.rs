//! Separator escaping
//!
//! Percent-style escaping that keeps configured separators out of payload
//! bytes.
//!
//! ## Algorithm
//! 1. every literal `%` becomes `%25`
//! 2. every occurrence of each separator, in order, becomes the `%XX` forms
//!    of its bytes
//!
//! Step 1 runs first, so every `%` left after step 2 starts an escape
//! sequence and unescaping is unambiguous. Separators must not contain any
//! byte an escape sequence is made of (see [`is_escape_byte`]), otherwise a
//! later step rewrites the output of an earlier one.

use crate::error::{Error, Result};

/// Escape marker byte
pub const ESCAPE_MARKER: u8 = b'%';

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Whether `byte` can appear in the output of [`escape_separators`]'s
/// `%XX` sequences
pub fn is_escape_byte(byte: u8) -> bool {
    byte == ESCAPE_MARKER || HEX_DIGITS.contains(&byte)
}

/// Append the `%XX` form of `byte`
fn push_escaped(out: &mut Vec<u8>, byte: u8) {
    out.push(ESCAPE_MARKER);
    out.push(HEX_DIGITS[(byte >> 4) as usize]);
    out.push(HEX_DIGITS[(byte & 0x0f) as usize]);
}

/// Replace every occurrence of `needle` in `data` with `replacement`
fn replace_all(data: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut index = 0;
    while index < data.len() {
        if data[index..].starts_with(needle) {
            out.extend_from_slice(replacement);
            index += needle.len();
        } else {
            out.push(data[index]);
            index += 1;
        }
    }
    out
}

/// Escape `data` against `separators`
pub fn escape_separators<S: AsRef<[u8]>>(data: &[u8], separators: &[S]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len());
    for &byte in data {
        if byte == ESCAPE_MARKER {
            push_escaped(&mut escaped, byte);
        } else {
            escaped.push(byte);
        }
    }

    for separator in separators {
        let separator = separator.as_ref();
        if separator.is_empty() {
            continue;
        }

        let mut replacement = Vec::with_capacity(3 * separator.len());
        for &byte in separator {
            push_escaped(&mut replacement, byte);
        }
        escaped = replace_all(&escaped, separator, &replacement);
    }

    escaped
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Reverse [`escape_separators`]
pub fn unescape_separators(data: &[u8]) -> Result<Vec<u8>> {
    let mut unescaped = Vec::with_capacity(data.len());
    let mut index = 0;
    while index < data.len() {
        if data[index] != ESCAPE_MARKER {
            unescaped.push(data[index]);
            index += 1;
            continue;
        }

        if index + 2 >= data.len() {
            return Err(Error::Escape {
                position: index,
                reason: "not enough bytes to decode".to_string(),
            });
        }

        let (high, low) = (data[index + 1], data[index + 2]);
        match (hex_value(high), hex_value(low)) {
            (Some(high), Some(low)) => unescaped.push((high << 4) | low),
            _ => {
                return Err(Error::Escape {
                    position: index,
                    reason: format!(
                        "invalid hex sequence {:?}",
                        String::from_utf8_lossy(&[high, low])
                    ),
                })
            }
        }
        index += 3;
    }

    Ok(unescaped)
}
