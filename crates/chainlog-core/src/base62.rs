//! Base-62 rendering of 128-bit identifiers.
//!
//! Used only for display (CLI output, log lines, exported records). Ids are
//! always compared and stored in their native 128-bit form.
//!
//! The alphabet is `0-9A-Za-z`, most significant digit first, with no
//! padding. Zero encodes as `"0"`.

use crate::error::{CodecError, CodecResult};

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: u128 = 62;

/// Longest possible encoding of a `u128` (62^22 > 2^128).
const MAX_LEN: usize = 22;

/// Encode an unsigned value as base-62.
#[must_use]
pub fn encode(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(MAX_LEN);
    while value > 0 {
        // `value % BASE` is always < 62
        #[allow(clippy::cast_possible_truncation)]
        let idx = (value % BASE) as usize;
        digits.push(ALPHABET[idx]);
        value /= BASE;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Decode a base-62 string produced by [`encode`].
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for an empty string,
/// [`CodecError::InvalidCharacter`] for characters outside the alphabet and
/// [`CodecError::Overflow`] if the value does not fit in 128 bits.
pub fn decode(input: &str) -> CodecResult<u128> {
    if input.is_empty() {
        return Err(CodecError::Empty);
    }

    let mut value: u128 = 0;
    for (position, character) in input.chars().enumerate() {
        let digit = digit_value(character)
            .ok_or(CodecError::InvalidCharacter { character, position })?;
        value = value
            .checked_mul(BASE)
            .and_then(|v| v.checked_add(u128::from(digit)))
            .ok_or(CodecError::Overflow)?;
    }

    Ok(value)
}

fn digit_value(c: char) -> Option<u8> {
    let b = u8::try_from(c).ok()?;
    match b {
        b'0'..=b'9' => b.checked_sub(b'0'),
        b'A'..=b'Z' => b.checked_sub(b'A').and_then(|v| v.checked_add(10)),
        b'a'..=b'z' => b.checked_sub(b'a').and_then(|v| v.checked_add(36)),
        _ => None,
    }
}
