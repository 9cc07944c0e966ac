//! Identifier codec error types.

use thiserror::Error;

/// Errors raised while decoding a human-facing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input string was empty.
    #[error("identifier is empty")]
    Empty,

    /// The input contained a character outside the alphabet.
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter {
        /// The offending character.
        character: char,
        /// Zero-based character position.
        position: usize,
    },

    /// The decoded value does not fit in 128 bits.
    #[error("identifier overflows 128 bits")]
    Overflow,
}

/// Result type for identifier codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
