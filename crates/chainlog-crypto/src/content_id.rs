//! 128-bit content identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::hash::ContentHash;

/// The 128-bit identity of a block's content.
///
/// Derived from a 256-bit [`ContentHash`] by keeping its first 16 bytes.
/// Serialized as a hyphenated UUID string so it fits the same column type
/// as every other identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(Uuid);

impl ContentId {
    /// Reduce a full digest to its 128-bit prefix.
    #[must_use]
    pub fn from_digest(digest: &ContentHash) -> Self {
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&digest.as_bytes()[..16]);
        Self(Uuid::from_bytes(prefix))
    }

    /// Raw 16 bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The UUID view of this id.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The integer view of this id.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0.simple())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
