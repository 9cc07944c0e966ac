//! Common types used throughout chainlog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::base62;

/// Behavior shared by every typed identifier.
pub trait EntityId: Copy + Eq + fmt::Debug + fmt::Display {
    /// Allocate a fresh random identifier.
    fn generate() -> Self;

    /// The 128-bit integer form.
    fn as_u128(&self) -> u128;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Create an identifier from its 128-bit integer form.
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// The 128-bit integer form.
            #[must_use]
            pub const fn as_u128(&self) -> u128 {
                self.0.as_u128()
            }

            /// The raw 16 bytes, big-endian.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Base-62 rendering for humans.
            #[must_use]
            pub fn to_base62(&self) -> String {
                base62::encode(self.as_u128())
            }
        }

        impl EntityId for $name {
            fn generate() -> Self {
                Self::new()
            }

            fn as_u128(&self) -> u128 {
                self.0.as_u128()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Identifier of any persisted node (and of tracked host records).
    NodeId,
    "node"
);

define_id!(
    /// Unique identifier for a chain.
    ChainId,
    "chain"
);

define_id!(
    /// Unique identifier for a block.
    BlockId,
    "block"
);

define_id!(
    /// Unique identifier for a captured operation.
    OperationId,
    "op"
);

/// Timestamp wrapper for consistent handling throughout chainlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Microseconds since the Unix epoch, clamped at zero.
    ///
    /// Used to build lexicographically ordered storage keys.
    #[must_use]
    pub fn unix_micros(&self) -> u64 {
        u64::try_from(self.0.timestamp_micros()).unwrap_or(0)
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(BlockId::new(), BlockId::new());
        assert_ne!(OperationId::new(), OperationId::new());
    }

    #[test]
    fn test_id_integer_form() {
        let id = NodeId::from_u128(1);
        assert_eq!(id.as_u128(), 1);
        assert_eq!(id.to_base62(), "1");
    }

    #[test]
    fn test_id_display_prefix() {
        let id = BlockId::from_u128(0);
        assert!(id.to_string().starts_with("block:"));
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let id = ChainId::from_u128(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
        let back: ChainId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Timestamp::now();
        let later = Timestamp::from_datetime(earlier.0 + chrono::Duration::seconds(1));
        assert!(earlier < later);
        assert!(earlier.unix_micros() < later.unix_micros());
    }
}
