//! Prelude module - commonly used types for convenient import.
//!
//! Use `use chainlog_core::prelude::*;` to import all essential types.

// Identifiers and time
pub use crate::{BlockId, ChainId, EntityId, NodeId, OperationId, Timestamp};

// Shared shape
pub use crate::Node;

// Codec
pub use crate::{CodecError, CodecResult, base62};
