//! Prelude module - commonly used types for convenient import.
//!
//! Use `use chainlog_crypto::prelude::*;` to import all essential types.

pub use crate::{ContentHash, ContentId};
