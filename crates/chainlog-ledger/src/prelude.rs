//! Prelude module - commonly used types for convenient import.
//!
//! Use `use chainlog_ledger::prelude::*;` to import all essential types.

pub use crate::{LedgerError, LedgerResult};

// Entry points
pub use crate::{ChainIssue, ChainVerificationResult, Ledger, OperationLog};

// Entities
pub use crate::{Action, Block, BlockHeader, Chain, Operation, ScalarValue};

// Capture
pub use crate::{ChangeCapture, FieldValue, TrackedRecord};
