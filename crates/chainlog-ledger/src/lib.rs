//! Chainlog Ledger - Hash-chained, append-only audit ledger.
//!
//! This crate provides:
//! - Capture of create, update and delete operations on host records
//! - Per-namespace chains of sealed, content-addressed blocks
//! - Atomic minting of all pending operations into the next block
//! - Chain integrity verification
//!
//! # Integrity Model
//!
//! Every block is:
//! - Identified by a BLAKE3 digest of its parent id, header and data
//! - Linked to its predecessor by id
//! - Sealed exactly once, after which it can never change or be deleted
//!
//! An operation is pending until a block claims it, and is claimed by at
//! most one block. Rewriting any historical block changes its recomputed
//! hash and is reported by [`Ledger::verify_chain`].
//!
//! # Example
//!
//! ```
//! use chainlog_core::NodeId;
//! use chainlog_ledger::{Action, Ledger, NewOperation, ScalarValue};
//!
//! let ledger = Ledger::in_memory();
//!
//! ledger
//!     .operations()
//!     .append_new(
//!         NewOperation::new("shop", "shop:order", Action::Insert, NodeId::new())
//!             .with_value("total", ScalarValue::Integer(100)),
//!     )
//!     .unwrap();
//!
//! let block = ledger.mine("shop").unwrap();
//! assert_eq!(block.data.len(), 1);
//!
//! let result = ledger.verify_chain("shop").unwrap();
//! assert!(result.valid);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod block;
mod capture;
mod chain;
mod codec;
mod error;
mod ledger;
mod operation;
mod oplog;
mod storage;

pub use block::{Block, BlockHeader, BlockState};
pub use capture::{ChangeCapture, FieldValue, TrackedRecord, qualified_model, scalar_fields_of};
pub use chain::Chain;
pub use codec::{BLOCK_CONTENT_CONTEXT, HashCodec};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{ChainIssue, ChainVerificationResult, Ledger};
pub use operation::{
    Action, Conditions, FieldValues, NewOperation, Operation, OperationRecord,
    PRIMARY_KEY_CONDITION, ScalarValue, primary_key_conditions, validate_app_name,
};
pub use oplog::OperationLog;
pub use storage::{KvLedgerStorage, LedgerStorage};
