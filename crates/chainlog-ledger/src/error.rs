//! Ledger error types.

use thiserror::Error;

/// Errors raised by the ledger.
///
/// Everything except [`LedgerError::StorageError`] and
/// [`LedgerError::SerializationError`] signals a programming or integrity
/// fault, not an expected runtime condition. Any of them aborts an
/// in-progress mint without persisting anything.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Attempted mutation or deletion of a sealed block or recorded
    /// operation (or deletion of any block or operation).
    #[error("{entity} {id} is immutable: {reason}")]
    Immutable {
        /// Entity kind (`block`, `operation`, `chain`).
        entity: &'static str,
        /// Entity id.
        id: String,
        /// What was attempted.
        reason: String,
    },

    /// Attempted to seal a block twice.
    #[error("block {block_id} is already sealed")]
    AlreadySealed {
        /// The sealed block.
        block_id: String,
    },

    /// Attempted to record an operation that already belongs to a block.
    #[error("operation {operation_id} is already recorded in block {block_id}")]
    AlreadyRecorded {
        /// The operation.
        operation_id: String,
        /// The block it already belongs to.
        block_id: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (`block`, `operation`, `chain`).
        entity: &'static str,
        /// The missing id or key.
        id: String,
    },

    /// The stored chain disagrees with what the minting routine expected.
    #[error("chain {chain} integrity violation: {reason}")]
    IntegrityViolation {
        /// Namespace of the chain.
        chain: String,
        /// What did not match.
        reason: String,
    },

    /// A captured record or argument is malformed.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Storage error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl LedgerError {
    pub(crate) fn immutable(
        entity: &'static str,
        id: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::Immutable {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<chainlog_storage::StorageError> for LedgerError {
    fn from(e: chainlog_storage::StorageError) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
