//! The operation log: capture and lookup of pending operations.

use chainlog_core::{NodeId, OperationId};
use std::sync::Arc;
use tracing::debug;

use crate::error::LedgerResult;
use crate::operation::{Action, Conditions, FieldValues, NewOperation, Operation};
use crate::storage::LedgerStorage;

/// Append-only log of captured operations.
///
/// Sequence numbers and creation times are assigned by the storage, so any
/// number of logs over one storage hand out a single increasing sequence.
pub struct OperationLog {
    storage: Arc<dyn LedgerStorage>,
}

impl OperationLog {
    /// Create a log over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    /// Capture a change.
    ///
    /// `conditions` gets a `pk` entry for `target_node_id` when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LedgerError::InvalidRecord`] for malformed input, or
    /// a storage error.
    pub fn append(
        &self,
        app_name: &str,
        model: &str,
        action: Action,
        target_node_id: NodeId,
        conditions: Conditions,
        values: FieldValues,
    ) -> LedgerResult<Operation> {
        let mut new = NewOperation::new(app_name, model, action, target_node_id)
            .with_values(values);
        new.conditions.extend(conditions);
        self.append_new(new)
    }

    /// Capture a change described by a [`NewOperation`].
    ///
    /// # Errors
    ///
    /// See [`OperationLog::append`].
    pub fn append_new(&self, new: NewOperation) -> LedgerResult<Operation> {
        new.validate()?;
        let operation = self.storage.append_operation(new)?;

        debug!(
            operation_id = %operation.id(),
            app = %operation.app_name,
            model = %operation.model,
            action = %operation.action,
            sequence = operation.sequence,
            "Captured operation"
        );
        Ok(operation)
    }

    /// Pending operations of a namespace, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn pending_for(&self, app_name: &str) -> LedgerResult<Vec<Operation>> {
        self.storage.pending_operations(app_name)
    }

    /// Number of pending operations in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn count_pending(&self, app_name: &str) -> LedgerResult<usize> {
        self.storage.count_pending(app_name)
    }

    /// Get an operation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn get(&self, id: &OperationId) -> LedgerResult<Option<Operation>> {
        self.storage.get_operation(id)
    }

    /// Persist changes to a pending operation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LedgerError::Immutable`] once the operation is
    /// recorded or was recorded while the edit was in flight.
    pub fn save(&self, operation: &Operation) -> LedgerResult<()> {
        self.storage.save_operation(operation)
    }

    /// Operations are never deleted.
    ///
    /// # Errors
    ///
    /// Always returns [`crate::LedgerError::Immutable`].
    pub fn delete(&self, id: &OperationId) -> LedgerResult<()> {
        self.storage.delete_operation(id)
    }
}

impl std::fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationLog").finish_non_exhaustive()
    }
}
