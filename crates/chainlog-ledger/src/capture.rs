//! Change capture: turning host record writes into operations.
//!
//! The host implements [`TrackedRecord`] for every persisted record type it
//! wants audited, installs one [`ChangeCapture`] at startup, and calls
//! [`ChangeCapture::on_saved`] / [`ChangeCapture::on_deleted`] after each
//! write. Only scalar fields end up in the log.

use chainlog_core::{NodeId, Timestamp};
use std::sync::Arc;
use tracing::trace;

use crate::error::LedgerResult;
use crate::oplog::OperationLog;
use crate::operation::{Action, FieldValues, NewOperation, Operation, ScalarValue};

/// A field value as the host sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed integer.
    Integer(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
    /// Boolean.
    Boolean(bool),
    /// Binary blob.
    Bytes(Vec<u8>),
    /// Point in time.
    Timestamp(Timestamp),
    /// Structured JSON.
    Json(serde_json::Value),
    /// Absent value.
    Null,
}

impl FieldValue {
    /// The capturable form of this value.
    ///
    /// Integers, finite floats and text pass through. Everything else,
    /// booleans included, is dropped.
    #[must_use]
    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            Self::Integer(i) => Some(ScalarValue::Integer(*i)),
            Self::Float(f) => ScalarValue::float(*f),
            Self::Text(s) => Some(ScalarValue::Text(s.clone())),
            Self::Boolean(_) | Self::Bytes(_) | Self::Timestamp(_) | Self::Json(_) | Self::Null => {
                None
            },
        }
    }
}

/// A host record whose writes are audited.
pub trait TrackedRecord {
    /// Namespace the record belongs to.
    fn app_name(&self) -> &str;

    /// Unqualified model name.
    fn model_name(&self) -> &str;

    /// Primary key.
    fn primary_key(&self) -> NodeId;

    /// Current field values, by name.
    fn fields(&self) -> Vec<(String, FieldValue)>;
}

/// Keep only capturable fields.
#[must_use]
pub fn scalar_fields_of<I>(fields: I) -> FieldValues
where
    I: IntoIterator<Item = (String, FieldValue)>,
{
    fields
        .into_iter()
        .filter_map(|(name, value)| value.as_scalar().map(|scalar| (name, scalar)))
        .collect()
}

/// Qualified model name, `"<app>:<model>"`.
#[must_use]
pub fn qualified_model<R: TrackedRecord + ?Sized>(record: &R) -> String {
    format!("{}:{}", record.app_name(), record.model_name())
}

/// Persistence hook that appends an operation per host write.
#[derive(Clone)]
pub struct ChangeCapture {
    log: Arc<OperationLog>,
}

impl ChangeCapture {
    /// Create a hook feeding the given log.
    #[must_use]
    pub fn new(log: Arc<OperationLog>) -> Self {
        Self { log }
    }

    /// Record a save.
    ///
    /// `created` is `Some(true)` for an insert, `Some(false)` for an update,
    /// and `None` when the host cannot tell, which records an upsert.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or cannot be stored.
    pub fn on_saved<R: TrackedRecord + ?Sized>(
        &self,
        record: &R,
        created: Option<bool>,
    ) -> LedgerResult<Operation> {
        let action = match created {
            Some(true) => Action::Insert,
            Some(false) => Action::Update,
            None => Action::Upsert,
        };
        let values = scalar_fields_of(record.fields());
        trace!(
            app = %record.app_name(),
            model = %record.model_name(),
            action = %action,
            fields = values.len(),
            "Capturing save"
        );
        self.log.append_new(
            NewOperation::new(
                record.app_name(),
                qualified_model(record),
                action,
                record.primary_key(),
            )
            .with_values(values),
        )
    }

    /// Record a delete. No values are captured.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or cannot be stored.
    pub fn on_deleted<R: TrackedRecord + ?Sized>(&self, record: &R) -> LedgerResult<Operation> {
        trace!(
            app = %record.app_name(),
            model = %record.model_name(),
            "Capturing delete"
        );
        self.log.append_new(NewOperation::new(
            record.app_name(),
            qualified_model(record),
            Action::Delete,
            record.primary_key(),
        ))
    }
}

impl std::fmt::Debug for ChangeCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCapture").finish_non_exhaustive()
    }
}
