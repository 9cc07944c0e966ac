//! Captured change operations.
//!
//! An [`Operation`] describes one create, update or delete of a host record.
//! It is *pending* until a block claims it, after which it is sealed for good.

use chainlog_core::{BlockId, Node, NodeId, OperationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// Condition key naming the target record's primary key.
pub const PRIMARY_KEY_CONDITION: &str = "pk";

/// Kind of change an operation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// A new record was created.
    Insert,
    /// An existing record was modified.
    Update,
    /// A record was removed.
    Delete,
    /// A record was written without knowing whether it existed before.
    Upsert,
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Upsert => "UPSERT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "UPSERT" => Ok(Self::Upsert),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

/// A field value small enough to be recorded in an operation.
///
/// Only integers, finite floats and text survive capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Signed integer.
    Integer(i64),
    /// Finite float.
    Float(f64),
    /// Text.
    Text(String),
}

impl ScalarValue {
    /// Build a float value, rejecting NaN and infinities.
    #[must_use]
    pub fn float(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self::Float(value))
    }

    fn is_valid(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::Integer(_) | Self::Text(_) => true,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field name to scalar value, kept sorted by name.
pub type FieldValues = BTreeMap<String, ScalarValue>;

/// Predicate identifying the target record. Always carries `pk`.
pub type Conditions = BTreeMap<String, ScalarValue>;

/// Conditions matching a single record by primary key.
#[must_use]
pub fn primary_key_conditions(target: NodeId) -> Conditions {
    let mut conditions = Conditions::new();
    conditions.insert(
        PRIMARY_KEY_CONDITION.to_string(),
        ScalarValue::Text(target.0.to_string()),
    );
    conditions
}

/// A captured change to a host record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Identity and bookkeeping timestamps.
    pub node: Node<OperationId>,
    /// Store-wide capture sequence number. Strictly increasing.
    pub sequence: u64,
    /// Qualified model name, `"<app>:<model>"`.
    pub model: String,
    /// What happened.
    pub action: Action,
    /// Primary key of the affected record.
    pub target_node_id: NodeId,
    /// Scalar field snapshot. Empty for deletes.
    pub values: FieldValues,
    /// Predicate identifying the target.
    pub conditions: Conditions,
    /// Namespace; selects the chain that will record this operation.
    pub app_name: String,
    /// Block that recorded this operation. `None` while pending.
    #[serde(default)]
    pub block_id: Option<BlockId>,
    /// When the recording block was minted.
    #[serde(default)]
    pub recorded_at: Option<Timestamp>,
}

/// The arguments of a capture, before an id and sequence are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    /// Namespace.
    pub app_name: String,
    /// Qualified model name.
    pub model: String,
    /// What happened.
    pub action: Action,
    /// Primary key of the affected record.
    pub target_node_id: NodeId,
    /// Extra conditions. `pk` is filled in when absent.
    pub conditions: Conditions,
    /// Scalar field snapshot.
    pub values: FieldValues,
}

impl NewOperation {
    /// Start a capture with only the primary key condition and no values.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        model: impl Into<String>,
        action: Action,
        target_node_id: NodeId,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            model: model.into(),
            action,
            target_node_id,
            conditions: primary_key_conditions(target_node_id),
            values: FieldValues::new(),
        }
    }

    /// Replace the value snapshot.
    #[must_use]
    pub fn with_values(mut self, values: FieldValues) -> Self {
        self.values = values;
        self
    }

    /// Add or replace a single value.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: ScalarValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Add a condition.
    #[must_use]
    pub fn with_condition(mut self, field: impl Into<String>, value: ScalarValue) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    /// Check the capture is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidRecord`] for an invalid namespace, an
    /// empty model, non-finite floats, or a delete that carries values.
    pub fn validate(&self) -> LedgerResult<()> {
        validate_app_name(&self.app_name)?;
        if self.model.trim().is_empty() {
            return Err(LedgerError::InvalidRecord("model must not be empty".into()));
        }
        if self.action == Action::Delete && !self.values.is_empty() {
            return Err(LedgerError::InvalidRecord(
                "delete operations carry no values".into(),
            ));
        }
        if let Some((field, _)) = self
            .values
            .iter()
            .chain(self.conditions.iter())
            .find(|(_, v)| !v.is_valid())
        {
            return Err(LedgerError::InvalidRecord(format!(
                "field '{field}' is not a finite scalar"
            )));
        }
        Ok(())
    }
}

/// Check an application namespace is usable as a storage key.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidRecord`] if the name is empty, padded with
/// whitespace, or contains control characters.
pub fn validate_app_name(app_name: &str) -> LedgerResult<()> {
    if app_name.is_empty() {
        return Err(LedgerError::InvalidRecord("app name must not be empty".into()));
    }
    if app_name.trim() != app_name || app_name.chars().any(char::is_control) {
        return Err(LedgerError::InvalidRecord(format!(
            "app name {app_name:?} contains whitespace padding or control characters"
        )));
    }
    Ok(())
}

/// The projection of an operation embedded in a block's data.
///
/// Everything here is covered by the block's content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Operation id.
    pub id: OperationId,
    /// Capture sequence number.
    pub sequence: u64,
    /// Qualified model name.
    pub model: String,
    /// What happened.
    pub action: Action,
    /// Primary key of the affected record.
    pub target_node_id: NodeId,
    /// Scalar field snapshot.
    pub values: FieldValues,
    /// Predicate identifying the target.
    pub conditions: Conditions,
    /// When the change was captured.
    pub created_at: Timestamp,
}

impl Operation {
    /// Assign identity and sequence to a validated capture.
    pub(crate) fn from_new(new: NewOperation, sequence: u64, created_at: Timestamp) -> Self {
        let NewOperation {
            app_name,
            model,
            action,
            target_node_id,
            mut conditions,
            values,
        } = new;
        conditions
            .entry(PRIMARY_KEY_CONDITION.to_string())
            .or_insert_with(|| ScalarValue::Text(target_node_id.0.to_string()));

        Self {
            node: Node::with_id(OperationId::new(), created_at),
            sequence,
            model,
            action,
            target_node_id,
            values,
            conditions,
            app_name,
            block_id: None,
            recorded_at: None,
        }
    }

    /// The operation id.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.node.id
    }

    /// When the change was captured.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.node.created_at
    }

    /// Whether a block has claimed this operation.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        self.block_id.is_some()
    }

    /// The projection stored in a block.
    #[must_use]
    pub fn record(&self) -> OperationRecord {
        OperationRecord {
            id: self.id(),
            sequence: self.sequence,
            model: self.model.clone(),
            action: self.action,
            target_node_id: self.target_node_id,
            values: self.values.clone(),
            conditions: self.conditions.clone(),
            created_at: self.created_at(),
        }
    }

    /// Key in the per-namespace pending index. Sorts in capture order and
    /// is unique per operation.
    #[must_use]
    pub fn pending_key(&self) -> String {
        format!(
            "{:020}-{:020}-{}",
            self.created_at().unix_micros(),
            self.sequence,
            self.id().0.simple()
        )
    }
}
