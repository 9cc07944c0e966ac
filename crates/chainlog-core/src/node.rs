//! The shared node shape.
//!
//! Every persisted entity (chain, block, operation) embeds a [`Node`] by
//! value, parameterized by its own id type. Behavior differs per entity, so
//! there is no trait object over it.

use serde::{Deserialize, Serialize};

use crate::base62;
use crate::types::{EntityId, NodeId, Timestamp};

/// Identity and bookkeeping timestamps shared by all entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node<I = NodeId> {
    /// Unique identifier. Never changes once assigned.
    pub id: I,
    /// When the entity was created.
    pub created_at: Timestamp,
    /// When the entity was last written.
    pub updated_at: Timestamp,
    /// Soft-delete marker. Carried for schema symmetry; nothing in the
    /// ledger sets or reads it.
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

impl<I: EntityId> Node<I> {
    /// Create a node with a fresh id, created now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(I::generate(), Timestamp::now())
    }

    /// Create a node with an explicit id and creation time.
    #[must_use]
    pub fn with_id(id: I, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Base-62 rendering of the id.
    #[must_use]
    pub fn identifier(&self) -> String {
        base62::encode(self.id.as_u128())
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }
}

impl<I: EntityId> Default for Node<I> {
    fn default() -> Self {
        Self::new()
    }
}
