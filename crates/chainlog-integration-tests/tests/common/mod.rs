//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chainlog_core::NodeId;
use chainlog_ledger::{
    Action, Block, FieldValue, KvLedgerStorage, Ledger, NewOperation, Operation, ScalarValue,
    TrackedRecord,
};
use chainlog_storage::{KvStore, KvWrite, MemoryKvStore};

/// Namespace holding serialized blocks.
pub const NS_BLOCKS: &str = "chainlog:blocks";
/// Namespace holding serialized operations.
pub const NS_OPERATIONS: &str = "chainlog:operations";

/// A ledger plus direct access to the KV store underneath it, so tests can
/// tamper with persisted state or reopen the ledger over the same data.
pub struct SharedLedger {
    /// The ledger under test.
    pub ledger: Ledger,
    /// The raw store it writes to.
    pub kv: Arc<dyn KvStore>,
}

impl SharedLedger {
    /// Fresh in-memory ledger.
    pub fn new() -> Self {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let ledger = Ledger::with_storage(Arc::new(KvLedgerStorage::with_store(Arc::clone(&kv))));
        Self { ledger, kv }
    }

    /// A second ledger over the same store, as a restarted process would see it.
    pub fn reopen(&self) -> Ledger {
        Ledger::with_storage(Arc::new(KvLedgerStorage::with_store(Arc::clone(&self.kv))))
    }

    /// Bypass the ledger and overwrite a stored block.
    pub async fn overwrite_block(&self, block: &Block) {
        self.kv
            .write_batch(vec![KvWrite::set(
                NS_BLOCKS,
                block.id().0.to_string(),
                serde_json::to_vec(block).unwrap(),
            )])
            .await
            .unwrap();
    }

    /// Bypass the ledger and overwrite a stored operation.
    pub async fn overwrite_operation(&self, op: &Operation) {
        self.kv
            .write_batch(vec![KvWrite::set(
                NS_OPERATIONS,
                op.id().0.to_string(),
                serde_json::to_vec(op).unwrap(),
            )])
            .await
            .unwrap();
    }

    /// Bypass the ledger and remove a stored block.
    pub async fn remove_block(&self, block: &Block) {
        self.kv
            .write_batch(vec![KvWrite::delete(NS_BLOCKS, block.id().0.to_string())])
            .await
            .unwrap();
    }
}

/// Capture an order write with a single `total` field.
pub fn order(ledger: &Ledger, action: Action, target: NodeId, total: f64) -> Operation {
    ledger
        .operations()
        .append_new(
            NewOperation::new("shop", "shop:order", action, target)
                .with_value("total", ScalarValue::float(total).unwrap()),
        )
        .unwrap()
}

/// A host-side order record.
pub struct ShopOrder {
    /// Primary key.
    pub id: NodeId,
    /// Order total in cents.
    pub total_cents: i64,
    /// Customer reference.
    pub customer: String,
    /// Paid flag (not capturable).
    pub paid: bool,
    /// Free-form attributes (not capturable).
    pub attributes: serde_json::Value,
}

impl ShopOrder {
    /// New unpaid order.
    pub fn new(total_cents: i64, customer: &str) -> Self {
        Self {
            id: NodeId::new(),
            total_cents,
            customer: customer.to_owned(),
            paid: false,
            attributes: serde_json::json!({ "gift": true }),
        }
    }
}

impl TrackedRecord for ShopOrder {
    fn app_name(&self) -> &str {
        "shop"
    }

    fn model_name(&self) -> &str {
        "order"
    }

    fn primary_key(&self) -> NodeId {
        self.id
    }

    fn fields(&self) -> Vec<(String, FieldValue)> {
        vec![
            ("total_cents".into(), FieldValue::Integer(self.total_cents)),
            ("customer".into(), FieldValue::Text(self.customer.clone())),
            ("paid".into(), FieldValue::Boolean(self.paid)),
            ("attributes".into(), FieldValue::Json(self.attributes.clone())),
            ("cancelled_at".into(), FieldValue::Null),
        ]
    }
}
