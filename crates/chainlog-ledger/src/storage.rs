//! Ledger storage trait and KV-backed implementation.

use chainlog_core::{BlockId, OperationId};
use chainlog_storage::{KvStore, KvWrite, MemoryKvStore, SurrealKvStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use chainlog_core::Timestamp;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::block::Block;
use crate::chain::Chain;
use crate::error::{LedgerError, LedgerResult};
use crate::operation::{NewOperation, Operation};

/// Storage backend for the ledger.
///
/// Implementations must be thread-safe and enforce immutability themselves:
/// sealed blocks and recorded operations can never be overwritten, and
/// nothing can ever be deleted. The only path that writes sealed state is
/// [`LedgerStorage::commit_mint`].
pub trait LedgerStorage: Send + Sync {
    /// Assign the next store-wide sequence number and a creation time to a
    /// new operation and persist it as pending.
    ///
    /// Allocation and insert happen as one step, so every caller sharing
    /// this storage sees distinct, increasing sequences.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or [`LedgerError::StorageError`] once the
    /// sequence space is exhausted.
    fn append_operation(&self, new: NewOperation) -> LedgerResult<Operation>;

    /// Get an operation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    fn get_operation(&self, id: &OperationId) -> LedgerResult<Option<Operation>>;

    /// Overwrite a pending operation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Immutable`] once the stored operation is
    /// recorded, or when the caller tries to assign a block itself.
    fn save_operation(&self, operation: &Operation) -> LedgerResult<()>;

    /// Operations are never deleted.
    ///
    /// # Errors
    ///
    /// Always returns [`LedgerError::Immutable`].
    fn delete_operation(&self, id: &OperationId) -> LedgerResult<()>;

    /// Pending operations of a namespace, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    fn pending_operations(&self, app_name: &str) -> LedgerResult<Vec<Operation>>;

    /// Number of pending operations in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn count_pending(&self, app_name: &str) -> LedgerResult<usize>;

    /// Get a block by id.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    fn get_block(&self, id: &BlockId) -> LedgerResult<Option<Block>>;

    /// Persist an unsealed block draft.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Immutable`] if either the given or the stored
    /// block is sealed.
    fn save_block(&self, block: &Block) -> LedgerResult<()>;

    /// Blocks are never deleted.
    ///
    /// # Errors
    ///
    /// Always returns [`LedgerError::Immutable`].
    fn delete_block(&self, id: &BlockId) -> LedgerResult<()>;

    /// Get the chain of a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    fn get_chain(&self, app_name: &str) -> LedgerResult<Option<Chain>>;

    /// All chains, ordered by namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    fn list_chains(&self) -> LedgerResult<Vec<Chain>>;

    /// Atomically persist a sealed block, its recorded operations, the
    /// removal of those operations from the pending index, and the advanced
    /// chain.
    ///
    /// `expected_head` is the head the block was built on; `None` means the
    /// block is the genesis of a chain that is created by this commit. If the
    /// stored chain has moved since, or any operation was recorded or edited
    /// elsewhere in the meantime, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IntegrityViolation`] or
    /// [`LedgerError::AlreadyRecorded`] on a conflict, or a storage error.
    fn commit_mint(
        &self,
        chain: &Chain,
        expected_head: Option<BlockId>,
        block: &Block,
    ) -> LedgerResult<()>;
}

// -- Namespace constants --

const NS_CHAINS: &str = "chainlog:chains";
const NS_BLOCKS: &str = "chainlog:blocks";
const NS_OPERATIONS: &str = "chainlog:operations";
const NS_META: &str = "chainlog:meta";
const PENDING_PREFIX: &str = "chainlog:pending:";

const KEY_OPERATION_SEQUENCE: &str = "operation_sequence";

fn pending_namespace(app_name: &str) -> String {
    format!("{PENDING_PREFIX}{app_name}")
}

/// Run an async future synchronously.
///
/// Store operations are in-process, so bridging the sync [`LedgerStorage`]
/// trait to the async [`KvStore`] trait is cheap.
///
/// - Inside a tokio runtime: drives the future on a scoped thread, since
///   blocking the runtime's own thread would panic.
/// - Outside a runtime: builds a temporary current-thread runtime.
fn block_on<F>(f: F) -> LedgerResult<F::Output>
where
    F: std::future::Future + Send,
    F::Output: Send,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => std::thread::scope(|s| s.spawn(|| handle.block_on(f)).join())
            .map_err(|_| LedgerError::StorageError("storage thread panicked".into())),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(|rt| rt.block_on(f))
            .map_err(|e| LedgerError::StorageError(format!("failed to create runtime: {e}"))),
    }
}

/// [`LedgerStorage`] over any [`KvStore`].
///
/// Every check-then-write path runs under one write lock, so a store should
/// be wrapped by a single `KvLedgerStorage` at a time.
pub struct KvLedgerStorage {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl KvLedgerStorage {
    /// Open or create persistent storage at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SurrealKV` store fails to open.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let store = SurrealKvStore::open(path)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Create an in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryKvStore::new()))
    }

    /// Wrap an existing store.
    #[must_use]
    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn exclusive(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| LedgerError::StorageError(format!("storage write lock poisoned: {e}")))
    }

    fn last_sequence(&self) -> LedgerResult<u64> {
        Ok(self
            .read::<u64>(NS_META, KEY_OPERATION_SEQUENCE)?
            .unwrap_or(0))
    }

    /// Write a pending operation, its index entry and the sequence marker.
    /// Callers hold the write lock.
    fn insert_pending(&self, operation: &Operation) -> LedgerResult<()> {
        let key = operation.id().0.to_string();
        if block_on(self.store.exists(NS_OPERATIONS, &key))?? {
            return Err(LedgerError::immutable(
                "operation",
                operation.id(),
                "an operation with this id already exists",
            ));
        }

        self.batch(vec![
            Self::set_write(NS_OPERATIONS, &key, operation)?,
            KvWrite::set(
                pending_namespace(&operation.app_name),
                operation.pending_key(),
                key.clone().into_bytes(),
            ),
            Self::set_write(NS_META, KEY_OPERATION_SEQUENCE, &operation.sequence)?,
        ])
    }

    fn read<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> LedgerResult<Option<T>> {
        match block_on(self.store.get(namespace, key))?? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(value)?;
        block_on(self.store.set(namespace, key, bytes))??;
        Ok(())
    }

    fn batch(&self, writes: Vec<KvWrite>) -> LedgerResult<()> {
        block_on(self.store.write_batch(writes))??;
        Ok(())
    }

    fn set_write<T: Serialize>(namespace: &str, key: &str, value: &T) -> LedgerResult<KvWrite> {
        Ok(KvWrite::set(namespace, key, serde_json::to_vec(value)?))
    }
}

impl LedgerStorage for KvLedgerStorage {
    fn append_operation(&self, new: NewOperation) -> LedgerResult<Operation> {
        let _guard = self.exclusive()?;
        let next = self.last_sequence()?.checked_add(1).ok_or_else(|| {
            LedgerError::StorageError("operation sequence exhausted".into())
        })?;
        let operation = Operation::from_new(new, next, Timestamp::now());
        self.insert_pending(&operation)?;
        Ok(operation)
    }

    fn get_operation(&self, id: &OperationId) -> LedgerResult<Option<Operation>> {
        self.read(NS_OPERATIONS, &id.0.to_string())
    }

    fn save_operation(&self, operation: &Operation) -> LedgerResult<()> {
        let _guard = self.exclusive()?;
        let stored = self
            .get_operation(&operation.id())?
            .ok_or_else(|| LedgerError::not_found("operation", operation.id()))?;

        if stored.is_recorded() {
            return Err(LedgerError::immutable(
                "operation",
                operation.id(),
                "recorded operations cannot be modified",
            ));
        }
        if operation.is_recorded() || operation.recorded_at.is_some() {
            return Err(LedgerError::immutable(
                "operation",
                operation.id(),
                "operations are assigned to blocks only by minting",
            ));
        }
        if stored.app_name != operation.app_name
            || stored.sequence != operation.sequence
            || stored.node.created_at != operation.node.created_at
        {
            return Err(LedgerError::InvalidRecord(format!(
                "operation {} namespace, sequence and creation time are fixed",
                operation.id()
            )));
        }

        self.write(NS_OPERATIONS, &operation.id().0.to_string(), operation)
    }

    fn delete_operation(&self, id: &OperationId) -> LedgerResult<()> {
        Err(LedgerError::immutable(
            "operation",
            id,
            "operations cannot be deleted",
        ))
    }

    fn pending_operations(&self, app_name: &str) -> LedgerResult<Vec<Operation>> {
        let namespace = pending_namespace(app_name);
        let keys = block_on(self.store.list_keys(&namespace))??;

        let mut operations = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(id_bytes) = block_on(self.store.get(&namespace, &key))?? else {
                continue;
            };
            let id = std::str::from_utf8(&id_bytes)
                .map_err(|e| LedgerError::StorageError(e.to_string()))?;
            let operation: Operation = self
                .read(NS_OPERATIONS, id)?
                .ok_or_else(|| LedgerError::not_found("operation", id))?;
            operations.push(operation);
        }
        Ok(operations)
    }

    fn count_pending(&self, app_name: &str) -> LedgerResult<usize> {
        let keys = block_on(self.store.list_keys(&pending_namespace(app_name)))??;
        Ok(keys.len())
    }

    fn get_block(&self, id: &BlockId) -> LedgerResult<Option<Block>> {
        self.read(NS_BLOCKS, &id.0.to_string())
    }

    fn save_block(&self, block: &Block) -> LedgerResult<()> {
        if block.is_sealed() {
            return Err(LedgerError::immutable(
                "block",
                block.id(),
                "sealed blocks are written only by minting",
            ));
        }
        let _guard = self.exclusive()?;
        if let Some(stored) = self.get_block(&block.id())?
            && stored.is_sealed()
        {
            return Err(LedgerError::immutable(
                "block",
                block.id(),
                "sealed blocks cannot be modified",
            ));
        }
        self.write(NS_BLOCKS, &block.id().0.to_string(), block)
    }

    fn delete_block(&self, id: &BlockId) -> LedgerResult<()> {
        Err(LedgerError::immutable("block", id, "blocks cannot be deleted"))
    }

    fn get_chain(&self, app_name: &str) -> LedgerResult<Option<Chain>> {
        self.read(NS_CHAINS, app_name)
    }

    fn list_chains(&self) -> LedgerResult<Vec<Chain>> {
        let keys = block_on(self.store.list_keys(NS_CHAINS))??;
        let mut chains = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(chain) = self.read(NS_CHAINS, &key)? {
                chains.push(chain);
            }
        }
        Ok(chains)
    }

    fn commit_mint(
        &self,
        chain: &Chain,
        expected_head: Option<BlockId>,
        block: &Block,
    ) -> LedgerResult<()> {
        let violation = |reason: String| LedgerError::IntegrityViolation {
            chain: chain.app_name.clone(),
            reason,
        };

        if !block.is_sealed() {
            return Err(violation(format!("block {} is not sealed", block.id())));
        }
        if chain.head_block_id != Some(block.id()) || block.chain_id != chain.id() {
            return Err(violation(format!(
                "chain head does not point at block {}",
                block.id()
            )));
        }
        if block.parent_id != expected_head {
            return Err(violation(format!(
                "block {} does not extend {expected_head:?}",
                block.id()
            )));
        }

        let _guard = self.exclusive()?;
        match self.get_chain(&chain.app_name)? {
            Some(stored) if stored.id() != chain.id() => {
                return Err(violation(format!(
                    "namespace is already held by chain {}",
                    stored.id()
                )));
            },
            Some(stored) if stored.head_block_id != expected_head => {
                return Err(violation(format!(
                    "head moved from {expected_head:?} to {:?} during minting",
                    stored.head_block_id
                )));
            },
            None if expected_head.is_some() => {
                return Err(LedgerError::not_found("chain", &chain.app_name));
            },
            _ => {},
        }

        let block_key = block.id().0.to_string();
        if block_on(self.store.exists(NS_BLOCKS, &block_key))?? {
            return Err(LedgerError::immutable(
                "block",
                block.id(),
                "block already persisted",
            ));
        }

        let pending_ns = pending_namespace(&chain.app_name);
        let mut writes = Vec::with_capacity(block.recorded_operations().len().saturating_mul(2));
        writes.push(Self::set_write(NS_BLOCKS, &block_key, block)?);

        for operation in block.recorded_operations() {
            let stored = self
                .get_operation(&operation.id())?
                .ok_or_else(|| LedgerError::not_found("operation", operation.id()))?;
            if let Some(other) = stored.block_id {
                return Err(LedgerError::AlreadyRecorded {
                    operation_id: operation.id().to_string(),
                    block_id: other.to_string(),
                });
            }
            if stored.record() != operation.record() {
                return Err(violation(format!(
                    "operation {} changed during minting",
                    operation.id()
                )));
            }
            let key = operation.id().0.to_string();
            writes.push(Self::set_write(NS_OPERATIONS, &key, operation)?);
            writes.push(KvWrite::delete(pending_ns.clone(), operation.pending_key()));
        }

        writes.push(Self::set_write(NS_CHAINS, &chain.app_name, chain)?);

        debug!(
            chain = %chain.app_name,
            block_id = %block.id(),
            genesis = expected_head.is_none(),
            writes = writes.len(),
            "Committing minted block"
        );
        self.batch(writes)
    }
}

impl std::fmt::Debug for KvLedgerStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvLedgerStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Action, ScalarValue};
    use chainlog_core::NodeId;

    fn order(app: &str) -> NewOperation {
        NewOperation::new(app, format!("{app}:order"), Action::Insert, NodeId::new())
            .with_value("total", ScalarValue::Integer(100))
    }

    fn append(storage: &KvLedgerStorage, app: &str) -> Operation {
        storage.append_operation(order(app)).unwrap()
    }

    /// Assemble and seal the next block of a namespace without committing.
    fn assemble(storage: &KvLedgerStorage, app: &str) -> (Chain, Option<BlockId>, Block) {
        let mut chain = storage
            .get_chain(app)
            .unwrap()
            .unwrap_or_else(|| Chain::new(app).unwrap());
        let expected = chain.head_block_id;
        let parent = expected.map(|id| storage.get_block(&id).unwrap().unwrap());
        let mut block = Block::create(&chain, parent.as_ref()).unwrap();
        for op in storage.pending_operations(app).unwrap() {
            block.record_operation(op).unwrap();
        }
        let at = Timestamp::now();
        block.seal(at).unwrap();
        chain.advance_head(&block, at).unwrap();
        (chain, expected, block)
    }

    fn minted(storage: &KvLedgerStorage, app: &str) -> (Chain, Block) {
        let (chain, expected, block) = assemble(storage, app);
        storage.commit_mint(&chain, expected, &block).unwrap();
        (chain, block)
    }

    #[test]
    fn test_append_and_get_operation() {
        let storage = KvLedgerStorage::in_memory();
        let op = append(&storage, "shop");

        assert_eq!(op.sequence, 1);
        assert_eq!(storage.get_operation(&op.id()).unwrap(), Some(op));
        assert_eq!(storage.last_sequence().unwrap(), 1);
        assert_eq!(storage.count_pending("shop").unwrap(), 1);
        assert_eq!(storage.count_pending("billing").unwrap(), 0);
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let storage = KvLedgerStorage::in_memory();
        let op = append(&storage, "shop");
        assert!(storage.insert_pending(&op).is_err());
    }

    #[test]
    fn test_concurrent_appends_get_distinct_sequences() {
        let storage = Arc::new(KvLedgerStorage::in_memory());
        let mut sequences: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let storage = Arc::clone(&storage);
                    s.spawn(move || {
                        (0..25)
                            .map(|_| append(&storage, "shop").sequence)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        sequences.sort_unstable();
        sequences.dedup();
        assert_eq!(sequences.len(), 100);
        assert_eq!(storage.count_pending("shop").unwrap(), 100);
        assert_eq!(storage.last_sequence().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_pending_in_creation_order() {
        let storage = KvLedgerStorage::in_memory();
        let base = Timestamp::now();
        let mut expected = Vec::new();
        // Insert out of order; the index must sort them back.
        for (offset, seq) in [(2i64, 3u64), (0, 1), (1, 2)] {
            let at = Timestamp::from_datetime(
                base.0
                    .checked_add_signed(chrono::Duration::milliseconds(offset))
                    .unwrap(),
            );
            let op = Operation::from_new(order("shop"), seq, at);
            expected.push((seq, op.id()));
            storage.insert_pending(&op).unwrap();
        }
        expected.sort_unstable();

        let ids: Vec<_> = storage
            .pending_operations("shop")
            .unwrap()
            .iter()
            .map(Operation::id)
            .collect();
        let want: Vec<_> = expected.into_iter().map(|(_, id)| id).collect();
        assert_eq!(ids, want);
    }

    #[test]
    fn test_same_time_and_sequence_keep_both_pending() {
        let storage = KvLedgerStorage::in_memory();
        let at = Timestamp::now();
        let a = Operation::from_new(order("shop"), 7, at);
        let b = Operation::from_new(order("shop"), 7, at);
        storage.insert_pending(&a).unwrap();
        storage.insert_pending(&b).unwrap();

        assert_eq!(storage.count_pending("shop").unwrap(), 2);
    }

    #[test]
    fn test_save_pending_operation() {
        let storage = KvLedgerStorage::in_memory();
        let mut op = append(&storage, "shop");

        op.values.insert("total".into(), ScalarValue::Integer(150));
        storage.save_operation(&op).unwrap();
        let stored = storage.get_operation(&op.id()).unwrap().unwrap();
        assert_eq!(stored.values.get("total"), Some(&ScalarValue::Integer(150)));
    }

    #[test]
    fn test_save_cannot_assign_block() {
        let storage = KvLedgerStorage::in_memory();
        let mut op = append(&storage, "shop");

        op.block_id = Some(BlockId::new());
        let err = storage.save_operation(&op).unwrap_err();
        assert!(matches!(err, LedgerError::Immutable { .. }));
    }

    #[test]
    fn test_deletes_always_fail() {
        let storage = KvLedgerStorage::in_memory();
        let op = append(&storage, "shop");

        assert!(matches!(
            storage.delete_operation(&op.id()),
            Err(LedgerError::Immutable { .. })
        ));
        assert!(matches!(
            storage.delete_block(&BlockId::new()),
            Err(LedgerError::Immutable { .. })
        ));
        assert!(storage.get_operation(&op.id()).unwrap().is_some());
    }

    #[test]
    fn test_commit_mint_persists_everything() {
        let storage = KvLedgerStorage::in_memory();
        let first = append(&storage, "shop");
        let second = append(&storage, "shop");
        assert!(storage.get_chain("shop").unwrap().is_none());

        let (chain, block) = minted(&storage, "shop");

        let stored_chain = storage.get_chain("shop").unwrap().unwrap();
        assert_eq!(stored_chain, chain);
        assert_eq!(stored_chain.genesis_block_id, Some(block.id()));

        let stored_block = storage.get_block(&block.id()).unwrap().unwrap();
        assert!(stored_block.is_sealed());
        assert_eq!(stored_block.data.len(), 2);

        for op in [&first, &second] {
            let stored = storage.get_operation(&op.id()).unwrap().unwrap();
            assert_eq!(stored.block_id, Some(block.id()));
            assert_eq!(stored.recorded_at, block.minted_at);
        }
        assert_eq!(storage.count_pending("shop").unwrap(), 0);
    }

    #[test]
    fn test_recorded_operation_is_immutable() {
        let storage = KvLedgerStorage::in_memory();
        let op = append(&storage, "shop");
        minted(&storage, "shop");

        let mut stored = storage.get_operation(&op.id()).unwrap().unwrap();
        stored.values.clear();
        stored.block_id = None;
        stored.recorded_at = None;
        let err = storage.save_operation(&stored).unwrap_err();
        assert!(matches!(err, LedgerError::Immutable { .. }));
    }

    #[test]
    fn test_commit_rejects_operation_edited_after_assembly() {
        let storage = KvLedgerStorage::in_memory();
        let mut op = append(&storage, "shop");
        let (chain, expected, block) = assemble(&storage, "shop");

        // The edit lands between reading the pending set and committing.
        op.values.insert("total".into(), ScalarValue::Integer(999));
        storage.save_operation(&op).unwrap();

        let err = storage.commit_mint(&chain, expected, &block).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));

        // Nothing from the failed first mint is left behind.
        assert!(storage.get_chain("shop").unwrap().is_none());
        assert!(storage.get_block(&block.id()).unwrap().is_none());
        let stored = storage.get_operation(&op.id()).unwrap().unwrap();
        assert!(!stored.is_recorded());
        assert_eq!(stored.values.get("total"), Some(&ScalarValue::Integer(999)));
        assert_eq!(storage.count_pending("shop").unwrap(), 1);

        // The next mint records the edited values.
        let (_, block) = minted(&storage, "shop");
        assert_eq!(
            block.data[0].values.get("total"),
            Some(&ScalarValue::Integer(999))
        );
    }

    #[test]
    fn test_sealed_block_is_immutable() {
        let storage = KvLedgerStorage::in_memory();
        let (_, block) = minted(&storage, "shop");
        let stored = storage.get_block(&block.id()).unwrap().unwrap();
        let err = storage.save_block(&stored).unwrap_err();
        assert!(matches!(err, LedgerError::Immutable { .. }));
    }

    #[test]
    fn test_save_block_draft() {
        let storage = KvLedgerStorage::in_memory();
        let chain = Chain::new("shop").unwrap();
        let draft = Block::create(&chain, None).unwrap();
        storage.save_block(&draft).unwrap();
        assert!(!storage.get_block(&draft.id()).unwrap().unwrap().is_sealed());
    }

    #[test]
    fn test_commit_rejects_stale_head() {
        let storage = KvLedgerStorage::in_memory();
        let (chain, _) = minted(&storage, "shop");
        let expected = chain.head_block_id;
        let parent = storage.get_block(&expected.unwrap()).unwrap().unwrap();

        // Two minters build on the same head.
        let mut ours = chain.clone();
        let mut theirs = chain;
        let mut a = Block::create(&ours, Some(&parent)).unwrap();
        let mut b = Block::create(&theirs, Some(&parent)).unwrap();
        let at = Timestamp::now();
        a.seal(at).unwrap();
        b.seal(at).unwrap();
        ours.advance_head(&a, at).unwrap();
        theirs.advance_head(&b, at).unwrap();

        storage.commit_mint(&ours, expected, &a).unwrap();
        let err = storage.commit_mint(&theirs, expected, &b).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));
        assert!(storage.get_block(&b.id()).unwrap().is_none());
        assert_eq!(
            storage.get_chain("shop").unwrap().unwrap().head_block_id,
            Some(a.id())
        );
    }

    #[test]
    fn test_first_commit_claims_namespace() {
        let storage = KvLedgerStorage::in_memory();
        let (ours, _) = minted(&storage, "shop");

        // A second chain for the same namespace cannot start a genesis.
        let mut rival = Chain::new("shop").unwrap();
        let mut genesis = Block::create(&rival, None).unwrap();
        let at = Timestamp::now();
        genesis.seal(at).unwrap();
        rival.advance_head(&genesis, at).unwrap();
        let err = storage.commit_mint(&rival, None, &genesis).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));
        assert_eq!(storage.get_chain("shop").unwrap().unwrap().id(), ours.id());

        minted(&storage, "billing");
        let names: Vec<_> = storage
            .list_chains()
            .unwrap()
            .into_iter()
            .map(|c| c.app_name)
            .collect();
        assert_eq!(names, vec!["billing".to_string(), "shop".to_string()]);
    }

    #[test]
    fn test_commit_rejects_double_recording() {
        let storage = KvLedgerStorage::in_memory();
        let op = append(&storage, "shop");
        let (mut chain, parent) = minted(&storage, "shop");

        // A stale copy of the already-recorded operation is claimed again.
        let expected = chain.head_block_id;
        let mut block = Block::create(&chain, Some(&parent)).unwrap();
        block.record_operation(op).unwrap();
        let at = Timestamp::now();
        block.seal(at).unwrap();
        chain.advance_head(&block, at).unwrap();

        let err = storage.commit_mint(&chain, expected, &block).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRecorded { .. }));
        assert!(storage.get_block(&block.id()).unwrap().is_none());
        assert_eq!(
            storage.get_chain("shop").unwrap().unwrap().head_block_id,
            expected
        );
    }

    #[test]
    fn test_commit_rejects_block_off_expected_head() {
        let storage = KvLedgerStorage::in_memory();
        let (mut chain, _) = minted(&storage, "shop");
        let expected = chain.head_block_id;

        let mut orphan = Block::create(&chain, None).unwrap();
        orphan.height = chain.next_height();
        let at = Timestamp::now();
        orphan.seal(at).unwrap();
        chain.head_block_id = Some(orphan.id());

        let err = storage.commit_mint(&chain, expected, &orphan).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_reload_from_backing_store() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let storage = KvLedgerStorage::with_store(Arc::clone(&kv));
        let op = append(&storage, "shop");
        drop(storage);

        let storage = KvLedgerStorage::with_store(kv);
        assert_eq!(storage.get_operation(&op.id()).unwrap(), Some(op));
        assert_eq!(append(&storage, "shop").sequence, 2);
    }

    #[test]
    fn test_disk_backed_storage() {
        // SurrealKV holds an OS-level file lock, so the path is opened once.
        let dir = tempfile::tempdir().unwrap();
        let storage = KvLedgerStorage::open(dir.path().join("ledger")).unwrap();
        append(&storage, "shop");
        let (_, block) = minted(&storage, "shop");

        let stored = storage.get_block(&block.id()).unwrap().unwrap();
        assert!(stored.verify_content_hash().unwrap());
        assert_eq!(storage.count_pending("shop").unwrap(), 0);
    }
}
