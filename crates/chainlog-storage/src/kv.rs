//! Raw key-value store trait and implementations.
//!
//! The [`KvStore`] trait provides byte-level `get`/`set`/`delete` operations
//! with namespaced keys, ordered key listing, and atomic multi-key batches.
//!
//! # Namespacing
//!
//! Every key lives in a namespace. The ledger uses `chainlog:*` namespaces,
//! one per entity kind plus one pending index per chain.
//!
//! # Ordering
//!
//! [`KvStore::list_keys`] returns keys in ascending byte order on every
//! backend. The ledger relies on this to read pending operations in creation
//! order without sorting whole records.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a namespace is safe for use as a key prefix.
///
/// Namespaces must be non-empty and must not contain the null byte
/// (used internally as the namespace/key separator).
fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Validate that a key is safe for storage.
///
/// Keys must be non-empty and must not contain the null byte.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Build the composite key `"{namespace}\0{key}"` as bytes.
#[cfg(feature = "kv")]
fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(namespace.len().saturating_add(key.len()).saturating_add(1));
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Build a namespace range bound: `"{namespace}{terminator}"`.
///
/// Keys in a namespace all have the form `"{namespace}\0{key}"`, so the
/// half-open range `["{namespace}\0", "{namespace}\x01")` captures exactly
/// the namespace.
#[cfg(feature = "kv")]
fn namespace_bound(namespace: &str, terminator: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(namespace.len().saturating_add(1));
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(terminator);
    buf
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    /// Insert or overwrite a value.
    Set {
        /// Target namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
        /// New value bytes.
        value: Vec<u8>,
    },
    /// Remove a key (no-op if absent).
    Delete {
        /// Target namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
    },
}

impl KvWrite {
    /// Build a `Set` write.
    #[must_use]
    pub fn set(namespace: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Set {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }

    /// Build a `Delete` write.
    #[must_use]
    pub fn delete(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Delete {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    fn validate(&self) -> StorageResult<()> {
        let (Self::Set { namespace, key, .. } | Self::Delete { namespace, key }) = self;
        validate_namespace(namespace)?;
        validate_key(key)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw key-value store trait.
///
/// Provides namespaced byte-level storage. All operations are scoped
/// to a namespace for isolation.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a namespace and key.
    ///
    /// Overwrites any existing value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key from a namespace.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Check if a key exists in a namespace.
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace, in ascending byte order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Apply every write in `writes` as one atomic unit.
    ///
    /// Either all writes become visible or none do. Writes are applied in
    /// order, so a later write to the same key wins.
    async fn write_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (always available)
// ---------------------------------------------------------------------------

type Namespaces = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// In-memory key-value store for tests and ephemeral ledgers.
///
/// Each namespace is an ordered map, so key listing is ordered for free.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: std::sync::RwLock<Namespaces>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Namespaces>> {
        self.data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Namespaces>> {
        self.data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    fn apply(data: &mut Namespaces, write: KvWrite) {
        match write {
            KvWrite::Set {
                namespace,
                key,
                value,
            } => {
                data.entry(namespace).or_default().insert(key, value);
            },
            KvWrite::Delete { namespace, key } => {
                if let Some(ns) = data.get_mut(&namespace) {
                    ns.remove(&key);
                }
            },
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self.read()?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.write()?;
        Self::apply(&mut data, KvWrite::set(namespace, key, value));
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.write()?;
        Ok(data
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self.read()?;
        Ok(data.get(namespace).is_some_and(|ns| ns.contains_key(key)))
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let data = self.read()?;
        Ok(data
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn write_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()> {
        for write in &writes {
            write.validate()?;
        }
        let mut data = self.write()?;
        for write in writes {
            Self::apply(&mut data, write);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SurrealKV implementation (behind `kv` feature)
// ---------------------------------------------------------------------------

/// Persistent key-value store backed by `SurrealKV`.
///
/// ACID-compliant, versioned, embedded LSM-tree storage.
/// All operations use transactions internally.
///
/// # Example
///
/// ```rust,ignore
/// use chainlog_storage::SurrealKvStore;
///
/// let store = SurrealKvStore::open("./data/ledger")?;
/// store.set("chainlog:chains", "shop", b"{}".to_vec()).await?;
/// ```
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
}

#[cfg(feature = "kv")]
impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Open a persistent KV store at the given directory path.
    ///
    /// Creates the directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        tracing::debug!(path = %path.as_ref().display(), "opened SurrealKV store");
        Ok(Self { tree })
    }

    /// Close the store, flushing any pending writes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the flush fails.
    pub async fn close(&self) -> StorageResult<()> {
        self.tree
            .close()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[cfg(feature = "kv")]
fn map_kv_err(e: &surrealkv::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[cfg(feature = "kv")]
#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        tx.get(&ck).map_err(|ref e| map_kv_err(e))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        tx.set(&ck, &value).map_err(|ref e| map_kv_err(e))?;
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        let existed = tx.get(&ck).map_err(|ref e| map_kv_err(e))?.is_some();
        if existed {
            tx.delete(&ck).map_err(|ref e| map_kv_err(e))?;
            tx.commit().await.map_err(|ref e| map_kv_err(e))?;
        }
        Ok(existed)
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let ck = composite_key(namespace, key);
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        Ok(tx.get(&ck).map_err(|ref e| map_kv_err(e))?.is_some())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let start = namespace_bound(namespace, 0);
        let end = namespace_bound(namespace, 1);
        let prefix_len = namespace.len().saturating_add(1);

        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| map_kv_err(e))?;
        let mut iter = tx.range(&start, &end).map_err(|ref e| map_kv_err(e))?;
        iter.seek_first().map_err(|ref e| map_kv_err(e))?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw_key = iter.key();
            if raw_key.len() > prefix_len
                && let Ok(key_str) = std::str::from_utf8(&raw_key[prefix_len..])
            {
                keys.push(key_str.to_string());
            }
            iter.next().map_err(|ref e| map_kv_err(e))?;
        }
        Ok(keys)
    }

    async fn write_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()> {
        for write in &writes {
            write.validate()?;
        }
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.tree.begin().map_err(|ref e| map_kv_err(e))?;
        for write in &writes {
            match write {
                KvWrite::Set {
                    namespace,
                    key,
                    value,
                } => {
                    let ck = composite_key(namespace, key);
                    tx.set(&ck, value).map_err(|ref e| map_kv_err(e))?;
                },
                KvWrite::Delete { namespace, key } => {
                    let ck = composite_key(namespace, key);
                    if tx.get(&ck).map_err(|ref e| map_kv_err(e))?.is_some() {
                        tx.delete(&ck).map_err(|ref e| map_kv_err(e))?;
                    }
                },
            }
        }
        tx.commit().await.map_err(|ref e| map_kv_err(e))
    }
}
