//! Chainlog Storage - the persistence seam of the ledger.
//!
//! The ledger needs very little from a storage engine: namespaced byte
//! values, ordered key listing, and the ability to commit several writes as
//! one all-or-nothing unit. [`KvStore`] is exactly that surface.
//!
//! # Backends
//!
//! | Backend | Feature | Use |
//! |---------|---------|-----|
//! | [`MemoryKvStore`] | always | tests, ephemeral ledgers |
//! | `SurrealKvStore` | **`kv`** | embedded, ACID, LSM-tree persistence |
//!
//! # Atomicity
//!
//! [`KvStore::write_batch`] applies a list of [`KvWrite`]s atomically. The
//! in-memory store applies them under one write lock; `SurrealKV` applies
//! them inside one transaction. A crash mid-batch leaves none of the writes
//! visible.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;
pub mod prelude;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, KvWrite, MemoryKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
