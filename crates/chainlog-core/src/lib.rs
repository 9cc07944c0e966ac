//! Chainlog Core - Foundation types shared by every chainlog crate.
//!
//! This crate provides:
//! - Typed 128-bit identifiers for chains, blocks, operations and tracked records
//! - The [`Timestamp`] wrapper used for every recorded instant
//! - The [`Node`] shape embedded by value in every persisted entity
//! - A base-62 codec for rendering identifiers to humans
//!
//! # Example
//!
//! ```
//! use chainlog_core::{base62, BlockId, Node};
//!
//! let node: Node<BlockId> = Node::new();
//! let short = node.identifier();
//! assert_eq!(base62::decode(&short).unwrap(), node.id.as_u128());
//!
//! let block_id = BlockId::new();
//! assert_ne!(block_id, BlockId::new());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod base62;
pub mod error;
pub mod node;
pub mod types;

pub use error::{CodecError, CodecResult};
pub use node::Node;
pub use types::{BlockId, ChainId, EntityId, NodeId, OperationId, Timestamp};
