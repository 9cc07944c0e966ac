//! Chainlog Crypto - Content hashing for block identity.
//!
//! This crate provides:
//! - [`ContentHash`]: a 256-bit BLAKE3 digest
//! - [`ContentId`]: the 128-bit identity derived from a digest, stored on
//!   every sealed block
//!
//! # Threat model
//!
//! Content hashes make accidental corruption and silent divergence
//! detectable. They are not credentials: anyone with write access to storage
//! can recompute a matching hash.
//!
//! # Example
//!
//! ```
//! use chainlog_crypto::{ContentHash, ContentId};
//!
//! let digest = ContentHash::hash_with_domain("example", b"payload");
//! let id = ContentId::from_digest(&digest);
//! assert_eq!(&id.as_bytes()[..], &digest.as_bytes()[..16]);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod content_id;
mod hash;

pub use content_id::ContentId;
pub use hash::ContentHash;
