//! Canonical block encoding and content hashing.
//!
//! Encoding v1, in order:
//!
//! 1. parent tag: `0x00` for genesis, `0x01` followed by the parent's 16 id bytes
//! 2. header: big-endian `u64` length, then compact JSON
//! 3. data: big-endian `u64` length, then compact JSON
//!
//! JSON objects are built from sorted maps and fixed-order structs, so the
//! same logical content always yields the same bytes. The bytes are hashed
//! with BLAKE3 in key-derivation mode and the 256-bit digest is truncated to
//! a 128-bit [`ContentId`].

use chainlog_core::BlockId;
use chainlog_crypto::{ContentHash, ContentId};

use crate::block::BlockHeader;
use crate::error::LedgerResult;
use crate::operation::OperationRecord;

/// BLAKE3 derive-key context for block content, encoding v1.
pub const BLOCK_CONTENT_CONTEXT: &str = "chainlog 2024-06-01 block content v1";

const GENESIS_TAG: u8 = 0x00;
const PARENT_TAG: u8 = 0x01;

/// Deterministic content hashing for blocks.
pub struct HashCodec;

impl HashCodec {
    /// Canonical bytes of a block's hashed content.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the header or data cannot be encoded.
    pub fn canonical_bytes(
        parent_id: Option<BlockId>,
        header: &BlockHeader,
        data: &[OperationRecord],
    ) -> LedgerResult<Vec<u8>> {
        let header = serde_json::to_vec(header)?;
        let data = serde_json::to_vec(data)?;

        let mut out = Vec::with_capacity(
            33usize
                .saturating_add(header.len())
                .saturating_add(data.len()),
        );
        match parent_id {
            Some(parent) => {
                out.push(PARENT_TAG);
                out.extend_from_slice(parent.as_bytes());
            },
            None => out.push(GENESIS_TAG),
        }
        push_framed(&mut out, &header);
        push_framed(&mut out, &data);
        Ok(out)
    }

    /// Content id of a block.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the header or data cannot be encoded.
    pub fn hash(
        parent_id: Option<BlockId>,
        header: &BlockHeader,
        data: &[OperationRecord],
    ) -> LedgerResult<ContentId> {
        Ok(ContentId::from_digest(&Self::digest(parent_id, header, data)?))
    }

    /// Full 256-bit digest of a block.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the header or data cannot be encoded.
    pub fn digest(
        parent_id: Option<BlockId>,
        header: &BlockHeader,
        data: &[OperationRecord],
    ) -> LedgerResult<ContentHash> {
        let bytes = Self::canonical_bytes(parent_id, header, data)?;
        Ok(ContentHash::hash_with_domain(BLOCK_CONTENT_CONTEXT, &bytes))
    }
}

fn push_framed(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
}
