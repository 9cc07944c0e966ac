//! Per-namespace chains.

use chainlog_core::{BlockId, ChainId, Node, Timestamp};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::{LedgerError, LedgerResult};
use crate::operation::validate_app_name;

/// The sequence of minted blocks for one application namespace.
///
/// A chain only stores its two ends. The blocks themselves link backwards
/// through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Identity and bookkeeping timestamps.
    pub node: Node<ChainId>,
    /// Namespace this chain records. Unique across chains.
    pub app_name: String,
    /// Most recently minted block.
    #[serde(default)]
    pub head_block_id: Option<BlockId>,
    /// First block ever minted. Never changes once set.
    #[serde(default)]
    pub genesis_block_id: Option<BlockId>,
    /// Number of minted blocks.
    #[serde(default)]
    pub block_count: u64,
}

impl Chain {
    /// Create an empty chain for a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidRecord`] if the namespace is not usable.
    pub fn new(app_name: impl Into<String>) -> LedgerResult<Self> {
        let app_name = app_name.into();
        validate_app_name(&app_name)?;
        Ok(Self {
            node: Node::new(),
            app_name,
            head_block_id: None,
            genesis_block_id: None,
            block_count: 0,
        })
    }

    /// The chain id.
    #[must_use]
    pub fn id(&self) -> ChainId {
        self.node.id
    }

    /// Whether no block has been minted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head_block_id.is_none()
    }

    /// Height the next block will get.
    #[must_use]
    pub fn next_height(&self) -> u64 {
        self.block_count
    }

    /// Move the head to a freshly sealed block.
    ///
    /// The block must belong to this chain and extend the current head. The
    /// first block becomes genesis.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IntegrityViolation`] if the block is unsealed,
    /// belongs elsewhere, or does not extend the head.
    pub fn advance_head(&mut self, block: &Block, at: Timestamp) -> LedgerResult<()> {
        let violation = |reason: String| LedgerError::IntegrityViolation {
            chain: self.app_name.clone(),
            reason,
        };

        if !block.is_sealed() {
            return Err(violation(format!("block {} is not sealed", block.id())));
        }
        if block.chain_id != self.id() {
            return Err(violation(format!(
                "block {} belongs to {}",
                block.id(),
                block.chain_id
            )));
        }
        if block.parent_id != self.head_block_id {
            return Err(violation(format!(
                "block {} does not extend head {:?}",
                block.id(),
                self.head_block_id
            )));
        }
        if block.height != self.block_count {
            return Err(violation(format!(
                "block {} has height {}, expected {}",
                block.id(),
                block.height,
                self.block_count
            )));
        }

        if self.genesis_block_id.is_none() {
            self.genesis_block_id = Some(block.id());
        }
        self.head_block_id = Some(block.id());
        self.block_count = self.block_count.saturating_add(1);
        self.node.touch(at);
        Ok(())
    }
}
