//! Blocks: sealed, hash-identified batches of operations.
//!
//! A block is assembled in memory, sealed exactly once, and persisted only
//! after sealing. There is no way to unseal, edit or delete it afterwards.

use chainlog_core::{BlockId, ChainId, Node, Timestamp};
use chainlog_crypto::ContentId;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::codec::HashCodec;
use crate::error::{LedgerError, LedgerResult};
use crate::operation::{Operation, OperationRecord};

/// Lifecycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Accepting operations.
    Assembling,
    /// Hashed and frozen.
    Sealed,
}

/// Metadata fixed at sealing time and covered by the content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Zero-based position in the chain.
    pub height: u64,
    /// Predecessor, `None` for genesis.
    pub parent_id: Option<BlockId>,
    /// Number of operations in the block's data.
    pub operation_count: u64,
    /// When the block was sealed.
    pub sealed_at: Timestamp,
    /// Namespace of the owning chain.
    pub app_name: String,
}

/// A batch of operations linked to its predecessor by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Identity and bookkeeping timestamps.
    pub node: Node<BlockId>,
    /// Owning chain.
    pub chain_id: ChainId,
    /// Namespace of the owning chain.
    pub app_name: String,
    /// Zero-based position in the chain.
    pub height: u64,
    /// Predecessor, `None` for genesis.
    pub parent_id: Option<BlockId>,
    /// Content identity, set when sealed.
    #[serde(default)]
    pub content_hash: Option<ContentId>,
    /// Sealed metadata.
    #[serde(default)]
    pub header: Option<BlockHeader>,
    /// Recorded operations, in recording order.
    #[serde(default)]
    pub data: Vec<OperationRecord>,
    /// When the block was minted. Non-null means sealed.
    #[serde(default)]
    pub minted_at: Option<Timestamp>,
    #[serde(skip)]
    recorded: Vec<Operation>,
}

impl Block {
    /// Start assembling a block on a chain.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IntegrityViolation`] if the parent is unsealed
    /// or belongs to another chain.
    pub fn create(chain: &Chain, parent: Option<&Block>) -> LedgerResult<Self> {
        let height = match parent {
            Some(parent) => {
                if !parent.is_sealed() || parent.chain_id != chain.id() {
                    return Err(LedgerError::IntegrityViolation {
                        chain: chain.app_name.clone(),
                        reason: format!(
                            "parent {} is unsealed or on another chain",
                            parent.id()
                        ),
                    });
                }
                parent.height.saturating_add(1)
            },
            None => 0,
        };

        Ok(Self {
            node: Node::new(),
            chain_id: chain.id(),
            app_name: chain.app_name.clone(),
            height,
            parent_id: parent.map(Block::id),
            content_hash: None,
            header: None,
            data: Vec::new(),
            minted_at: None,
            recorded: Vec::new(),
        })
    }

    /// The block id.
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.node.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BlockState {
        if self.minted_at.is_some() {
            BlockState::Sealed
        } else {
            BlockState::Assembling
        }
    }

    /// Whether the block has been sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.state() == BlockState::Sealed
    }

    /// Claim a pending operation for this block.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Immutable`] if the block is sealed
    /// - [`LedgerError::AlreadyRecorded`] if another block already claimed it
    /// - [`LedgerError::IntegrityViolation`] if it belongs to another namespace
    pub fn record_operation(&mut self, mut operation: Operation) -> LedgerResult<()> {
        if self.is_sealed() {
            return Err(LedgerError::immutable(
                "block",
                self.id(),
                "cannot record operations into a sealed block",
            ));
        }
        if let Some(block_id) = operation.block_id {
            return Err(LedgerError::AlreadyRecorded {
                operation_id: operation.id().to_string(),
                block_id: block_id.to_string(),
            });
        }
        if operation.app_name != self.app_name {
            return Err(LedgerError::IntegrityViolation {
                chain: self.app_name.clone(),
                reason: format!(
                    "operation {} belongs to namespace {}",
                    operation.id(),
                    operation.app_name
                ),
            });
        }

        operation.block_id = Some(self.id());
        self.data.push(operation.record());
        self.recorded.push(operation);
        Ok(())
    }

    /// Freeze the block and compute its content hash.
    ///
    /// Stamps `recorded_at` on every operation recorded since assembly began.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadySealed`] on a second call, or a
    /// serialization error if hashing fails. On error the block is unchanged.
    pub fn seal(&mut self, at: Timestamp) -> LedgerResult<()> {
        if self.is_sealed() {
            return Err(LedgerError::AlreadySealed {
                block_id: self.id().to_string(),
            });
        }

        let header = BlockHeader {
            height: self.height,
            parent_id: self.parent_id,
            operation_count: u64::try_from(self.data.len()).unwrap_or(u64::MAX),
            sealed_at: at,
            app_name: self.app_name.clone(),
        };
        let content_hash = HashCodec::hash(self.parent_id, &header, &self.data)?;

        self.header = Some(header);
        self.content_hash = Some(content_hash);
        self.minted_at = Some(at);
        self.node.touch(at);
        for operation in &mut self.recorded {
            operation.recorded_at = Some(at);
            operation.node.touch(at);
        }
        Ok(())
    }

    /// Recompute the content hash from the stored header and data.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IntegrityViolation`] if the block is not sealed,
    /// or a serialization error if hashing fails.
    pub fn recompute_hash(&self) -> LedgerResult<ContentId> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| LedgerError::IntegrityViolation {
                chain: self.app_name.clone(),
                reason: format!("block {} has no header", self.id()),
            })?;
        HashCodec::hash(self.parent_id, header, &self.data)
    }

    /// Whether the stored content hash matches the content.
    ///
    /// # Errors
    ///
    /// See [`Block::recompute_hash`].
    pub fn verify_content_hash(&self) -> LedgerResult<bool> {
        Ok(self.content_hash == Some(self.recompute_hash()?))
    }

    /// Blocks are never deleted.
    ///
    /// # Errors
    ///
    /// Always returns [`LedgerError::Immutable`].
    pub fn delete(&self) -> LedgerResult<()> {
        Err(LedgerError::immutable(
            "block",
            self.id(),
            "blocks cannot be deleted",
        ))
    }

    /// Operations recorded by this instance, with their new block id and
    /// (after sealing) `recorded_at`. Empty for blocks loaded from storage.
    #[must_use]
    pub fn recorded_operations(&self) -> &[Operation] {
        &self.recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Action, NewOperation, ScalarValue};
    use chainlog_core::NodeId;

    fn pending(app: &str, total: i64, sequence: u64) -> Operation {
        let new = NewOperation::new(app, format!("{app}:order"), Action::Insert, NodeId::new())
            .with_value("total", ScalarValue::Integer(total));
        Operation::from_new(new, sequence, Timestamp::now())
    }

    fn genesis() -> (Chain, Block) {
        let chain = Chain::new("shop").unwrap();
        let block = Block::create(&chain, None).unwrap();
        (chain, block)
    }

    #[test]
    fn test_create_genesis() {
        let (chain, block) = genesis();
        assert_eq!(block.state(), BlockState::Assembling);
        assert_eq!(block.height, 0);
        assert_eq!(block.parent_id, None);
        assert_eq!(block.chain_id, chain.id());
    }

    #[test]
    fn test_record_and_seal() {
        let (_, mut block) = genesis();
        block.record_operation(pending("shop", 100, 1)).unwrap();
        block.record_operation(pending("shop", 200, 2)).unwrap();

        let at = Timestamp::now();
        block.seal(at).unwrap();

        assert!(block.is_sealed());
        assert_eq!(block.minted_at, Some(at));
        assert_eq!(block.data.len(), 2);
        assert_eq!(block.header.as_ref().unwrap().operation_count, 2);
        assert!(block.verify_content_hash().unwrap());
        for op in block.recorded_operations() {
            assert_eq!(op.block_id, Some(block.id()));
            assert_eq!(op.recorded_at, Some(at));
        }
    }

    #[test]
    fn test_seal_empty_block() {
        let (_, mut block) = genesis();
        block.seal(Timestamp::now()).unwrap();
        assert!(block.data.is_empty());
        assert!(block.content_hash.is_some());
    }

    #[test]
    fn test_seal_twice_fails() {
        let (_, mut block) = genesis();
        block.seal(Timestamp::now()).unwrap();
        let hash = block.content_hash;
        let err = block.seal(Timestamp::now()).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySealed { .. }));
        assert_eq!(block.content_hash, hash);
    }

    #[test]
    fn test_record_into_sealed_fails() {
        let (_, mut block) = genesis();
        block.seal(Timestamp::now()).unwrap();
        let err = block.record_operation(pending("shop", 1, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::Immutable { .. }));
        assert!(block.data.is_empty());
    }

    #[test]
    fn test_record_claimed_operation_fails() {
        let (_, mut block) = genesis();
        let mut op = pending("shop", 1, 1);
        op.block_id = Some(BlockId::new());
        let err = block.record_operation(op).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRecorded { .. }));
    }

    #[test]
    fn test_record_foreign_namespace_fails() {
        let (_, mut block) = genesis();
        let err = block.record_operation(pending("billing", 1, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_delete_always_fails() {
        let (_, mut block) = genesis();
        assert!(block.delete().is_err());
        block.seal(Timestamp::now()).unwrap();
        assert!(matches!(block.delete(), Err(LedgerError::Immutable { .. })));
    }

    #[test]
    fn test_child_links_parent() {
        let (chain, mut parent) = genesis();
        assert!(Block::create(&chain, Some(&parent)).is_err());

        parent.seal(Timestamp::now()).unwrap();
        let child = Block::create(&chain, Some(&parent)).unwrap();
        assert_eq!(child.parent_id, Some(parent.id()));
        assert_eq!(child.height, 1);
    }

    #[test]
    fn test_tampered_data_detected() {
        let (_, mut block) = genesis();
        block.record_operation(pending("shop", 100, 1)).unwrap();
        block.seal(Timestamp::now()).unwrap();

        block.data[0]
            .values
            .insert("total".into(), ScalarValue::Integer(999));
        assert!(!block.verify_content_hash().unwrap());
    }

    #[test]
    fn test_identical_content_different_parent() {
        let chain = Chain::new("shop").unwrap();
        let at = Timestamp::now();
        let mut a = Block::create(&chain, None).unwrap();
        a.seal(at).unwrap();
        let mut b = Block::create(&chain, None).unwrap();
        b.seal(at).unwrap();
        assert_eq!(a.content_hash, b.content_hash);

        let mut c = Block::create(&chain, Some(&a)).unwrap();
        c.height = 0;
        c.seal(at).unwrap();
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn test_serde_skips_recorded_operations() {
        let (_, mut block) = genesis();
        block.record_operation(pending("shop", 100, 1)).unwrap();
        block.seal(Timestamp::now()).unwrap();

        let bytes = serde_json::to_vec(&block).unwrap();
        let back: Block = serde_json::from_slice(&bytes).unwrap();
        assert!(back.recorded_operations().is_empty());
        assert_eq!(back.data, block.data);
        assert!(back.verify_content_hash().unwrap());
    }
}
