//! Ledger - main interface for minting and verifying chains.
//!
//! Ties the operation log, block assembly and storage together and exposes
//! the read side used by auditors.

use chainlog_core::{BlockId, Timestamp};
use chainlog_crypto::ContentId;
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::block::Block;
use crate::capture::ChangeCapture;
use crate::chain::Chain;
use crate::error::{LedgerError, LedgerResult};
use crate::oplog::OperationLog;
use crate::storage::{KvLedgerStorage, LedgerStorage};

/// Hash-chained ledger of captured operations, one chain per namespace.
pub struct Ledger {
    /// Storage backend.
    storage: Arc<dyn LedgerStorage>,
    /// Capture side.
    operations: Arc<OperationLog>,
    /// One minting lock per namespace.
    mint_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Ledger {
    /// Create a ledger with a custom storage backend.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn LedgerStorage>) -> Self {
        Self {
            operations: Arc::new(OperationLog::new(Arc::clone(&storage))),
            storage,
            mint_locks: DashMap::new(),
        }
    }

    /// Create a ledger with `SurrealKV` persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to open at the given path.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let storage = KvLedgerStorage::open(path)?;
        Ok(Self::with_storage(Arc::new(storage)))
    }

    /// Create an in-memory ledger.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(KvLedgerStorage::in_memory()))
    }

    /// The operation log.
    #[must_use]
    pub fn operations(&self) -> &OperationLog {
        &self.operations
    }

    /// A change-capture hook feeding this ledger's operation log.
    #[must_use]
    pub fn capture(&self) -> ChangeCapture {
        ChangeCapture::new(Arc::clone(&self.operations))
    }

    /// Mint a new block from every pending operation of a namespace.
    ///
    /// Creates the namespace's chain on first use. An empty pending set
    /// still produces an (empty) block. Nothing is persisted unless the
    /// whole mint succeeds.
    ///
    /// # Errors
    ///
    /// Returns an integrity or immutability error if the stored state
    /// conflicts with the mint, or a storage error.
    pub fn mine(&self, app_name: &str) -> LedgerResult<Block> {
        let lock = self.mint_lock(app_name);
        let _guard = lock
            .lock()
            .map_err(|e| LedgerError::StorageError(format!("mint lock poisoned: {e}")))?;

        let mut chain = self.get_or_create_chain(app_name)?;
        let expected_head = chain.head_block_id;
        let parent = expected_head
            .map(|id| {
                self.storage
                    .get_block(&id)?
                    .ok_or_else(|| LedgerError::not_found("block", id))
            })
            .transpose()?;

        let mut block = Block::create(&chain, parent.as_ref())?;
        for operation in self.operations.pending_for(app_name)? {
            let operation_id = operation.id();
            if let Err(e) = block.record_operation(operation) {
                error!(
                    chain = %app_name,
                    operation_id = %operation_id,
                    error = %e,
                    "Aborting mint"
                );
                return Err(e);
            }
        }

        // Sealing time never goes backwards along a chain.
        let now = Timestamp::now();
        let sealed_at = parent
            .as_ref()
            .and_then(|p| p.minted_at)
            .map_or(now, |prev| now.max(prev));
        block.seal(sealed_at)?;
        chain.advance_head(&block, sealed_at)?;
        self.storage.commit_mint(&chain, expected_head, &block)?;

        info!(
            chain = %app_name,
            block_id = %block.id(),
            height = block.height,
            operations = block.data.len(),
            content_hash = ?block.content_hash,
            "Minted block"
        );
        Ok(block)
    }

    /// Get the chain of a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn get_chain(&self, app_name: &str) -> LedgerResult<Option<Chain>> {
        self.storage.get_chain(app_name)
    }

    /// All chains, ordered by namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn list_chains(&self) -> LedgerResult<Vec<Chain>> {
        self.storage.list_chains()
    }

    /// Get a block by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn get_block(&self, id: &BlockId) -> LedgerResult<Option<Block>> {
        self.storage.get_block(id)
    }

    /// Blocks of a namespace from genesis to head.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the namespace has no chain or a
    /// linked block is missing.
    pub fn blocks(&self, app_name: &str) -> LedgerResult<Vec<Block>> {
        let chain = self
            .get_chain(app_name)?
            .ok_or_else(|| LedgerError::not_found("chain", app_name))?;
        let walk = self.walk_back(&chain)?;
        if let Some(missing) = walk.missing {
            return Err(LedgerError::not_found("block", missing));
        }
        if walk.cycle.is_some() {
            return Err(LedgerError::IntegrityViolation {
                chain: chain.app_name,
                reason: "parent links form a cycle".into(),
            });
        }
        Ok(walk.blocks)
    }

    /// Verify the integrity of one namespace's chain.
    ///
    /// Recomputes every content hash, checks parent links, heights and
    /// timestamps, and cross-checks every recorded operation against its
    /// stored copy.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the namespace has no chain, or a
    /// storage error.
    pub fn verify_chain(&self, app_name: &str) -> LedgerResult<ChainVerificationResult> {
        let chain = self
            .get_chain(app_name)?
            .ok_or_else(|| LedgerError::not_found("chain", app_name))?;

        let mut issues = Vec::new();
        let walk = self.walk_back(&chain)?;
        if let Some(block_id) = walk.missing {
            warn!(chain = %app_name, block_id = %block_id, "Linked block missing");
            issues.push(ChainIssue::MissingBlock { block_id });
        }
        if let Some(block_id) = walk.cycle {
            warn!(chain = %app_name, block_id = %block_id, "Parent links form a cycle");
            issues.push(ChainIssue::BrokenLink { block_id });
        }
        let complete = issues.is_empty();
        let blocks = walk.blocks;

        if complete {
            let genesis_ok = match blocks.first() {
                Some(first) => {
                    first.parent_id.is_none() && chain.genesis_block_id == Some(first.id())
                },
                None => chain.genesis_block_id.is_none(),
            };
            if !genesis_ok {
                issues.push(ChainIssue::InvalidGenesis {
                    recorded: chain.genesis_block_id,
                });
            }
            let walked = u64::try_from(blocks.len()).unwrap_or(u64::MAX);
            if walked != chain.block_count {
                issues.push(ChainIssue::LengthMismatch {
                    recorded: chain.block_count,
                    walked,
                });
            }
        }

        let mut blocks_verified: usize = 0;
        let mut operations_verified: usize = 0;
        let mut last_sequence: Option<u64> = None;
        let mut previous: Option<&Block> = None;

        for (index, block) in blocks.iter().enumerate() {
            let block_id = block.id();

            let (Some(header), Some(stored_hash), Some(minted_at)) =
                (&block.header, block.content_hash, block.minted_at)
            else {
                issues.push(ChainIssue::UnsealedBlock { block_id });
                previous = Some(block);
                continue;
            };

            let expected_height = u64::try_from(index).unwrap_or(u64::MAX);
            if complete && block.height != expected_height {
                issues.push(ChainIssue::HeightMismatch {
                    block_id,
                    expected: expected_height,
                    actual: block.height,
                });
            }

            if let Some(reason) = header_mismatch(&chain, block, header, minted_at) {
                issues.push(ChainIssue::HeaderMismatch { block_id, reason });
            }

            let computed = block.recompute_hash()?;
            if computed != stored_hash {
                error!(chain = %app_name, block_id = %block_id, "Content hash mismatch");
                issues.push(ChainIssue::HashMismatch {
                    block_id,
                    stored: stored_hash,
                    computed,
                });
            }

            if let Some(prev_minted) = previous.and_then(|p| p.minted_at)
                && minted_at < prev_minted
            {
                issues.push(ChainIssue::OutOfOrder { block_id });
            }

            for record in &block.data {
                let mismatch = match self.operations.get(&record.id)? {
                    None => Some("operation missing from storage".to_string()),
                    Some(stored) if stored.block_id != Some(block_id) => {
                        Some(format!("stored block is {:?}", stored.block_id))
                    },
                    Some(stored) if stored.recorded_at != Some(minted_at) => {
                        Some("recorded_at differs from block mint time".to_string())
                    },
                    Some(stored) if stored.record() != *record => {
                        Some("stored content differs from block data".to_string())
                    },
                    Some(_) => None,
                };
                let mismatch = mismatch.or_else(|| {
                    last_sequence
                        .is_some_and(|last| record.sequence <= last)
                        .then(|| "sequence does not increase along the chain".to_string())
                });
                last_sequence = Some(record.sequence);

                if let Some(reason) = mismatch {
                    warn!(
                        chain = %app_name,
                        block_id = %block_id,
                        operation_id = %record.id,
                        reason = %reason,
                        "Operation mismatch"
                    );
                    issues.push(ChainIssue::OperationMismatch {
                        block_id,
                        operation_id: record.id,
                        reason,
                    });
                }
                operations_verified = operations_verified.saturating_add(1);
            }

            blocks_verified = blocks_verified.saturating_add(1);
            previous = Some(block);
        }

        Ok(ChainVerificationResult {
            valid: issues.is_empty(),
            blocks_verified,
            operations_verified,
            issues,
        })
    }

    /// Verify every chain.
    ///
    /// # Errors
    ///
    /// Returns an error if chains cannot be listed or verified.
    pub fn verify_all(&self) -> LedgerResult<Vec<(String, ChainVerificationResult)>> {
        let mut results = Vec::new();
        for chain in self.storage.list_chains()? {
            let result = self.verify_chain(&chain.app_name)?;
            results.push((chain.app_name, result));
        }
        Ok(results)
    }

    fn mint_lock(&self, app_name: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.mint_locks
                .entry(app_name.to_string())
                .or_default()
                .value(),
        )
    }

    /// The stored chain, or a fresh one that the genesis commit persists.
    fn get_or_create_chain(&self, app_name: &str) -> LedgerResult<Chain> {
        if let Some(chain) = self.storage.get_chain(app_name)? {
            return Ok(chain);
        }
        let chain = Chain::new(app_name)?;
        info!(chain = %app_name, chain_id = %chain.id(), "Starting chain");
        Ok(chain)
    }

    /// Follow parent links from the head back to genesis.
    fn walk_back(&self, chain: &Chain) -> LedgerResult<Walk> {
        let mut walk = Walk::default();
        let mut seen = HashSet::new();
        let mut cursor = chain.head_block_id;

        while let Some(id) = cursor {
            if !seen.insert(id) {
                walk.cycle = Some(id);
                break;
            }
            let Some(block) = self.storage.get_block(&id)? else {
                walk.missing = Some(id);
                break;
            };
            cursor = block.parent_id;
            walk.blocks.push(block);
        }

        walk.blocks.reverse();
        Ok(walk)
    }
}

#[derive(Default)]
struct Walk {
    blocks: Vec<Block>,
    missing: Option<BlockId>,
    cycle: Option<BlockId>,
}

fn header_mismatch(
    chain: &Chain,
    block: &Block,
    header: &crate::block::BlockHeader,
    minted_at: Timestamp,
) -> Option<String> {
    if block.chain_id != chain.id() || block.app_name != chain.app_name {
        return Some(format!("block belongs to {}", block.chain_id));
    }
    if header.app_name != chain.app_name {
        return Some(format!("header names namespace {}", header.app_name));
    }
    if header.height != block.height || header.parent_id != block.parent_id {
        return Some("header position differs from block links".into());
    }
    if usize::try_from(header.operation_count).ok() != Some(block.data.len()) {
        return Some(format!(
            "header counts {} operations, data holds {}",
            header.operation_count,
            block.data.len()
        ));
    }
    if header.sealed_at != minted_at {
        return Some("header seal time differs from mint time".into());
    }
    None
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("namespaces_minting", &self.mint_locks.len())
            .finish_non_exhaustive()
    }
}

/// Result of chain verification.
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// Whether the chain is valid.
    pub valid: bool,
    /// Number of sealed blocks checked.
    pub blocks_verified: usize,
    /// Number of recorded operations checked.
    pub operations_verified: usize,
    /// Issues found (empty if valid).
    pub issues: Vec<ChainIssue>,
}

/// An issue found during chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIssue {
    /// The chain's genesis pointer disagrees with the first block.
    InvalidGenesis {
        /// Genesis recorded on the chain.
        recorded: Option<BlockId>,
    },
    /// The chain's block count disagrees with the walked length.
    LengthMismatch {
        /// Count recorded on the chain.
        recorded: u64,
        /// Blocks reachable from the head.
        walked: u64,
    },
    /// A block referenced by a parent link does not exist.
    MissingBlock {
        /// The missing block.
        block_id: BlockId,
    },
    /// Parent links loop back on themselves.
    BrokenLink {
        /// The block seen twice.
        block_id: BlockId,
    },
    /// A chained block was never sealed.
    UnsealedBlock {
        /// The unsealed block.
        block_id: BlockId,
    },
    /// A block sits at the wrong height.
    HeightMismatch {
        /// The block.
        block_id: BlockId,
        /// Height implied by its position.
        expected: u64,
        /// Height stored on the block.
        actual: u64,
    },
    /// Header fields disagree with the block.
    HeaderMismatch {
        /// The block.
        block_id: BlockId,
        /// What differs.
        reason: String,
    },
    /// Stored content hash does not match the content.
    HashMismatch {
        /// The block.
        block_id: BlockId,
        /// Hash stored on the block.
        stored: ContentId,
        /// Hash recomputed from its content.
        computed: ContentId,
    },
    /// A block was minted before its parent.
    OutOfOrder {
        /// The block.
        block_id: BlockId,
    },
    /// A recorded operation disagrees with its block.
    OperationMismatch {
        /// The recording block.
        block_id: BlockId,
        /// The operation.
        operation_id: chainlog_core::OperationId,
        /// What differs.
        reason: String,
    },
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGenesis { recorded } => {
                write!(f, "Invalid genesis (recorded {recorded:?})")
            },
            Self::LengthMismatch { recorded, walked } => {
                write!(f, "Chain records {recorded} blocks, {walked} reachable")
            },
            Self::MissingBlock { block_id } => write!(f, "Missing block {block_id}"),
            Self::BrokenLink { block_id } => write!(f, "Broken chain link at {block_id}"),
            Self::UnsealedBlock { block_id } => write!(f, "Unsealed block {block_id}"),
            Self::HeightMismatch {
                block_id,
                expected,
                actual,
            } => write!(
                f,
                "Height mismatch at {block_id}: expected {expected}, found {actual}"
            ),
            Self::HeaderMismatch { block_id, reason } => {
                write!(f, "Header mismatch at {block_id}: {reason}")
            },
            Self::HashMismatch {
                block_id,
                stored,
                computed,
            } => write!(
                f,
                "Hash mismatch at {block_id}: stored {stored}, computed {computed}"
            ),
            Self::OutOfOrder { block_id } => {
                write!(f, "Block {block_id} minted before its parent")
            },
            Self::OperationMismatch {
                block_id,
                operation_id,
                reason,
            } => write!(f, "Operation {operation_id} in {block_id}: {reason}"),
        }
    }
}
