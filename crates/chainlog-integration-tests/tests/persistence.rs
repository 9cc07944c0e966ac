//! Ledger state surviving a restart, on both backends.
//!
//! `SurrealKV` holds an OS-level lock on its directory, so a path is opened
//! once per test. Restart behavior is exercised over a shared in-memory store.

mod common;

use chainlog_config::{BACKEND_SURREALKV, Config};
use chainlog_core::NodeId;
use chainlog_ledger::{Action, Ledger};

use common::{SharedLedger, order};

#[test]
fn reopened_ledger_continues_the_chain() {
    let shared = SharedLedger::new();
    let target = NodeId::from_u128(1);
    order(&shared.ledger, Action::Insert, target, 9.99);
    let first = shared.ledger.mine("shop").unwrap();
    let pending = order(&shared.ledger, Action::Update, target, 19.99);

    let restarted = shared.reopen();
    assert_eq!(
        restarted.operations().pending_for("shop").unwrap(),
        vec![pending.clone()]
    );

    let next = order(&restarted, Action::Delete, target, 0.0);
    assert!(next.sequence > pending.sequence);

    let second = restarted.mine("shop").unwrap();
    assert_eq!(second.parent_id, Some(first.id()));
    assert_eq!(second.data.len(), 2);
    assert!(restarted.verify_chain("shop").unwrap().valid);
}

#[test]
fn stored_blocks_reload_with_identical_hashes() {
    let shared = SharedLedger::new();
    order(&shared.ledger, Action::Insert, NodeId::new(), 0.300_000_000_000_000_04);
    order(&shared.ledger, Action::Update, NodeId::new(), std::f64::consts::FRAC_1_PI);
    let minted = shared.ledger.mine("shop").unwrap();

    let reloaded = shared.reopen().get_block(&minted.id()).unwrap().unwrap();
    assert_eq!(reloaded.content_hash, minted.content_hash);
    assert!(reloaded.verify_content_hash().unwrap());
    assert_eq!(reloaded.data, minted.data);
}

#[test]
fn surrealkv_backed_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger")).unwrap();

    let target = NodeId::from_u128(1);
    order(&ledger, Action::Insert, target, 9.99);
    order(&ledger, Action::Update, target, 19.99);
    let genesis = ledger.mine("shop").unwrap();
    order(&ledger, Action::Delete, target, 0.0);
    let head = ledger.mine("shop").unwrap();

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    assert_eq!(chain.genesis_block_id, Some(genesis.id()));
    assert_eq!(chain.head_block_id, Some(head.id()));
    assert_eq!(ledger.blocks("shop").unwrap().len(), 2);

    let result = ledger.verify_chain("shop").unwrap();
    assert!(result.valid, "{:?}", result.issues);
    assert_eq!(result.operations_verified, 3);
}

#[test]
fn config_selects_a_surrealkv_path_under_home() {
    let home = tempfile::tempdir().unwrap();
    let resolved = Config::load_with_home(None, home.path()).unwrap();
    let storage = &resolved.config.storage;

    assert_eq!(storage.backend, BACKEND_SURREALKV);
    let path = storage.path.as_deref().unwrap();
    assert!(path.starts_with(home.path()));

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let ledger = Ledger::open(path).unwrap();
    assert!(ledger.list_chains().unwrap().is_empty());
}
