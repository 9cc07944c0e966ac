//! End-to-end mint flow: capture, mint, chain bookkeeping and immutability.

mod common;

use chainlog_core::{NodeId, Timestamp};
use chainlog_ledger::{Action, Block, Ledger, LedgerError, ScalarValue};

use common::order;

#[test]
fn order_insert_then_update_mints_one_block() {
    let ledger = Ledger::in_memory();
    let target = NodeId::from_u128(1);

    let insert = order(&ledger, Action::Insert, target, 9.99);
    let update = order(&ledger, Action::Update, target, 19.99);

    let block = ledger.mine("shop").unwrap();
    let header = block.header.as_ref().unwrap();
    assert_eq!(header.operation_count, 2);
    assert_eq!(header.height, 0);
    assert_eq!(header.parent_id, None);
    assert_eq!(block.data[0].id, insert.id());
    assert_eq!(block.data[1].id, update.id());
    assert_eq!(
        block.data[1].values.get("total"),
        Some(&ScalarValue::Float(19.99))
    );

    for op in [&insert, &update] {
        let stored = ledger.operations().get(&op.id()).unwrap().unwrap();
        assert_eq!(stored.block_id, Some(block.id()));
        assert!(stored.is_recorded());
    }

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    assert_eq!(chain.head_block_id, Some(block.id()));
    assert_eq!(chain.genesis_block_id, Some(block.id()));
    assert_eq!(chain.block_count, 1);
    assert_eq!(ledger.operations().count_pending("shop").unwrap(), 0);
    assert!(ledger.verify_chain("shop").unwrap().valid);
}

#[test]
fn mint_records_every_pending_operation_in_creation_order() {
    let ledger = Ledger::in_memory();
    let ops: Vec<_> = (0..25)
        .map(|i| order(&ledger, Action::Upsert, NodeId::new(), f64::from(i)))
        .collect();

    let block = ledger.mine("shop").unwrap();
    let recorded: Vec<_> = block.data.iter().map(|r| r.id).collect();
    let expected: Vec<_> = ops.iter().map(chainlog_ledger::Operation::id).collect();
    assert_eq!(recorded, expected);

    let stamps: Vec<Option<Timestamp>> = ops
        .iter()
        .map(|op| ledger.operations().get(&op.id()).unwrap().unwrap().recorded_at)
        .collect();
    assert!(stamps.iter().all(|s| *s == block.minted_at));
    assert!(block.minted_at.is_some());
}

#[test]
fn empty_mint_still_advances_the_chain() {
    let ledger = Ledger::in_memory();

    let block = ledger.mine("shop").unwrap();
    assert!(block.is_sealed());
    assert!(block.data.is_empty());
    assert_eq!(block.header.as_ref().unwrap().operation_count, 0);
    assert!(block.verify_content_hash().unwrap());

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    assert_eq!(chain.head_block_id, Some(block.id()));
}

#[test]
fn second_mint_links_to_the_first() {
    let ledger = Ledger::in_memory();
    order(&ledger, Action::Insert, NodeId::new(), 1.0);
    let first = ledger.mine("shop").unwrap();
    order(&ledger, Action::Insert, NodeId::new(), 2.0);
    let second = ledger.mine("shop").unwrap();

    assert_eq!(second.parent_id, Some(first.id()));
    assert_eq!(second.height, 1);
    assert!(second.minted_at >= first.minted_at);
    assert_ne!(second.content_hash, first.content_hash);

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    assert_eq!(chain.genesis_block_id, Some(first.id()));
    assert_eq!(chain.head_block_id, Some(second.id()));

    let walked: Vec<_> = ledger.blocks("shop").unwrap().iter().map(Block::id).collect();
    assert_eq!(walked, vec![first.id(), second.id()]);
}

#[test]
fn namespaces_mint_independently() {
    let ledger = Ledger::in_memory();
    order(&ledger, Action::Insert, NodeId::new(), 1.0);
    ledger
        .operations()
        .append_new(chainlog_ledger::NewOperation::new(
            "billing",
            "billing:invoice",
            Action::Insert,
            NodeId::new(),
        ))
        .unwrap();

    let shop = ledger.mine("shop").unwrap();
    assert_eq!(shop.data.len(), 1);
    assert_eq!(ledger.operations().count_pending("billing").unwrap(), 1);

    let billing = ledger.mine("billing").unwrap();
    assert_ne!(billing.chain_id, shop.chain_id);
    assert_eq!(billing.parent_id, None);
    assert_eq!(ledger.list_chains().unwrap().len(), 2);
}

#[test]
fn sealed_block_refuses_new_operations() {
    let ledger = Ledger::in_memory();
    ledger.mine("shop").unwrap();
    let pending = order(&ledger, Action::Insert, NodeId::new(), 5.0);

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    let head = ledger
        .get_block(&chain.head_block_id.unwrap())
        .unwrap()
        .unwrap();
    let mut draft = Block::create(&chain, Some(&head)).unwrap();
    draft.seal(Timestamp::now()).unwrap();
    let before = draft.clone();

    let err = draft.record_operation(pending.clone()).unwrap_err();
    assert!(matches!(err, LedgerError::Immutable { .. }));
    assert_eq!(draft, before);

    let stored = ledger.operations().get(&pending.id()).unwrap().unwrap();
    assert_eq!(stored, pending);
    assert!(!stored.is_recorded());
}

#[test]
fn nothing_can_be_deleted() {
    let ledger = Ledger::in_memory();
    let op = order(&ledger, Action::Insert, NodeId::new(), 3.0);
    let block = ledger.mine("shop").unwrap();

    assert!(matches!(block.delete(), Err(LedgerError::Immutable { .. })));
    assert!(matches!(
        ledger.operations().delete(&op.id()),
        Err(LedgerError::Immutable { .. })
    ));

    assert!(ledger.get_block(&block.id()).unwrap().is_some());
    assert!(ledger.operations().get(&op.id()).unwrap().is_some());
}

#[test]
fn recorded_operations_cannot_be_edited() {
    let ledger = Ledger::in_memory();
    let op = order(&ledger, Action::Insert, NodeId::new(), 3.0);
    ledger.mine("shop").unwrap();

    let mut stored = ledger.operations().get(&op.id()).unwrap().unwrap();
    stored
        .values
        .insert("total".into(), ScalarValue::Integer(0));
    assert!(matches!(
        ledger.operations().save(&stored),
        Err(LedgerError::Immutable { .. })
    ));
}

#[test]
fn concurrent_mints_on_one_chain_stay_linear() {
    let ledger = std::sync::Arc::new(Ledger::in_memory());
    for i in 0..20 {
        order(&ledger, Action::Insert, NodeId::new(), f64::from(i));
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ledger = std::sync::Arc::clone(&ledger);
            std::thread::spawn(move || ledger.mine("shop").unwrap())
        })
        .collect();
    let minted: Vec<Block> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let total: usize = minted.iter().map(|b| b.data.len()).sum();
    assert_eq!(total, 20);

    let chain = ledger.get_chain("shop").unwrap().unwrap();
    assert_eq!(chain.block_count, 4);
    let heights: Vec<_> = ledger.blocks("shop").unwrap().iter().map(|b| b.height).collect();
    assert_eq!(heights, vec![0, 1, 2, 3]);
    assert!(ledger.verify_chain("shop").unwrap().valid);
}

#[tokio::test(flavor = "multi_thread")]
async fn ledger_works_inside_an_async_runtime() {
    let ledger = Ledger::in_memory();
    order(&ledger, Action::Insert, NodeId::new(), 1.5);
    let block = ledger.mine("shop").unwrap();
    assert_eq!(block.data.len(), 1);
    assert!(ledger.verify_all().unwrap().iter().all(|(_, r)| r.valid));
}
