//! Host records flowing through the change-capture hook into blocks.

mod common;

use chainlog_ledger::{Action, Ledger, ScalarValue};

use common::ShopOrder;

#[test]
fn saves_and_deletes_map_to_actions() {
    let ledger = Ledger::in_memory();
    let capture = ledger.capture();
    let mut order = ShopOrder::new(999, "alice");

    capture.on_saved(&order, Some(true)).unwrap();
    order.total_cents = 1999;
    capture.on_saved(&order, Some(false)).unwrap();
    capture.on_saved(&order, None).unwrap();
    capture.on_deleted(&order).unwrap();

    let actions: Vec<_> = ledger
        .operations()
        .pending_for("shop")
        .unwrap()
        .iter()
        .map(|op| op.action)
        .collect();
    assert_eq!(
        actions,
        vec![Action::Insert, Action::Update, Action::Upsert, Action::Delete]
    );
}

#[test]
fn only_scalar_fields_are_captured() {
    let ledger = Ledger::in_memory();
    let order = ShopOrder::new(500, "bob");
    let op = ledger.capture().on_saved(&order, Some(true)).unwrap();

    let fields: Vec<_> = op.values.keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["customer", "total_cents"]);
    assert_eq!(op.values.get("total_cents"), Some(&ScalarValue::Integer(500)));
    assert_eq!(op.model, "shop:order");
    assert_eq!(op.target_node_id, order.id);
}

#[test]
fn captured_lifecycle_mints_and_verifies() {
    let ledger = Ledger::in_memory();
    let capture = ledger.capture();
    let mut first = ShopOrder::new(100, "carol");
    let second = ShopOrder::new(250, "dave");

    capture.on_saved(&first, Some(true)).unwrap();
    capture.on_saved(&second, Some(true)).unwrap();
    let opening = ledger.mine("shop").unwrap();
    assert_eq!(opening.data.len(), 2);

    first.paid = true;
    first.total_cents = 90;
    capture.on_saved(&first, Some(false)).unwrap();
    capture.on_deleted(&second).unwrap();
    let closing = ledger.mine("shop").unwrap();

    assert_eq!(closing.parent_id, Some(opening.id()));
    assert_eq!(closing.data[0].action, Action::Update);
    assert_eq!(
        closing.data[0].values.get("total_cents"),
        Some(&ScalarValue::Integer(90))
    );
    assert_eq!(closing.data[1].action, Action::Delete);
    assert!(closing.data[1].values.is_empty());

    let result = ledger.verify_chain("shop").unwrap();
    assert!(result.valid, "{:?}", result.issues);
    assert_eq!(result.operations_verified, 4);
}

#[test]
fn capture_clones_share_one_log() {
    let ledger = Ledger::in_memory();
    let capture = ledger.capture();
    let other = capture.clone();

    let a = capture.on_saved(&ShopOrder::new(1, "x"), Some(true)).unwrap();
    let b = other.on_saved(&ShopOrder::new(2, "y"), Some(true)).unwrap();
    assert!(b.sequence > a.sequence);
    assert_eq!(ledger.operations().count_pending("shop").unwrap(), 2);
}
