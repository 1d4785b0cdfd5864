use serde_json::json;
use tablestore::prelude::*;

fn ids(columns: Vec<&Column>) -> Vec<&str> {
    columns.into_iter().map(|c| c.id.as_str()).collect()
}

fn insert(store: &mut TableStore, column: Column) {
    store
        .commit(Mutation::InsertColumn {
            column,
            index: None,
            parent: None,
        })
        .unwrap();
}

#[test]
fn test_leaf_order_follows_partitions() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    insert(&mut store, Column::new("A").fixed(Fixed::Left));
    insert(
        &mut store,
        Column::group("B", vec![Column::new("C"), Column::new("D")]),
    );
    insert(&mut store, Column::new("E").fixed(Fixed::Right));
    assert_eq!(events.layouts(), 0);

    store.commit(Mutation::UpdateColumns).unwrap();
    assert_eq!(events.layouts(), 1);

    let columns = store.columns();
    assert_eq!(ids(columns.columns()), vec!["A", "C", "D", "E"]);
    assert_eq!(ids(columns.origin_columns()), vec!["A", "B", "E"]);
    assert_eq!(columns.fixed_leaf_columns_len(), 1);
    assert_eq!(columns.leaf_columns_len(), 2);
    assert_eq!(columns.right_fixed_leaf_columns_len(), 1);
    assert!(columns.is_complex());
}

#[test]
fn test_ready_store_recomputes_on_every_change() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.set_ready(true);

    insert(&mut store, Column::new("name"));
    insert(&mut store, Column::new("age"));
    assert_eq!(events.layouts(), 2);
    assert_eq!(ids(store.columns().columns()), vec!["name", "age"]);

    store
        .commit(Mutation::InsertColumn {
            column: Column::new("first"),
            index: Some(0),
            parent: None,
        })
        .unwrap();
    assert_eq!(ids(store.columns().columns()), vec!["first", "name", "age"]);

    store
        .commit(Mutation::RemoveColumn {
            column: "name".into(),
            parent: None,
        })
        .unwrap();
    assert_eq!(ids(store.columns().columns()), vec!["first", "age"]);
    assert!(!store.columns().is_complex());
}

#[test]
fn test_nested_insert_creates_children() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events);
    store.set_ready(true);
    insert(&mut store, Column::new("group"));

    store
        .commit(Mutation::InsertColumn {
            column: Column::new("leaf"),
            index: None,
            parent: Some("group".into()),
        })
        .unwrap();
    assert_eq!(ids(store.columns().columns()), vec!["leaf"]);
    assert_eq!(ids(store.columns().origin_columns()), vec!["group"]);
}

#[test]
fn test_selection_column_follows_left_pin() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events);
    insert(&mut store, Column::selection("check"));
    insert(&mut store, Column::new("name").fixed(Fixed::Left));
    insert(&mut store, Column::new("age"));
    store.commit(Mutation::UpdateColumns).unwrap();
    store.commit(Mutation::UpdateColumns).unwrap();

    assert_eq!(ids(store.columns().fixed_columns()), vec!["check", "name"]);
    assert_eq!(store.columns().fixed_leaf_columns_len(), 2);
}

#[test]
fn test_unknown_parent_fails_without_layout() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.set_ready(true);

    let err = store
        .commit(Mutation::InsertColumn {
            column: Column::new("leaf"),
            index: None,
            parent: Some("missing".into()),
        })
        .unwrap_err();
    assert!(matches!(err, TableError::UnknownColumn(id) if id == "missing"));
    assert_eq!(events.layouts(), 0);
}

#[test]
fn test_columns_deserialize_from_json() {
    let column: Column = serde_json::from_value(json!({
        "id": "ops",
        "type": "selection",
        "fixed": true,
        "sortable": "custom",
        "columnKey": "operations",
        "reserveSelection": true,
    }))
    .unwrap();
    assert_eq!(column.kind, ColumnKind::Selection);
    assert_eq!(column.fixed, Fixed::Left);
    assert_eq!(column.sortable, Sortable::Custom);
    assert_eq!(column.filter_key(), "operations");
    assert!(column.reserve_selection);
}

#[test]
fn test_failed_nested_remove_leaves_columns_intact() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.set_ready(true);
    insert(&mut store, Column::new("a"));
    insert(&mut store, Column::new("b"));
    let layouts = events.layouts();

    let err = store
        .commit(Mutation::RemoveColumn {
            column: "zzz".into(),
            parent: Some("a".into()),
        })
        .unwrap_err();
    assert!(matches!(err, TableError::UnknownColumn(id) if id == "zzz"));
    assert_eq!(events.layouts(), layouts);

    store.commit(Mutation::UpdateColumns).unwrap();
    assert_eq!(ids(store.columns().columns()), vec!["a", "b"]);
}
