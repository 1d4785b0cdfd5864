use serde_json::json;
use tablestore::prelude::*;

fn rows() -> Vec<Row> {
    rows_from(vec![json!({"id": 1}), json!({"id": 2})])
}

fn current_changes(events: &EventQueue) -> Vec<(Option<Row>, Option<Row>)> {
    events
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            TableEvent::CurrentChange { current, previous } => Some((current, previous)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_same_row_fires_nothing() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.commit(Mutation::set_data(rows())).unwrap();
    let row = store.data()[0].clone();

    store
        .commit(Mutation::SetCurrentRow {
            row: Some(row.clone()),
        })
        .unwrap();
    assert_eq!(current_changes(&events).len(), 1);

    store
        .commit(Mutation::SetCurrentRow {
            row: Some(row.clone()),
        })
        .unwrap();
    assert!(current_changes(&events).is_empty());

    store.commit(Mutation::SetCurrentRow { row: None }).unwrap();
    let changes = current_changes(&events);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].0.is_none());
    assert!(changes[0].1.as_ref().is_some_and(|r| r.ptr_eq(&row)));

    store.commit(Mutation::SetCurrentRow { row: None }).unwrap();
    assert!(current_changes(&events).is_empty());
}

#[test]
fn test_key_before_data_resolves_once() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new().row_key("id"), events.clone());

    store
        .commit(Mutation::SetCurrentRowKey {
            key: RowKey::from(2),
        })
        .unwrap();
    assert!(store.current_row().is_none());
    assert!(current_changes(&events).is_empty());

    let data = rows();
    store.commit(Mutation::set_data(data.clone())).unwrap();
    assert!(store.current_row().is_some_and(|r| r.ptr_eq(&data[1])));
    assert_eq!(current_changes(&events).len(), 1);

    // Same keys, new handles: the current row follows by key silently.
    store.commit(Mutation::set_data(rows())).unwrap();
    assert_eq!(store.current_row().map(|r| r["id"].clone()), Some(json!(2)));
    assert!(current_changes(&events).is_empty());

    store
        .commit(Mutation::SetCurrentRow { row: None })
        .unwrap();
    store.commit(Mutation::set_data(rows())).unwrap();
    assert!(store.current_row().is_none());
}

#[test]
fn test_current_row_cleared_when_removed() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new().row_key("id"), events.clone());
    store.commit(Mutation::set_data(rows())).unwrap();
    let row = store.data()[0].clone();
    store
        .commit(Mutation::SetCurrentRow { row: Some(row) })
        .unwrap();
    events.drain();

    store
        .commit(Mutation::set_data(rows_from(vec![json!({"id": 2})])))
        .unwrap();
    assert!(store.current_row().is_none());
    assert_eq!(current_changes(&events).len(), 1);
}

#[test]
fn test_current_row_without_key_cleared_on_new_handles() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.commit(Mutation::set_data(rows())).unwrap();
    let row = store.data()[0].clone();
    store
        .commit(Mutation::SetCurrentRow { row: Some(row) })
        .unwrap();
    events.drain();

    store.commit(Mutation::set_data(rows())).unwrap();
    assert!(store.current_row().is_none());
    assert_eq!(current_changes(&events).len(), 1);
}

#[test]
fn test_current_row_key_requires_row_key() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    let err = store
        .commit(Mutation::SetCurrentRowKey {
            key: RowKey::from(1),
        })
        .unwrap_err();
    assert!(matches!(err, TableError::MissingRowKey(_)));
}

#[test]
fn test_hover_row() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new(), events.clone());
    store.commit(Mutation::set_data(rows())).unwrap();
    let row = store.data()[1].clone();

    store
        .commit(Mutation::SetHoverRow {
            row: Some(row.clone()),
        })
        .unwrap();
    assert!(store.hover_row().is_some_and(|r| r.ptr_eq(&row)));

    store.commit(Mutation::SetHoverRow { row: None }).unwrap();
    assert!(store.hover_row().is_none());
}
