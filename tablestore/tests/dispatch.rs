use serde_json::{Value, json};
use tablestore::prelude::*;

fn store() -> (TableStore, EventQueue) {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new().row_key("id"), events.clone());
    store.set_ready(true);
    store
        .commit_named(
            "insertColumn",
            json!({"column": {"id": "age", "property": "age", "sortable": true}}),
        )
        .unwrap();
    store
        .commit_named(
            "setData",
            json!({"rows": [{"id": 1, "age": 30}, {"id": 2, "age": 20}, {"id": 3, "age": 25}]}),
        )
        .unwrap();
    events.drain();
    (store, events)
}

fn ages(store: &TableStore) -> Vec<i64> {
    store.data().iter().filter_map(|r| r["age"].as_i64()).collect()
}

#[test]
fn test_unknown_mutation_has_no_effect() {
    let (mut store, events) = store();
    let layouts = events.layouts();
    let refreshes = events.scroll_refreshes();

    let err = store
        .commit_named("dropTable", json!({"rows": []}))
        .unwrap_err();
    assert!(matches!(&err, TableError::UnknownCommand(name) if name == "dropTable"));
    assert_eq!(err.to_string(), "unknown mutation 'dropTable'");
    assert_eq!(store.data().len(), 3);
    assert!(events.drain().is_empty());
    assert_eq!(events.layouts(), layouts);
    assert_eq!(events.scroll_refreshes(), refreshes);
}

#[test]
fn test_named_sort_and_selection() {
    let (mut store, events) = store();
    store
        .commit_named("sort", json!({"prop": "age", "order": "ascending"}))
        .unwrap();
    assert_eq!(ages(&store), vec![20, 25, 30]);

    store
        .commit_named("rowSelectedChanged", json!({"row": {"id": 3}}))
        .unwrap();
    let selected = store.data()[1].clone();
    assert!(store.is_selected(&selected).unwrap());

    store.commit_named("toggleAllSelection", Value::Null).unwrap();
    assert!(store.is_all_selected());
    assert_eq!(
        events.names(),
        vec![
            "sort-change",
            "select",
            "selection-change",
            "selection-change",
            "select-all"
        ]
    );
}

#[test]
fn test_named_change_sort_condition_after_update_sort() {
    let (mut store, events) = store();
    store
        .commit_named(
            "updateSort",
            json!({"column": "age", "prop": "age", "order": "descending"}),
        )
        .unwrap();
    assert_eq!(ages(&store), vec![30, 20, 25]);

    store
        .commit_named("changeSortCondition", Value::Null)
        .unwrap();
    assert_eq!(ages(&store), vec![30, 25, 20]);
    assert_eq!(events.names(), vec!["sort-change"]);
}

#[test]
fn test_named_current_and_hover_rows() {
    let (mut store, events) = store();
    store
        .commit_named("setCurrentRow", json!({"row": {"id": 2}}))
        .unwrap();
    assert_eq!(store.current_row().map(|r| r["id"].clone()), Some(json!(2)));

    store
        .commit_named("setHoverRow", json!({"row": {"id": 1}}))
        .unwrap();
    assert!(store.hover_row().is_some());
    store.commit_named("setHoverRow", Value::Null).unwrap();
    assert!(store.hover_row().is_none());
    assert_eq!(events.names(), vec!["current-change"]);
}

#[test]
fn test_named_filter_change_and_remove_column() {
    let (mut store, events) = store();
    store
        .commit_named(
            "filterChange",
            json!({"columns": ["age"], "values": [30], "silent": false}),
        )
        .unwrap();
    assert_eq!(events.names(), vec!["filter-change"]);

    store
        .commit_named("removeColumn", json!({"column": "age"}))
        .unwrap();
    assert!(store.columns().columns().is_empty());
    assert_eq!(events.layouts(), 2);
}

#[test]
fn test_invalid_arguments() {
    let (mut store, events) = store();

    let err = store.commit_named("sort", json!([1, 2])).unwrap_err();
    assert!(matches!(err, TableError::InvalidArguments { ref name, .. } if name == "sort"));

    let err = store
        .commit_named("sort", json!({"prop": "age", "order": "sideways"}))
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidArguments { .. }));

    let err = store.commit_named("setData", Value::Null).unwrap_err();
    assert!(matches!(err, TableError::InvalidArguments { .. }));

    let err = store.commit_named("applyLoad", Value::Null).unwrap_err();
    assert!(matches!(err, TableError::InvalidArguments { .. }));

    assert_eq!(ages(&store), vec![30, 20, 25]);
    assert!(events.drain().is_empty());
}

#[test]
fn test_mutation_names_round_trip() {
    for name in ["setData", "sort", "filterChange", "toggleAllSelection", "setCurrentRow"] {
        let parsed: MutationName = name.parse().unwrap();
        assert_eq!(parsed.as_str(), name);
    }
    assert_eq!(
        Mutation::set_data(Vec::new()).name(),
        MutationName::SetData
    );
}

#[test]
fn test_failed_set_data_is_not_half_applied() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new().row_key("meta.id"), events.clone());
    store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"meta": {"id": 1}}),
            json!({"meta": {"id": 2}}),
        ])))
        .unwrap();
    let row = store.data()[0].clone();
    store
        .commit(Mutation::SetCurrentRow { row: Some(row) })
        .unwrap();
    events.drain();
    let refreshes = events.scroll_refreshes();

    let err = store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"meta": {"id": 3}}),
            json!({"meta": null}),
        ])))
        .unwrap_err();
    assert!(matches!(err, TableError::KeyPath { ref segment, .. } if segment == "meta"));
    assert_eq!(store.data().len(), 2);
    assert!(store.current_row().is_some());
    assert!(events.drain().is_empty());
    assert_eq!(events.scroll_refreshes(), refreshes);
}

#[test]
fn test_unkeyable_nested_rows_leave_state_untouched() {
    let events = EventQueue::new();
    let mut store = TableStore::new(TableOptions::new().row_key("meta.id"), events.clone());
    store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"meta": {"id": 1}}),
            json!({"meta": {"id": 2}}),
        ])))
        .unwrap();
    let row = store.data()[0].clone();
    store
        .commit(Mutation::ToggleRowSelection {
            row,
            selected: Some(true),
            emit_select: false,
        })
        .unwrap();
    events.drain();

    let err = store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"meta": {"id": 3}, "children": [{"x": 1}]}),
        ])))
        .unwrap_err();
    assert!(matches!(err, TableError::KeyPath { ref segment, .. } if segment == "meta"));
    assert_eq!(store.data().len(), 2);
    assert_eq!(store.raw_data().len(), 2);
    assert_eq!(store.data()[0]["meta"]["id"], json!(1));
    assert_eq!(store.selection().len(), 1);
    assert!(store.selection()[0].ptr_eq(&store.data()[0]));
    assert!(store.tree().nodes().is_empty());
    assert!(events.drain().is_empty());

    store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"meta": {"id": 3}, "children": [{"meta": {"id": 4}}]}),
        ])))
        .unwrap();
    assert_eq!(
        store.tree().node(&RowKey::from(3)).unwrap().children,
        vec![RowKey::from(4)]
    );
}

#[test]
fn test_set_data_schedules_one_scroll_refresh() {
    let (mut store, events) = store();
    let before = events.scroll_refreshes();
    store
        .commit(Mutation::refresh_data(store.raw_data().to_vec()))
        .unwrap();
    assert_eq!(events.scroll_refreshes(), before + 1);
    assert!(events.drain().is_empty());
}

#[test]
fn test_key_extractor() {
    let events = EventQueue::new();
    let options = TableOptions::new().row_key(RowKeySource::extractor(|value| {
        RowKey::from(format!("{}-{}", value["kind"], value["n"]))
    }));
    let mut store = TableStore::new(options, events.clone());
    store
        .commit(Mutation::set_data(rows_from(vec![
            json!({"kind": "a", "n": 1}),
            json!({"kind": "b", "n": 1}),
        ])))
        .unwrap();
    store
        .commit(Mutation::SetCurrentRowKey {
            key: RowKey::from("\"b\"-1"),
        })
        .unwrap();
    assert_eq!(
        store.current_row().map(|r| r["kind"].clone()),
        Some(json!("b"))
    );
}
