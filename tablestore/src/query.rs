//! Filtering and sorting of raw rows into the visible row sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::column::{Column, ColumnId, ColumnRegistry, SortBy, SortMethod, SortOrder, Sortable};
use crate::row::Row;

/// Active filter values per column id. Empty lists mean "no filter".
pub type Filters = BTreeMap<ColumnId, Vec<Value>>;

/// The single active sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub column: Option<ColumnId>,
    pub prop: Option<String>,
    pub order: Option<SortOrder>,
}

impl SortState {
    pub fn is_active(&self) -> bool {
        self.column.is_some()
    }
}

/// Keep rows matching every filtered column.
///
/// Within one column a row passes if any of the filter values accepts it.
/// Columns without a filter method are skipped.
pub fn apply_filters(rows: &[Row], filters: &Filters, columns: &ColumnRegistry) -> Vec<Row> {
    let mut data = rows.to_vec();
    for (id, values) in filters {
        if values.is_empty() {
            continue;
        }
        let Some(column) = columns.leaf_by_id(id) else {
            continue;
        };
        let Some(filter) = &column.filter_method else {
            continue;
        };
        data.retain(|row| values.iter().any(|value| (filter.0)(value, row, column)));
    }
    data
}

/// Order rows by the active sort.
///
/// Rows are left untouched when nothing is sorted or the sorting column
/// delegates sorting to the data source.
pub fn apply_sort(rows: &[Row], sort: &SortState, columns: &ColumnRegistry) -> Vec<Row> {
    let (Some(id), Some(order)) = (&sort.column, sort.order) else {
        return rows.to_vec();
    };
    let Some(column) = columns.column(id) else {
        return rows.to_vec();
    };
    if column.sortable == Sortable::Custom {
        return rows.to_vec();
    }
    order_by(rows, sort.prop.as_deref(), order, column)
}

/// Stable sort by a comparator, a list of sort keys, or a property path.
///
/// Ties keep their original relative order in both directions.
pub fn order_by(rows: &[Row], prop: Option<&str>, order: SortOrder, column: &Column) -> Vec<Row> {
    if prop.is_none() && column.sort_method.is_none() && column.sort_by.is_empty() {
        return rows.to_vec();
    }
    let directed = |ordering: Ordering| match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    };

    if let Some(SortMethod(compare)) = &column.sort_method {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|a, b| directed(compare(a, b)));
        return sorted;
    }

    let mut keyed: Vec<(Vec<Value>, &Row)> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| (sort_keys(row, index, prop, &column.sort_by), row))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| directed(compare_keys(a, b)));
    keyed.into_iter().map(|(_, row)| row.clone()).collect()
}

fn sort_keys(row: &Row, index: usize, prop: Option<&str>, sort_by: &[SortBy]) -> Vec<Value> {
    if !sort_by.is_empty() {
        return sort_by
            .iter()
            .map(|by| match by {
                SortBy::Path(path) => row.get_path(path).cloned().unwrap_or(Value::Null),
                SortBy::Extractor(f) => f(row, index),
            })
            .collect();
    }
    let value = match (row.value(), prop) {
        (Value::Object(_) | Value::Array(_), Some(prop)) => {
            row.get_path(prop).cloned().unwrap_or(Value::Null)
        }
        (value, _) => value.clone(),
    };
    vec![value]
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used by default sorting.
///
/// Values of different types order by type: null, bool, number, string,
/// array, object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_keys(x, y).then(x.len().cmp(&y.len())),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::rows_from;
    use serde_json::json;

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r["name"].as_str().unwrap_or_default().to_string()).collect()
    }

    fn registry(columns: Vec<Column>) -> ColumnRegistry {
        let mut registry = ColumnRegistry::new();
        for column in columns {
            registry.insert(column, None, None).unwrap();
        }
        registry.recompute();
        registry
    }

    #[test]
    fn test_default_sort_is_stable_both_directions() {
        let rows = rows_from(vec![
            json!({"name": "a", "n": 2}),
            json!({"name": "b", "n": 1}),
            json!({"name": "c", "n": 2}),
        ]);
        let columns = registry(vec![Column::new("n").property("n").sortable()]);
        let mut sort = SortState {
            column: Some("n".into()),
            prop: Some("n".into()),
            order: Some(SortOrder::Ascending),
        };
        assert_eq!(names(&apply_sort(&rows, &sort, &columns)), vec!["b", "a", "c"]);

        sort.order = Some(SortOrder::Descending);
        assert_eq!(names(&apply_sort(&rows, &sort, &columns)), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_custom_sortable_does_not_reorder() {
        let rows = rows_from(vec![json!({"name": "b"}), json!({"name": "a"})]);
        let columns = registry(vec![Column::new("name").property("name").custom_sortable()]);
        let sort = SortState {
            column: Some("name".into()),
            prop: Some("name".into()),
            order: Some(SortOrder::Ascending),
        };
        assert_eq!(names(&apply_sort(&rows, &sort, &columns)), vec!["b", "a"]);
    }

    #[test]
    fn test_sort_method_and_sort_by() {
        let rows = rows_from(vec![
            json!({"name": "x", "a": 1, "b": 3}),
            json!({"name": "y", "a": 1, "b": 2}),
            json!({"name": "z", "a": 0, "b": 9}),
        ]);
        let by_keys = Column::new("c")
            .sort_by(SortBy::Path("a".into()))
            .sort_by(SortBy::Path("b".into()));
        let sorted = order_by(&rows, None, SortOrder::Ascending, &by_keys);
        assert_eq!(names(&sorted), vec!["z", "y", "x"]);

        let by_method = Column::new("c").sort_method(|a, b| {
            compare_values(&b["b"], &a["b"])
        });
        let sorted = order_by(&rows, None, SortOrder::Ascending, &by_method);
        assert_eq!(names(&sorted), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_filters_conjunctive_across_columns() {
        let rows = rows_from(vec![
            json!({"name": "a", "tag": "x", "n": 1}),
            json!({"name": "b", "tag": "y", "n": 2}),
            json!({"name": "c", "tag": "x", "n": 3}),
        ]);
        let columns = registry(vec![
            Column::new("tag").filter_method(|v, row, _| &row["tag"] == v),
            Column::new("n").filter_method(|v, row, _| row["n"].as_i64() >= v.as_i64()),
            Column::new("plain"),
        ]);
        let mut filters = Filters::new();
        filters.insert("tag".into(), vec![json!("x"), json!("y")]);
        assert_eq!(names(&apply_filters(&rows, &filters, &columns)).len(), 3);

        filters.insert("n".into(), vec![json!(2)]);
        filters.insert("plain".into(), vec![json!("ignored")]);
        assert_eq!(names(&apply_filters(&rows, &filters, &columns)), vec!["b", "c"]);
    }

    #[test]
    fn test_compare_mixed_types() {
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
