//! Left join of record sets on the identifier column.
//!
//! ```text
//! base (drives cardinality)      aux (lookup)             merged
//! ┌──────────┬──────┐           ┌──────────┬───────┐     ┌──────────┬──────┬───────┐
//! │ ID       │ Ref  │           │ ID       │ Name  │     │ ID       │ Ref  │ Name  │
//! │ E1       │ R1   │     ⟕     │ E1       │ Alice │  →  │ E1       │ R1   │ Alice │
//! │ E1       │ R2   │           │ E2       │ Bob   │     │ E1       │ R2   │ Alice │
//! │ E3       │ R4   │           └──────────┴───────┘     │ E3       │ R4   │ null  │
//! └──────────┴──────┘                                    └──────────┴──────┴───────┘
//! ```
//!
//! Several matching rows on the right fan out into one merged row each.
//! Identifiers that only exist on the right are dropped.

use serde_json::Value;
use std::collections::HashMap;

use crate::models::{is_null, key_text, Record, RecordSet};

/// Rows of a join result together with their ordered column list.
#[derive(Debug, Clone, Default)]
pub struct Joined {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl From<&RecordSet> for Joined {
    fn from(set: &RecordSet) -> Self {
        Self {
            headers: set.headers.clone(),
            records: set.records.clone(),
        }
    }
}

/// Left-join `left` with `right` on `identifier`.
///
/// When a field exists on both sides, the left value wins unless it is null.
pub fn left_join(left: Joined, right: &RecordSet, identifier: &str) -> Joined {
    let index = index_by_key(right, identifier);
    let right_fields: Vec<&String> = right.headers.iter().filter(|h| *h != identifier).collect();

    let mut records = Vec::with_capacity(left.records.len());
    for row in left.records {
        let matches = row
            .get(identifier)
            .and_then(key_text)
            .and_then(|key| index.get(&key));

        match matches {
            Some(positions) => {
                for &pos in positions {
                    let mut merged = row.clone();
                    for field in &right_fields {
                        let value = right.records[pos].get(*field).cloned().unwrap_or(Value::Null);
                        merge_cell(&mut merged, field, value);
                    }
                    records.push(merged);
                }
            }
            None => {
                let mut merged = row;
                for field in &right_fields {
                    merge_cell(&mut merged, field, Value::Null);
                }
                records.push(merged);
            }
        }
    }

    Joined {
        headers: union_headers(&left.headers, &right.headers),
        records,
    }
}

/// Join `base` with `aux2`, then with `aux1`.
pub fn join_all(base: &RecordSet, aux1: &RecordSet, aux2: &RecordSet, identifier: &str) -> Joined {
    let first = left_join(Joined::from(base), aux2, identifier);
    left_join(first, aux1, identifier)
}

/// Ordered union of header lists, first occurrence wins.
pub fn union_headers(left: &[String], right: &[String]) -> Vec<String> {
    let mut headers = left.to_vec();
    for h in right {
        if !headers.contains(h) {
            headers.push(h.clone());
        }
    }
    headers
}

fn index_by_key(set: &RecordSet, identifier: &str) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, record) in set.records.iter().enumerate() {
        if let Some(key) = record.get(identifier).and_then(key_text) {
            index.entry(key).or_default().push(pos);
        }
    }
    index
}

fn merge_cell(row: &mut Record, field: &str, value: Value) {
    match row.get(field) {
        Some(existing) if !is_null(existing) => {}
        Some(_) if is_null(&value) => {}
        _ => {
            row.insert(field.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(name: &str, headers: &[&str], rows: Vec<Value>) -> RecordSet {
        let records = rows
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        RecordSet::new(name, headers.iter().map(|h| h.to_string()).collect(), records)
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let base = set("base", &["ID", "Ref"], vec![
            json!({"ID": "E1", "Ref": "R1"}),
            json!({"ID": "E3", "Ref": "R4"}),
        ]);
        let aux = set("aux", &["ID", "Name"], vec![json!({"ID": "E1", "Name": "Alice"})]);

        let joined = left_join(Joined::from(&base), &aux, "ID");

        assert_eq!(joined.records.len(), 2);
        assert_eq!(joined.records[0]["Name"], "Alice");
        assert!(joined.records[1]["Name"].is_null());
        assert_eq!(joined.headers, vec!["ID", "Ref", "Name"]);
    }

    #[test]
    fn test_left_join_fans_out_on_repeated_keys() {
        let base = set("base", &["ID"], vec![json!({"ID": "E1"})]);
        let aux = set("aux", &["ID", "Course"], vec![
            json!({"ID": "E1", "Course": "Rust"}),
            json!({"ID": "E1", "Course": "SQL"}),
        ]);

        let joined = left_join(Joined::from(&base), &aux, "ID");

        assert_eq!(joined.records.len(), 2);
        assert_eq!(joined.records[1]["Course"], "SQL");
    }

    #[test]
    fn test_right_only_identifiers_dropped() {
        let base = set("base", &["ID"], vec![json!({"ID": "E1"})]);
        let aux = set("aux", &["ID", "Name"], vec![json!({"ID": "E9", "Name": "Zed"})]);

        let joined = left_join(Joined::from(&base), &aux, "ID");

        assert_eq!(joined.records.len(), 1);
        assert_eq!(joined.records[0]["ID"], "E1");
    }

    #[test]
    fn test_shared_field_prefers_non_null_left() {
        let base = set("base", &["ID", "Name"], vec![
            json!({"ID": "E1", "Name": "Alice"}),
            json!({"ID": "E2", "Name": null}),
        ]);
        let aux = set("aux", &["ID", "Name"], vec![
            json!({"ID": "E1", "Name": "Alicia"}),
            json!({"ID": "E2", "Name": "Bob"}),
        ]);

        let joined = left_join(Joined::from(&base), &aux, "ID");

        assert_eq!(joined.records[0]["Name"], "Alice");
        assert_eq!(joined.records[1]["Name"], "Bob");
    }

    #[test]
    fn test_numeric_and_text_keys_match() {
        let base = set("base", &["ID"], vec![json!({"ID": 7.0})]);
        let aux = set("aux", &["ID", "Name"], vec![json!({"ID": "7", "Name": "Gus"})]);

        let joined = left_join(Joined::from(&base), &aux, "ID");

        assert_eq!(joined.records[0]["Name"], "Gus");
    }

    #[test]
    fn test_join_order_base_aux2_aux1() {
        let base = set("base", &["ID"], vec![json!({"ID": "E1"})]);
        let aux1 = set("aux1", &["ID", "Name"], vec![json!({"ID": "E1", "Name": "from aux1"})]);
        let aux2 = set("aux2", &["ID", "Name"], vec![json!({"ID": "E1", "Name": "from aux2"})]);

        let joined = join_all(&base, &aux1, &aux2, "ID");

        assert_eq!(joined.records[0]["Name"], "from aux2");
    }
}
