//! Long-to-wide reshaping of merged rows.
//!
//! Repeated rows for one identifier become numbered column groups:
//!
//! ```text
//! Merged rows (long)                    Reshaped (wide)
//! ┌────┬───────┬─────┐                  ┌────┬────────┬─────────────┬────────┬─────────────┐
//! │ ID │ Name  │ Ref │                  │ ID │ Name_1 │ Reference_1 │ Name_2 │ Reference_2 │
//! │ E1 │ Alice │ R1  │        →         │ E1 │ Alice  │ R1          │ Alice  │ R2          │
//! │ E1 │ Alice │ R2  │                  │ E2 │ Bob    │ R3          │        │             │
//! │ E2 │ Bob   │ R3  │                  └────┴────────┴─────────────┴────────┴─────────────┘
//! └────┴───────┴─────┘
//! ```

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::models::{is_null, key_text, Record, ReshapedTable};

/// A merged row tagged with its 1-based occurrence index.
#[derive(Debug, Clone)]
pub struct Occurrence<'a> {
    pub key: String,
    pub index: usize,
    pub record: &'a Record,
}

/// Drop rows repeating an earlier (identifier, dedup value) pair.
///
/// The first row of each pair is kept. Two null dedup values compare equal.
pub fn dedup_by_key(rows: Vec<Record>, identifier: &str, dedup_key: &str) -> Vec<Record> {
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let id = row.get(identifier).and_then(key_text);
            let marker = row.get(dedup_key).and_then(key_text);
            seen.insert((id, marker))
        })
        .collect()
}

/// Number rows 1..N per identifier in their current order.
///
/// Rows without an identifier cannot be placed in any output row and are skipped.
pub fn assign_occurrences<'a>(rows: &'a [Record], identifier: &str) -> Vec<Occurrence<'a>> {
    let mut counters: HashMap<String, usize> = HashMap::new();
    rows.iter()
        .filter_map(|record| {
            let key = record.get(identifier).and_then(key_text)?;
            let counter = counters.entry(key.clone()).or_insert(0);
            *counter += 1;
            Some(Occurrence {
                key,
                index: *counter,
                record,
            })
        })
        .collect()
}

/// Pivot occurrences into one row per identifier.
///
/// Rows are sorted by identifier (see [`sort_identifiers`]). Column `F_i` is emitted
/// only when some occurrence `i` has a non-null `F`; columns are ordered by
/// occurrence, then by the order of `fields`.
pub fn pivot(occurrences: &[Occurrence<'_>], identifier: &str, fields: &[String]) -> ReshapedTable {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Occurrence<'_>>> = HashMap::new();
    let mut present: HashSet<(usize, usize)> = HashSet::new();
    let mut max_occurrence = 0;

    for occ in occurrences {
        let group = groups.entry(occ.key.as_str()).or_insert_with(|| {
            order.push(occ.key.as_str());
            Vec::new()
        });
        group.push(occ);
        max_occurrence = max_occurrence.max(occ.index);

        for (f, field) in fields.iter().enumerate() {
            if occ.record.get(field).is_some_and(|v| !is_null(v)) {
                present.insert((f, occ.index));
            }
        }
    }

    sort_identifiers(&mut order);

    let mut layout: Vec<(usize, usize)> = Vec::new();
    let mut columns = vec![identifier.to_string()];
    for index in 1..=max_occurrence {
        for (f, field) in fields.iter().enumerate() {
            if present.contains(&(f, index)) {
                layout.push((f, index));
                columns.push(format!("{}_{}", field, index));
            }
        }
    }

    let rows = order
        .iter()
        .map(|key| {
            let group = &groups[key];
            let id_value = group[0]
                .record
                .get(identifier)
                .cloned()
                .unwrap_or(Value::Null);

            let mut row = Vec::with_capacity(columns.len());
            row.push(id_value);
            for &(f, index) in &layout {
                let cell = group
                    .get(index - 1)
                    .and_then(|occ| occ.record.get(&fields[f]))
                    .filter(|v| !is_null(v))
                    .cloned()
                    .unwrap_or(Value::Null);
                row.push(cell);
            }
            row
        })
        .collect();

    ReshapedTable { columns, rows }
}

/// Sort identifier keys: numerically when every key is a number, as text otherwise.
pub fn sort_identifiers(keys: &mut [&str]) {
    let numbers: Option<Vec<f64>> = keys.iter().map(|k| k.parse::<f64>().ok()).collect();
    match numbers {
        Some(numbers) => {
            let mut pairs: Vec<(f64, &str)> = numbers.into_iter().zip(keys.iter().copied()).collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (slot, (_, key)) in keys.iter_mut().zip(pairs) {
                *slot = key;
            }
        }
        None => keys.sort_unstable(),
    }
}
