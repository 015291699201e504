//! The merge-and-pivot contract.
//!
//! `reshape(base, aux1, aux2, fields)` joins the three record sets on the
//! identifier, collapses duplicated sub-records, numbers the remaining rows per
//! identifier and pivots them into one wide row per identifier.

use serde::{Deserialize, Serialize};

use super::join::{join_all, union_headers};
use super::pivot::{assign_occurrences, dedup_by_key, pivot};
use crate::config::{DEFAULT_DEDUP_KEY, DEFAULT_IDENTIFIER};
use crate::error::{ReshapeError, ReshapeResult};
use crate::models::{RecordSet, ReshapedTable};

/// Options for the reshape step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeOptions {
    /// Join key present in all three inputs
    pub identifier: String,

    /// Field marking repeated sub-records; `None` disables deduplication
    pub dedup_key: Option<String>,
}

impl Default for ReshapeOptions {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            dedup_key: Some(DEFAULT_DEDUP_KEY.to_string()),
        }
    }
}

/// Row counts and decisions taken while reshaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeReport {
    pub base_rows: usize,
    pub merged_rows: usize,
    pub duplicates_removed: usize,
    pub output_rows: usize,
    pub max_occurrence: usize,
    /// Fields actually pivoted, in selection order
    pub selected_fields: Vec<String>,
    /// Requested fields that no input provides
    pub ignored_fields: Vec<String>,
}

/// A reshaped table and the report describing how it was built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReshapeOutput {
    pub table: ReshapedTable,
    pub report: ReshapeReport,
}

/// Ordered union of the headers of several record sets.
pub fn available_columns(sets: &[&RecordSet]) -> Vec<String> {
    sets.iter()
        .fold(Vec::new(), |acc, set| union_headers(&acc, &set.headers))
}

/// Intersect the requested fields with the available ones.
///
/// Keeps request order, drops duplicates and the identifier itself.
/// Returns `(selected, ignored)`.
pub fn select_fields(
    requested: &[String],
    available: &[String],
    identifier: &str,
) -> ReshapeResult<(Vec<String>, Vec<String>)> {
    let mut selected: Vec<String> = Vec::new();
    let mut ignored: Vec<String> = Vec::new();

    for field in requested {
        let field = field.trim();
        if field.is_empty() || field == identifier || selected.iter().any(|s| s == field) {
            continue;
        }
        if available.iter().any(|a| a == field) {
            selected.push(field.to_string());
        } else if !ignored.iter().any(|s| s == field) {
            ignored.push(field.to_string());
        }
    }

    if selected.is_empty() {
        return Err(ReshapeError::Schema(format!(
            "none of the selected fields [{}] exist in the inputs",
            requested.join(", ")
        )));
    }

    Ok((selected, ignored))
}

/// Merge three record sets on the identifier and pivot repeated rows into columns.
///
/// # Errors
/// - [`ReshapeError::Schema`] when an input lacks the identifier column or the
///   field selection does not intersect the available columns
/// - [`ReshapeError::EmptyResult`] when no row survives the join and deduplication
pub fn reshape(
    base: &RecordSet,
    aux1: &RecordSet,
    aux2: &RecordSet,
    selected_fields: &[String],
    options: &ReshapeOptions,
) -> ReshapeResult<ReshapeOutput> {
    let identifier = options.identifier.as_str();

    for set in [base, aux1, aux2] {
        if !set.has_field(identifier) {
            return Err(ReshapeError::Schema(format!(
                "'{}' has no '{}' column",
                set.name, identifier
            )));
        }
    }

    let available = available_columns(&[base, aux1, aux2]);
    let (fields, ignored) = select_fields(selected_fields, &available, identifier)?;

    let joined = join_all(base, aux1, aux2, identifier);
    let merged_rows = joined.records.len();

    let rows = match options.dedup_key.as_deref() {
        Some(key) if fields.iter().any(|f| f == key) => dedup_by_key(joined.records, identifier, key),
        _ => joined.records,
    };
    let duplicates_removed = merged_rows - rows.len();

    let occurrences = assign_occurrences(&rows, identifier);
    if occurrences.is_empty() {
        return Err(ReshapeError::EmptyResult);
    }

    let table = pivot(&occurrences, identifier, &fields);
    let max_occurrence = occurrences.iter().map(|o| o.index).max().unwrap_or(0);

    let report = ReshapeReport {
        base_rows: base.len(),
        merged_rows,
        duplicates_removed,
        output_rows: table.rows.len(),
        max_occurrence,
        selected_fields: fields,
        ignored_fields: ignored,
    };

    Ok(ReshapeOutput { table, report })
}
