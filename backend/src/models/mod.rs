//! Domain models for the reshape pipeline and the question bank.
//!
//! - [`Record`] - One input row (field name → scalar value)
//! - [`RecordSet`] - Ordered rows sharing a header list
//! - [`ReshapedTable`] - Wide output: one row per identifier
//! - [`Question`] / [`StoredQuestion`] - Generated coding questions
//! - [`Grade`] - Result of comparing a candidate's output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Records
// =============================================================================

/// A single row: field name to scalar value.
pub type Record = Map<String, Value>;

/// An ordered sequence of records loaded from one tabular source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    /// Source name (usually the uploaded file name).
    pub name: String,
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Rows, each keyed by header.
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            headers,
            records,
        }
    }

    /// Whether the header row contains `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.headers.iter().any(|h| h == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Cell helpers
// =============================================================================

/// A cell is null when it is JSON `null` or blank text.
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Canonical text used to compare join keys across file formats.
///
/// Integral floats print without a fraction so that a spreadsheet `7.0`
/// matches a CSV `7`. Returns `None` for null cells.
pub fn key_text(value: &Value) -> Option<String> {
    if is_null(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Display text of a cell (empty for null).
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => key_text(other).unwrap_or_default(),
    }
}

// =============================================================================
// Reshaped output
// =============================================================================

/// Wide table produced by the reshaper.
///
/// `columns[0]` is the identifier; every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReshapedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ReshapedTable {
    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Rows as JSON objects keyed by column name, keys in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

// =============================================================================
// Questions
// =============================================================================

/// A coding question as returned by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub sample_input: String,
    pub expected_output: String,
}

/// A question persisted in the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuestion {
    /// Unique identifier
    pub id: String,
    #[serde(flatten)]
    pub question: Question,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Outcome of comparing a candidate's output with the expected output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub correct: bool,
    pub expected: String,
    pub got: String,
}

impl Grade {
    /// Compare trimmed strings.
    pub fn compare(expected: &str, produced: &str) -> Self {
        let expected = expected.trim().to_string();
        let got = produced.trim().to_string();
        Self {
            correct: expected == got,
            expected,
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_detection() {
        assert!(is_null(&Value::Null));
        assert!(is_null(&json!("")));
        assert!(is_null(&json!("   ")));
        assert!(!is_null(&json!("x")));
        assert!(!is_null(&json!(0)));
        assert!(!is_null(&json!(false)));
    }

    #[test]
    fn test_key_text_normalizes_numbers() {
        assert_eq!(key_text(&json!(7.0)), Some("7".to_string()));
        assert_eq!(key_text(&json!(7)), Some("7".to_string()));
        assert_eq!(key_text(&json!(" 7 ")), Some("7".to_string()));
        assert_eq!(key_text(&json!(7.5)), Some("7.5".to_string()));
        assert_eq!(key_text(&Value::Null), None);
    }

    #[test]
    fn test_table_lookup() {
        let table = ReshapedTable {
            columns: vec!["Employee ID".into(), "Name_1".into()],
            rows: vec![vec![json!("E1"), json!("Alice")], vec![json!(2.0), Value::Null]],
        };
        assert_eq!(table.cell(0, "Name_1"), Some(&json!("Alice")));
        assert!(table.cell(1, "Name_1").unwrap().is_null());
        assert_eq!(table.to_records()[0]["Name_1"], "Alice");
    }

    #[test]
    fn test_records_keep_column_order() {
        let table = ReshapedTable {
            columns: vec![
                "Identifier".into(),
                "Name_1".into(),
                "Reference_1".into(),
                "Name_2".into(),
                "Reference_2".into(),
            ],
            rows: vec![vec![json!("E1"), json!("Alice"), json!("R1"), json!("Alice"), json!("R2")]],
        };

        let records = table.to_records();
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, table.columns.iter().collect::<Vec<_>>());

        let text = serde_json::to_string(&records[0]).unwrap();
        assert!(text.find("Reference_1").unwrap() < text.find("Name_2").unwrap());
    }

    #[test]
    fn test_grade_trims() {
        let grade = Grade::compare("42\n", "  42 ");
        assert!(grade.correct);
        assert!(!Grade::compare("42", "43").correct);
    }

    #[test]
    fn test_stored_question_flattens() {
        let stored = StoredQuestion {
            id: "q1".into(),
            question: Question {
                question: "Sum a list".into(),
                sample_input: "[1, 2]".into(),
                expected_output: "3".into(),
            },
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["question"], "Sum a list");
        assert_eq!(value["expected_output"], "3");
    }
}
