//! REST API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{RecordSet, StoredQuestion};
use crate::transform::{ReshapeOutput, ReshapeReport};

/// JSON rendering of a reshape (when `format=json` is requested).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" or "warning" (some requested fields were ignored)
    pub status: String,

    /// Output columns in order
    pub columns: Vec<String>,

    /// One object per identifier
    pub rows: Vec<Value>,

    pub report: Value,
}

impl From<ReshapeOutput> for ReshapeResponse {
    fn from(output: ReshapeOutput) -> Self {
        let status = if output.report.ignored_fields.is_empty() { "ready" } else { "warning" };
        ReshapeResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            rows: output.table.to_records(),
            columns: output.table.columns,
            report: report_json(&output.report),
        }
    }
}

fn report_json(report: &ReshapeReport) -> Value {
    serde_json::to_value(report).unwrap_or(Value::Null)
}

/// Per-file metadata returned with the column list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<&RecordSet> for FileMetadata {
    fn from(set: &RecordSet) -> Self {
        Self {
            name: set.name.clone(),
            row_count: set.len(),
            columns: set.headers.clone(),
        }
    }
}

/// Columns available for selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
    pub files: Vec<FileMetadata>,
}

/// Body of `POST /api/questions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
}

/// Body of `POST /api/questions/{reference}/check`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub output: String,
}

/// Question bank listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsResponse {
    pub count: usize,
    pub questions: Vec<StoredQuestion>,
}

impl From<&[StoredQuestion]> for QuestionsResponse {
    fn from(questions: &[StoredQuestion]) -> Self {
        Self {
            count: questions.len(),
            questions: questions.to_vec(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReshapedTable;

    #[test]
    fn test_reshape_response_from_output() {
        let output = ReshapeOutput {
            table: ReshapedTable {
                columns: vec!["Employee ID".into(), "Name_1".into()],
                rows: vec![vec![json!("E1"), json!("Alice")]],
            },
            report: ReshapeReport {
                ignored_fields: vec!["Salary".into()],
                ..ReshapeReport::default()
            },
        };

        let response = ReshapeResponse::from(output);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "warning");
        assert_eq!(json["rows"][0]["Name_1"], "Alice");
        assert_eq!(json["report"]["ignoredFields"][0], "Salary");
        assert!(json.get("jobId").is_some());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Schema error: 'aux1.csv' has no 'Employee ID' column");
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("aux1.csv"));
    }
}
