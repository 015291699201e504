//! Error types for the Reshaper crate.
//!
//! One error enum per layer:
//!
//! - [`InputError`] - Reading delimited text and spreadsheet files
//! - [`ReshapeError`] - Merge/pivot schema and result errors
//! - [`ExportError`] - Writing the output workbook
//! - [`AiError`] - Question generation service errors
//! - [`StoreError`] - Question bank persistence errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading an input file into a record set.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the file content.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid delimited text.
    #[error("Invalid CSV format in '{source_name}': {message}")]
    Parse { source_name: String, message: String },

    /// Invalid or unreadable spreadsheet container.
    #[error("Invalid spreadsheet '{source_name}': {message}")]
    Spreadsheet { source_name: String, message: String },

    /// Empty file.
    #[error("File '{0}' is empty")]
    EmptyFile(String),

    /// No header row found.
    #[error("No headers found in '{0}'")]
    NoHeaders(String),
}

// =============================================================================
// Reshape Errors
// =============================================================================

/// Errors raised by the merge/pivot transformation.
#[derive(Debug, Error, PartialEq)]
pub enum ReshapeError {
    /// Missing identifier column or empty field selection.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Nothing survived the join and deduplication steps.
    #[error("No rows left after merging and deduplication")]
    EmptyResult,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a reshaped table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Workbook writer error.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table does not fit in one worksheet.
    #[error("Table is too large for a worksheet: {0}")]
    TooLarge(String),
}

// =============================================================================
// AI Client Errors
// =============================================================================

/// Errors from the question generation service.
#[derive(Debug, Error)]
pub enum AiError {
    /// Missing API key.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The service answered with an error status.
    #[error("API error: {0}")]
    Api(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,

    /// The response did not contain a usable question object.
    #[error("Failed to parse question: {0}")]
    Parse(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the question bank.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Question not found.
    #[error("Question not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Question bank IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Question bank JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::reshape_files`]
/// and the question workflow helpers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input parsing error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Reshape error.
    #[error("Reshape error: {0}")]
    Reshape(#[from] ReshapeError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// AI client error.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Question bank error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for reshape operations.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // InputError -> PipelineError
        let input_err = InputError::EmptyFile("base.csv".into());
        let pipeline_err: PipelineError = input_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ReshapeError -> PipelineError -> ServerError
        let reshape_err = ReshapeError::Schema("missing 'Employee ID'".into());
        let pipeline_err: PipelineError = reshape_err.into();
        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("Employee ID"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = InputError::Parse {
            source_name: "aux1.csv".into(),
            message: "unterminated quote".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aux1.csv"));
        assert!(msg.contains("unterminated quote"));
    }
}
