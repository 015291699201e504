//! # Reshaper - merge three tabular files into one row per identifier
//!
//! Reshaper left-joins a base file with two auxiliary files on a shared
//! identifier, removes duplicate sub-records, and pivots repeated rows into
//! numbered columns (`Name_1`, `Name_2`, ...). A small coding-question service
//! (generate, store, grade) ships alongside it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│ merged XLSX │
//! │   (x3)      │     │  (auto-enc) │     │ (join+pivot)│     │ (one sheet) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reshaper::{reshape_files, ReshapeInputs, ReshapeOptions};
//! use std::path::Path;
//!
//! let inputs = ReshapeInputs::new("base.csv", "aux1.csv", "aux2.xlsx");
//! let fields = vec!["Name".to_string()];
//! let output = reshape_files(&inputs, &fields, &ReshapeOptions::default(), Some(Path::new("out.xlsx")))?;
//! println!("{} identifiers", output.table.rows.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Defaults and environment lookups
//! - [`models`] - Records, reshaped tables, questions
//! - [`parser`] - CSV/XLSX parsing with auto-detection
//! - [`transform`] - Join, pivot, and pipeline
//! - [`export`] - XLSX/CSV writers
//! - [`validation`] - JSON Schema validation of generated questions
//! - [`store`] - Question bank persistence
//! - [`ai`] - Question generation client
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;

// Validation
pub mod validation;

// Question bank
pub mod store;

// AI
pub mod ai;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AiError, ExportError, InputError, PipelineError, PipelineResult, ReshapeError, ServerError,
    StoreError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Grade, Question, Record, RecordSet, ReshapedTable, StoredQuestion};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, detect_format, load_record_set,
    load_record_set_file, parse_delimited, parse_spreadsheet, InputFormat,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    available_columns, reshape, select_fields, ReshapeOptions, ReshapeOutput, ReshapeReport,
};

pub use transform::pipeline::{
    list_columns, load_inputs, load_uploads, reshape_files, reshape_sets, reshape_uploads,
    NamedBytes, ReshapeInputs,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{save_table, write_csv, write_xlsx, OutputFormat};

// =============================================================================
// Re-exports - Questions
// =============================================================================

pub use ai::{parse_question, QuestionClient};
pub use store::QuestionBank;
pub use validation::validate_question;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
