//! Application configuration.
//!
//! Defaults shared by the CLI and the HTTP server. Values that depend on the
//! deployment (API keys, question bank location) are read from the environment.

use std::env;
use std::path::PathBuf;

/// Join key used when none is given.
pub const DEFAULT_IDENTIFIER: &str = "Employee ID";

/// Field that distinguishes repeated sub-records of one identifier.
pub const DEFAULT_DEDUP_KEY: &str = "PDF Reference Number";

/// File name offered for download by the server.
pub const OUTPUT_FILE_NAME: &str = "merged_output.xlsx";

/// Name of the single worksheet in the output workbook.
pub const OUTPUT_SHEET_NAME: &str = "Merged";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum request body for uploads (in bytes).
///
/// 50 MB limit across the three files.
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Question bank file, relative to the working directory.
const DEFAULT_QUESTION_BANK: &str = ".reshaper/questions.json";

/// Environment variable overriding the question bank location.
pub const QUESTION_BANK_ENV: &str = "RESHAPER_QUESTION_BANK";

/// Resolve the question bank path: `RESHAPER_QUESTION_BANK` or the default.
pub fn question_bank_path() -> PathBuf {
    env::var(QUESTION_BANK_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_QUESTION_BANK))
}
