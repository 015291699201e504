//! High-level pipeline API: load three inputs, reshape, export.
//!
//! Combines parsing, the merge/pivot step and serialization, logging each
//! step through the shared log broadcaster.
//!
//! # Example
//!
//! ```rust,ignore
//! use reshaper::transform::pipeline::{reshape_files, ReshapeInputs};
//! use reshaper::transform::ReshapeOptions;
//! use std::path::Path;
//!
//! let inputs = ReshapeInputs::new("employees.csv", "names.xlsx", "certificates.csv");
//! let fields = vec!["Name".to_string(), "PDF Reference Number".to_string()];
//! let output = reshape_files(&inputs, &fields, &ReshapeOptions::default(), Some(Path::new("merged_output.xlsx")))?;
//! println!("{} employees", output.table.rows.len());
//! ```

use std::path::{Path, PathBuf};

use super::reshape::{available_columns, reshape, ReshapeOptions, ReshapeOutput, ReshapeReport};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::OUTPUT_SHEET_NAME;
use crate::error::PipelineResult;
use crate::export::save_table;
use crate::models::RecordSet;
use crate::parser::{load_record_set, load_record_set_file};

/// Paths of the three input files.
#[derive(Debug, Clone)]
pub struct ReshapeInputs {
    /// Drives output cardinality
    pub base: PathBuf,
    /// Joined last
    pub aux1: PathBuf,
    /// Joined first
    pub aux2: PathBuf,
}

impl ReshapeInputs {
    pub fn new(base: impl Into<PathBuf>, aux1: impl Into<PathBuf>, aux2: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            aux1: aux1.into(),
            aux2: aux2.into(),
        }
    }
}

/// An uploaded file: name plus raw content.
#[derive(Debug, Clone)]
pub struct NamedBytes {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Load the three inputs from disk.
pub fn load_inputs(inputs: &ReshapeInputs) -> PipelineResult<[RecordSet; 3]> {
    log_info("📖 Reading input files...");
    let base = load_logged_file(&inputs.base)?;
    let aux1 = load_logged_file(&inputs.aux1)?;
    let aux2 = load_logged_file(&inputs.aux2)?;
    Ok([base, aux1, aux2])
}

/// Parse the three uploaded files.
pub fn load_uploads(uploads: &[NamedBytes; 3]) -> PipelineResult<[RecordSet; 3]> {
    log_info("📖 Reading uploaded files...");
    let [base, aux1, aux2] = uploads;
    Ok([
        load_logged_bytes(base)?,
        load_logged_bytes(aux1)?,
        load_logged_bytes(aux2)?,
    ])
}

fn load_logged_file(path: &Path) -> PipelineResult<RecordSet> {
    let set = load_record_set_file(path).inspect_err(|e| log_error(e.to_string()))?;
    log_loaded(&set);
    Ok(set)
}

fn load_logged_bytes(upload: &NamedBytes) -> PipelineResult<RecordSet> {
    let set = load_record_set(&upload.name, &upload.bytes).inspect_err(|e| log_error(e.to_string()))?;
    log_loaded(&set);
    Ok(set)
}

fn log_loaded(set: &RecordSet) {
    log_success(format!(
        "{}: {} rows, {} columns",
        set.name,
        set.len(),
        set.headers.len()
    ));
}

/// Columns a user can pick from, across all three inputs.
pub fn list_columns(sets: &[RecordSet; 3]) -> Vec<String> {
    let [base, aux1, aux2] = sets;
    available_columns(&[base, aux1, aux2])
}

/// Reshape already-loaded record sets and log the outcome.
pub fn reshape_sets(
    sets: &[RecordSet; 3],
    fields: &[String],
    options: &ReshapeOptions,
) -> PipelineResult<ReshapeOutput> {
    let [base, aux1, aux2] = sets;

    log_info(format!("🔗 Merging on '{}'...", options.identifier));
    let output = reshape(base, aux1, aux2, fields, options).inspect_err(|e| log_error(e.to_string()))?;

    print_report(&output.report, options);
    Ok(output)
}

/// Full pipeline from paths: load, reshape, and optionally write the result.
pub fn reshape_files(
    inputs: &ReshapeInputs,
    fields: &[String],
    options: &ReshapeOptions,
    output_path: Option<&Path>,
) -> PipelineResult<ReshapeOutput> {
    let sets = load_inputs(inputs)?;
    let output = reshape_sets(&sets, fields, options)?;

    if let Some(path) = output_path {
        log_info("💾 Writing output...");
        save_table(&output.table, path, OUTPUT_SHEET_NAME)?;
        log_success(format!("Saved to {}", path.display()));
    }

    Ok(output)
}

/// Full pipeline from uploaded bytes (no file output).
pub fn reshape_uploads(
    uploads: &[NamedBytes; 3],
    fields: &[String],
    options: &ReshapeOptions,
) -> PipelineResult<ReshapeOutput> {
    let sets = load_uploads(uploads)?;
    reshape_sets(&sets, fields, options)
}

/// Print the reshape report
fn print_report(report: &ReshapeReport, options: &ReshapeOptions) {
    for field in &report.ignored_fields {
        log_warning(format!("Field '{}' not found in any input, ignored", field));
    }
    log_info(format!("📋 Pivoting {} field(s):", report.selected_fields.len()));
    for (i, field) in report.selected_fields.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, field), 1);
    }

    log_success(format!("{} base rows → {} merged rows", report.base_rows, report.merged_rows));
    match options.dedup_key.as_deref() {
        Some(key) if report.selected_fields.iter().any(|f| f == key) => {
            log_success(format!("Removed {} duplicate '{}' rows", report.duplicates_removed, key));
        }
        Some(key) => log_info(format!("'{}' not selected, no deduplication", key)),
        None => log_info("Deduplication disabled"),
    }
    log_success(format!(
        "{} unique identifiers, up to {} occurrence(s) each",
        report.output_rows, report.max_occurrence
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_options() {
        let opts = ReshapeOptions::default();
        assert_eq!(opts.identifier, "Employee ID");
        assert_eq!(opts.dedup_key.as_deref(), Some("PDF Reference Number"));
    }

    #[test]
    fn test_reshape_files_end_to_end() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("certificates.csv");
        let aux1 = dir.path().join("names.csv");
        let aux2 = dir.path().join("departments.csv");
        fs::write(&base, "Employee ID,PDF Reference Number\nE1,R1\nE1,R2\nE1,R2\nE2,R3\n").unwrap();
        fs::write(&aux1, "Employee ID;Name\nE1;Alice\nE2;Bob\n").unwrap();
        fs::write(&aux2, "Employee ID\tDepartment\nE1\tOps\n").unwrap();

        let out_path = dir.path().join("merged_output.xlsx");
        let fields = vec![
            "Name".to_string(),
            "PDF Reference Number".to_string(),
            "Department".to_string(),
        ];

        let output = reshape_files(
            &ReshapeInputs::new(&base, &aux1, &aux2),
            &fields,
            &ReshapeOptions::default(),
            Some(out_path.as_path()),
        )
        .unwrap();

        assert_eq!(output.report.duplicates_removed, 1);
        assert_eq!(
            output.table.columns,
            vec![
                "Employee ID",
                "Name_1",
                "PDF Reference Number_1",
                "Department_1",
                "Name_2",
                "PDF Reference Number_2",
                "Department_2",
            ]
        );
        // E2 has no department: padded with null
        assert!(output.table.cell(1, "Department_1").unwrap().is_null());

        let written = load_record_set_file(&out_path).unwrap();
        assert_eq!(written.headers, output.table.columns);
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn test_reshape_uploads_reports_missing_identifier() {
        let uploads = [
            NamedBytes { name: "base.csv".into(), bytes: b"Employee ID,Ref\nE1,R1".to_vec() },
            NamedBytes { name: "aux1.csv".into(), bytes: b"ID,Name\nE1,Alice".to_vec() },
            NamedBytes { name: "aux2.csv".into(), bytes: b"Employee ID,Name\nE1,Alice".to_vec() },
        ];

        let err = reshape_uploads(&uploads, &["Name".to_string()], &ReshapeOptions::default()).unwrap_err();

        assert!(err.to_string().contains("aux1.csv"));
    }

    #[test]
    fn test_list_columns() {
        let uploads = [
            NamedBytes { name: "a.csv".into(), bytes: b"Employee ID,Ref".to_vec() },
            NamedBytes { name: "b.csv".into(), bytes: b"Employee ID,Name".to_vec() },
            NamedBytes { name: "c.csv".into(), bytes: b"Name,Employee ID,Team".to_vec() },
        ];

        let sets = load_uploads(&uploads).unwrap();

        assert_eq!(list_columns(&sets), vec!["Employee ID", "Ref", "Name", "Team"]);
    }
}
