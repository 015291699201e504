//! Serialization of a [`ReshapedTable`] to an output artifact.
//!
//! The main target is a single-sheet XLSX workbook: bold frozen header row,
//! numbers written as numbers, null cells left blank. CSV is offered for
//! callers that ask for a `.csv` output path.

use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::models::{display_text, ReshapedTable};

/// Output artifact kind, chosen from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
            _ => OutputFormat::Xlsx,
        }
    }
}

/// Column limit of an XLSX worksheet.
const MAX_XLSX_COLUMNS: usize = 16_384;

/// Row limit of an XLSX worksheet, header included.
const MAX_XLSX_ROWS: usize = 1_048_576;

/// Render the table as an in-memory XLSX workbook with one sheet.
pub fn write_xlsx(table: &ReshapedTable, sheet_name: &str) -> ExportResult<Vec<u8>> {
    if table.columns.len() > MAX_XLSX_COLUMNS {
        return Err(ExportError::TooLarge(format!(
            "{} columns (limit {})",
            table.columns.len(),
            MAX_XLSX_COLUMNS
        )));
    }
    if table.rows.len() >= MAX_XLSX_ROWS {
        return Err(ExportError::TooLarge(format!(
            "{} rows (limit {})",
            table.rows.len(),
            MAX_XLSX_ROWS - 1
        )));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column_number(col)?, name, &header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = u32::try_from(r + 1)
            .map_err(|_| ExportError::TooLarge(format!("row {}", r + 1)))?;
        for (c, cell) in row.iter().enumerate() {
            let col = column_number(c)?;
            match cell {
                Value::Null => {}
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(excel_row, col, f)?;
                    }
                    None => {
                        worksheet.write_string(excel_row, col, n.to_string())?;
                    }
                },
                Value::Bool(b) => {
                    worksheet.write_boolean(excel_row, col, *b)?;
                }
                Value::String(s) if s.is_empty() => {}
                other => {
                    worksheet.write_string(excel_row, col, display_text(other))?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> ExportResult<u16> {
    u16::try_from(col).map_err(|_| ExportError::TooLarge(format!("column {}", col + 1)))
}

/// Render the table as comma-separated text.
pub fn write_csv(table: &ReshapedTable) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(display_text))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Write the table to `path`, picking the format from its extension.
pub fn save_table(table: &ReshapedTable, path: &Path, sheet_name: &str) -> ExportResult<()> {
    let bytes = match OutputFormat::from_path(path) {
        OutputFormat::Xlsx => write_xlsx(table, sheet_name)?,
        OutputFormat::Csv => write_csv(table)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_record_set;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_table() -> ReshapedTable {
        ReshapedTable {
            columns: vec!["Employee ID".into(), "Name_1".into(), "Score_1".into(), "Name_2".into()],
            rows: vec![
                vec![json!("E1"), json!("Alice"), json!(9.5), json!("Alice")],
                vec![json!("E2"), json!("Bob"), json!(7), Value::Null],
            ],
        }
    }

    #[test]
    fn test_xlsx_output_reads_back() {
        let bytes = write_xlsx(&sample_table(), "Merged").unwrap();
        let set = load_record_set("merged_output.xlsx", &bytes).unwrap();

        assert_eq!(set.headers, vec!["Employee ID", "Name_1", "Score_1", "Name_2"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0]["Score_1"], 9.5);
        assert!(set.records[1]["Name_2"].is_null());
    }

    #[test]
    fn test_too_many_columns_is_error() {
        let columns: Vec<String> = (0..=MAX_XLSX_COLUMNS).map(|i| format!("F_{}", i)).collect();
        let table = ReshapedTable {
            rows: vec![vec![Value::Null; columns.len()]],
            columns,
        };

        let err = write_xlsx(&table, "Merged").unwrap_err();
        assert!(matches!(err, ExportError::TooLarge(_)));
        assert!(column_number(70_000).is_err());
        assert_eq!(column_number(3).unwrap(), 3);
    }

    #[test]
    fn test_csv_output() {
        let bytes = write_csv(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Employee ID,Name_1,Score_1,Name_2"));
        assert_eq!(lines.next(), Some("E1,Alice,9.5,Alice"));
        assert_eq!(lines.next(), Some("E2,Bob,7,"));
    }

    #[test]
    fn test_save_table_picks_format() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("out/merged.csv");
        let xlsx_path = dir.path().join("merged.xlsx");

        save_table(&sample_table(), &csv_path, "Merged").unwrap();
        save_table(&sample_table(), &xlsx_path, "Merged").unwrap();

        assert!(fs::read_to_string(&csv_path).unwrap().starts_with("Employee ID"));
        assert!(fs::read(&xlsx_path).unwrap().starts_with(b"PK"));
    }
}
