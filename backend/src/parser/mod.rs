//! Tabular input parsing with format, encoding and delimiter auto-detection.
//!
//! Turns an uploaded file (delimited text or a spreadsheet container) into a
//! [`RecordSet`]. Field presence comes from the header row. No merge logic here.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::models::{Record, RecordSet};

/// Zip local file header (xlsx, xlsm, ods).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE compound document header (legacy xls).
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Input encoding family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Spreadsheet,
}

/// Decide how to read a file from its name and leading bytes.
pub fn detect_format(name: &str, bytes: &[u8]) -> InputFormat {
    let lower = name.to_lowercase();
    let by_extension = [".xlsx", ".xlsm", ".xls", ".ods"]
        .iter()
        .any(|ext| lower.ends_with(ext));

    if by_extension || bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        InputFormat::Spreadsheet
    } else {
        InputFormat::Delimited
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> InputResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        // WHATWG maps the latin1 labels to windows-1252, a superset of ISO-8859-1 printables
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => Ok(enc.decode(bytes).0.into_owned()),
            None => Err(InputError::Encoding(format!("unsupported encoding '{}'", other))),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use reshaper::parser::parse_delimited;
///
/// let set = parse_delimited("people.csv", "Employee ID,Name\nE1,Alice", ',').unwrap();
/// assert_eq!(set.headers, vec!["Employee ID", "Name"]);
/// assert_eq!(set.records[0]["Name"], "Alice");
/// ```
pub fn parse_delimited(name: &str, content: &str, delimiter: char) -> InputResult<RecordSet> {
    if content.trim().is_empty() {
        return Err(InputError::EmptyFile(name.to_string()));
    }

    let parse_err = |e: csv::Error| InputError::Parse {
        source_name: name.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(InputError::NoHeaders(name.to_string()));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(parse_err)?;
        if row.iter().all(|v| v.is_empty()) {
            continue;
        }

        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            let value = match row.get(i) {
                Some(v) if !v.is_empty() => json!(v),
                _ => Value::Null,
            };
            record.insert(header.clone(), value);
        }
        records.push(record);
    }

    Ok(RecordSet::new(name, headers, records))
}

/// Parse delimited bytes with encoding and delimiter auto-detection.
pub fn parse_delimited_auto(name: &str, bytes: &[u8]) -> InputResult<RecordSet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_delimited(name, &content, delimiter)
}

/// Parse the first worksheet of a spreadsheet container.
///
/// The first row is the header row; empty cells become null.
pub fn parse_spreadsheet(name: &str, bytes: &[u8]) -> InputResult<RecordSet> {
    let sheet_err = |message: String| InputError::Spreadsheet {
        source_name: name.to_string(),
        message,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| sheet_err(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| sheet_err("workbook has no worksheet".to_string()))?
        .map_err(|e| sheet_err(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| InputError::EmptyFile(name.to_string()))?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(InputError::NoHeaders(name.to_string()));
    }

    let mut records = Vec::new();
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_to_value).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }

        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            record.insert(header.clone(), values.get(i).cloned().unwrap_or(Value::Null));
        }
        records.push(record);
    }

    let headers = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(RecordSet::new(name, headers, records))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::Null
            } else {
                json!(s)
            }
        }
        Data::Int(i) => json!(i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => json!(b),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => json!(dt.format("%Y-%m-%d").to_string()),
            Some(dt) => json!(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => json!(cell.to_string()),
        },
        Data::DateTimeIso(s) => json!(s.replace('T', " ")),
        other => json!(other.to_string()),
    }
}

/// Load a record set from raw bytes, picking the reader from name and content.
pub fn load_record_set(name: &str, bytes: &[u8]) -> InputResult<RecordSet> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile(name.to_string()));
    }

    match detect_format(name, bytes) {
        InputFormat::Spreadsheet => parse_spreadsheet(name, bytes),
        InputFormat::Delimited => parse_delimited_auto(name, bytes),
    }
}

/// Load a record set from a file on disk.
pub fn load_record_set_file<P: AsRef<Path>>(path: P) -> InputResult<RecordSet> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    load_record_set(&name, &bytes)
}
