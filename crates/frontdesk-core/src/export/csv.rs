//! History export for spreadsheet tooling.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::PatientRecord;

/// Fixed export header.
pub const CSV_HEADER: [&str; 12] = [
    "Reference ID",
    "Token",
    "Name",
    "Contact",
    "Age",
    "Gender",
    "Status",
    "Payment",
    "Dept",
    "Reason",
    "Ultrasound",
    "Timestamp",
];

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No records to export")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Render records as CSV, one row per record in the given order.
///
/// Rows are separated by `\n` with no trailing newline. Name and reason are
/// always quoted; other fields only when they need it.
pub fn export_csv<'a>(records: impl IntoIterator<Item = &'a PatientRecord>) -> ExportResult<String> {
    let mut lines = vec![CSV_HEADER.join(",")];
    lines.extend(records.into_iter().map(csv_row));

    if lines.len() == 1 {
        return Err(ExportError::Empty);
    }
    Ok(lines.join("\n"))
}

/// Export file name for a given day.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("IBNE_HOSPITAL_LOG_{}.csv", date.format("%Y-%m-%d"))
}

/// Write the export into `dir` and return the file path.
pub fn export_csv_file<'a>(
    dir: &Path,
    records: impl IntoIterator<Item = &'a PatientRecord>,
    date: NaiveDate,
) -> ExportResult<PathBuf> {
    let csv = export_csv(records)?;
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, csv)?;
    tracing::info!(path = %path.display(), "Exported history");
    Ok(path)
}

fn csv_row(r: &PatientRecord) -> String {
    let contact = if r.contact_number.trim().is_empty() {
        "N/A"
    } else {
        r.contact_number.as_str()
    };

    [
        escape_csv(&r.id),
        escape_csv(&r.token_number),
        quote_csv(&r.name),
        escape_csv(contact),
        escape_csv(&r.age),
        r.gender.as_str().to_string(),
        r.marital_status.as_str().to_string(),
        r.payment_status.as_str().to_string(),
        r.department.as_str().to_string(),
        quote_csv(&r.reason_for_visit),
        if r.needs_ultrasound { "YES" } else { "NO" }.to_string(),
        escape_csv(&r.timestamp),
    ]
    .join(",")
}

/// Always quote, doubling internal quotes.
fn quote_csv(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote only when the value contains a delimiter, quote or newline.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        quote_csv(s)
    } else {
        s.to_string()
    }
}
