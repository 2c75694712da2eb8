mod delimited;
mod pdf;
mod xlsx;

use crate::models::KpiRecord;
use std::str::FromStr;
use thiserror::Error;

pub const HEADERS: [&str; 9] = [
    "Year",
    "Month",
    "Buyer",
    "Category",
    "Sales Target",
    "Sales Actual",
    "GP Target",
    "GP Actual",
    "Notes",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}' (expected xlsx, csv or pdf)")]
    UnknownFormat(String),
    #[error("failed to build workbook: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnknownFormat(value.to_string())),
        }
    }
}

pub fn file_name(year: i32, month: &str, format: ExportFormat) -> String {
    format!("kpi-{year}-{month}.{}", format.extension())
}

pub fn sheet_name(year: i32, month: &str) -> String {
    format!("{year}-{month}")
}

/// Renders the period's records in subset order. An empty subset still
/// produces a complete file with only the header row.
pub fn export(
    format: ExportFormat,
    rows: &[&KpiRecord],
    year: i32,
    month: &str,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Xlsx => xlsx::write_workbook(&sheet_name(year, month), rows),
        ExportFormat::Csv => delimited::write_csv(rows),
        ExportFormat::Pdf => Ok(pdf::write_report(
            &format!("KPI Report {year}/{month}"),
            rows,
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cell<'a> {
    Number(f64),
    Text(&'a str),
}

impl Cell<'_> {
    pub(crate) fn to_text(self) -> String {
        match self {
            Cell::Number(value) => format_number(value),
            Cell::Text(text) => text.to_string(),
        }
    }
}

pub(crate) fn record_cells(record: &KpiRecord) -> [Cell<'_>; 9] {
    [
        Cell::Number(f64::from(record.year)),
        Cell::Text(&record.month),
        Cell::Text(&record.buyer),
        Cell::Text(&record.category),
        Cell::Number(record.sales_target),
        Cell::Number(record.sales_actual),
        Cell::Number(record.gp_target),
        Cell::Number(record.gp_actual),
        Cell::Text(&record.notes),
    ]
}

/// Whole numbers print without a fractional part.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
