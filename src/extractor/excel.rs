// file: src/extractor/excel.rs
// description: XLSX extraction of the first worksheet with configurable rendering
// reference: https://docs.rs/calamine

use super::{ExtractedText, FileKind};
use crate::error::{PipelineError, Result};
use calamine::{Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// How a worksheet is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcelLayout {
    /// Header plus index-labelled, right-aligned rows.
    #[default]
    Table,
    /// Each column's values joined by spaces.
    Columns,
    /// One `{'header': value, ...}` line per data row.
    Records,
}

/// First worksheet split into its header row and data rows.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

static EMPTY_CELL: Data = Data::Empty;

impl Sheet {
    fn cell(&self, row: usize, column: usize) -> &Data {
        self.rows[row].get(column).unwrap_or(&EMPTY_CELL)
    }

    fn column(&self, column: usize) -> impl Iterator<Item = &Data> {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }

    /// A numeric column with a gap or a fractional value becomes a float
    /// column, and every number in it prints with a decimal point.
    fn is_float_column(&self, column: usize) -> bool {
        let mut float = false;
        for cell in self.column(column) {
            match cell {
                Data::Empty => float = true,
                Data::Int(_) => {}
                Data::Float(f) => float |= f.fract() != 0.0,
                _ => return false,
            }
        }
        float
    }
}

fn number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

/// Python's `str()` of a float: shortest form, always with a fraction.
fn python_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Decimal places shared by every value of a float column in the table
/// layout, between 1 and 6.
fn column_precision(sheet: &Sheet, column: usize) -> usize {
    sheet
        .column(column)
        .filter_map(number)
        .map(|v| {
            let repr = v.to_string();
            repr.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
        .clamp(1, 6)
}

/// Cell text for the columns and records layouts.
fn plain_value(cell: &Data, float_column: bool) -> String {
    match number(cell) {
        Some(v) if float_column => python_float(v),
        _ => cell.to_string(),
    }
}

pub fn extract(bytes: &[u8], layout: ExcelLayout) -> Result<ExtractedText> {
    let sheet = read_first_sheet(bytes)?;
    debug!(
        "Read worksheet with {} columns and {} rows",
        sheet.headers.len(),
        sheet.rows.len()
    );

    let extracted = match layout {
        ExcelLayout::Table => ExtractedText::whole(FileKind::Xlsx, render_table(&sheet)),
        ExcelLayout::Columns => ExtractedText::whole(FileKind::Xlsx, render_columns(&sheet)),
        ExcelLayout::Records => {
            let segments = render_records(&sheet);
            ExtractedText {
                kind: FileKind::Xlsx,
                text: segments.join("\n"),
                segments,
            }
        }
    };

    Ok(extracted)
}

pub fn read_first_sheet(bytes: &[u8]) -> Result<Sheet> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Extraction(format!("Failed to open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Extraction("Workbook has no worksheets".to_string()))?
        .map_err(|e| PipelineError::Extraction(format!("Failed to read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(Sheet::default()),
    };

    Ok(Sheet {
        headers,
        rows: rows.map(|row| row.to_vec()).collect(),
    })
}

fn table_cell(cell: &Data, precision: Option<usize>) -> String {
    match (cell, number(cell), precision) {
        (Data::Empty, _, _) => "NaN".to_string(),
        (_, Some(v), Some(precision)) => format!("{:.*}", precision, v),
        (other, _, _) => other.to_string(),
    }
}

pub fn render_table(sheet: &Sheet) -> String {
    if sheet.headers.is_empty() {
        return String::new();
    }

    let precisions: Vec<Option<usize>> = (0..sheet.headers.len())
        .map(|c| sheet.is_float_column(c).then(|| column_precision(sheet, c)))
        .collect();
    let cells: Vec<Vec<String>> = (0..sheet.rows.len())
        .map(|r| {
            (0..sheet.headers.len())
                .map(|c| table_cell(sheet.cell(r, c), precisions[c]))
                .collect()
        })
        .collect();

    let index_width = sheet.rows.len().saturating_sub(1).to_string().len();
    let widths: Vec<usize> = sheet
        .headers
        .iter()
        .enumerate()
        .map(|(c, header)| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(cells.len() + 1);

    let mut header_line = " ".repeat(index_width);
    for (header, width) in sheet.headers.iter().zip(&widths) {
        header_line.push_str(&format!("  {:>width$}", header, width = *width));
    }
    lines.push(header_line);

    for (index, row) in cells.iter().enumerate() {
        let mut line = format!("{:<width$}", index, width = index_width);
        for (value, width) in row.iter().zip(&widths) {
            line.push_str(&format!("  {:>width$}", value, width = *width));
        }
        lines.push(line);
    }

    lines.join("\n")
}

pub fn render_columns(sheet: &Sheet) -> String {
    (0..sheet.headers.len())
        .map(|c| {
            let float_column = sheet.is_float_column(c);
            sheet
                .column(c)
                .filter(|cell| !matches!(cell, Data::Empty))
                .map(|cell| plain_value(cell, float_column))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|column| !column.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn record_value(cell: &Data, float_column: bool) -> String {
    match cell {
        Data::Empty => "nan".to_string(),
        Data::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => plain_value(other, float_column),
    }
}

pub fn render_records(sheet: &Sheet) -> Vec<String> {
    let float_columns: Vec<bool> = (0..sheet.headers.len())
        .map(|c| sheet.is_float_column(c))
        .collect();
    (0..sheet.rows.len())
        .map(|r| {
            let fields = sheet
                .headers
                .iter()
                .enumerate()
                .map(|(c, header)| {
                    format!(
                        "'{}': {}",
                        header.replace('\'', "\\'"),
                        record_value(sheet.cell(r, c), float_columns[c])
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", fields)
        })
        .collect()
}
