//! Spreadsheet export → ticket file.
//!
//! Accepts an Excel/OpenDocument workbook (first sheet) or a `;`- or
//! `,`-separated text export, both with a header row. Column names are
//! normalized to the canonical ticket fields, values are trimmed and Excel
//! line-break artifacts are turned into `\n`. Rows with only empty values are
//! dropped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use tracing::{debug, info};

use crate::{error::ConvertError, ticket::Ticket};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub tickets: usize,
    pub columns: Vec<String>,
    pub output: PathBuf,
}

/// How an input file is read, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Workbook,
    Delimited,
}

impl InputFormat {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Self::Workbook
        } else {
            Self::Delimited
        }
    }
}

/// Maps a raw column header onto a canonical field name.
pub fn normalize_column(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    if lower.contains("номер") || lower.contains("билет") {
        "Номер билета".into()
    } else if lower.contains("вопрос") {
        "Вопрос".into()
    } else if lower.contains("ответ") {
        "Ответ".into()
    } else {
        name.to_string()
    }
}

pub fn clean_value(raw: &str) -> String {
    raw.trim()
        .replace("_x000D_", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// `;` when the header has at least as many semicolons as commas.
pub fn detect_delimiter(header: &str) -> char {
    let semis = header.matches(';').count();
    let commas = header.matches(',').count();
    if semis > 0 && semis >= commas {
        ';'
    } else {
        ','
    }
}

/// Builds tickets from a header row and data rows. Missing trailing cells
/// count as empty.
fn tickets_from_rows<I>(header: &[String], rows: I) -> (Vec<Ticket>, Vec<String>)
where
    I: IntoIterator<Item = Vec<String>>,
{
    let columns: Vec<String> = header.iter().map(|c| normalize_column(c)).collect();
    let tickets = rows
        .into_iter()
        .filter_map(|row| {
            let mut ticket = Ticket::new();
            for (i, col) in columns.iter().enumerate() {
                let value = row.get(i).map(|v| clean_value(v)).unwrap_or_default();
                ticket.insert(col.clone(), Value::String(value));
            }
            let any = ticket
                .values()
                .any(|v| v.as_str().is_some_and(|s| !s.is_empty()));
            any.then_some(ticket)
        })
        .collect();
    (tickets, columns)
}

fn check_header(header: &[String]) -> Result<(), ConvertError> {
    if header.iter().all(|c| c.trim().is_empty()) {
        return Err(ConvertError::NoHeader);
    }
    Ok(())
}

/// Converts export text into tickets; also returns the normalized columns.
pub fn convert_text(
    text: &str,
    delimiter: Option<char>,
) -> Result<(Vec<Ticket>, Vec<String>), ConvertError> {
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text
        .split(&['\r', '\n'][..])
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or(ConvertError::NoHeader)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(header_line));
    let delimiter = u8::try_from(delimiter).map_err(|_| ConvertError::Delimiter(delimiter))?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    check_header(&header)?;

    let rows = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tickets_from_rows(&header, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // whole numbers such as ticket numbers come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Reads the first sheet of a workbook.
pub fn convert_workbook(path: &Path) -> Result<(Vec<Ticket>, Vec<String>), ConvertError> {
    let workbook_err = |source| ConvertError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConvertError::NoSheet(path.to_path_buf()))?
        .map_err(workbook_err)?;
    debug!(path = %path.display(), rows = range.height(), "read worksheet");

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows.next().ok_or(ConvertError::NoHeader)?;
    check_header(&header)?;
    Ok(tickets_from_rows(&header, rows))
}

/// Reads `input`, converts it and writes pretty JSON to `output`.
///
/// `delimiter` only applies to text exports.
pub fn convert_file(
    input: &Path,
    output: &Path,
    delimiter: Option<char>,
) -> Result<ConvertReport, ConvertError> {
    let (tickets, columns) = match InputFormat::of(input) {
        InputFormat::Workbook => convert_workbook(input)?,
        InputFormat::Delimited => {
            let text = fs::read_to_string(input).map_err(|source| ConvertError::Io {
                path: input.to_path_buf(),
                source,
            })?;
            convert_text(&text, delimiter)?
        }
    };
    let json = serde_json::to_string_pretty(&tickets)?;
    fs::write(output, json).map_err(|source| ConvertError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    info!(input = %input.display(), output = %output.display(), tickets = tickets.len(), "converted");
    Ok(ConvertReport {
        tickets: tickets.len(),
        columns,
        output: output.to_path_buf(),
    })
}
