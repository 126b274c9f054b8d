use std::collections::BTreeSet;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::moodle::tools::error::{Result, ToolError};

/// In-memory table where every cell is read as a string.
///
/// Rows shorter than the header are padded with empty cells so that every
/// row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width.max(row.len()), String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ToolError::MissingColumn(name.to_string()))
    }

    /// Cells of the column `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Sorted, de-duplicated non-empty values of the column `name`.
    ///
    /// Values are kept verbatim, surrounding whitespace included.
    pub fn distinct_values(&self, name: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .column(name)?
            .into_iter()
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Loads a table from `path`, choosing the reader from the file extension.
///
/// `.xlsx` and `.xlsm` files are read with calamine (first worksheet, first
/// row as header); anything else is parsed as comma separated text.
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => read_excel(path),
        _ => read_csv(path, b','),
    }
}

/// Reads a delimited text file with a header row.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(columns, rows))
}

/// Reads the first worksheet of an Excel workbook.
pub fn read_excel(path: &Path) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ToolError::InvalidTable(format!("{} has no worksheet", path.display())))?
        .map_err(ToolError::from)?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|cell| cell_to_string(Some(cell))).collect(),
        None => return Ok(Table::default()),
    };

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(|cell| cell_to_string(Some(cell))).collect())
        .collect();

    Ok(Table::new(columns, rows))
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
