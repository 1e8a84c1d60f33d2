use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Content-inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// Every non-null cell parses as a number.
    Number,
    Text,
    /// No non-null cells.
    Empty,
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    cells: Vec<Option<String>>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let kind = infer_kind(&cells);
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, row: usize) -> Option<&str> {
        self.cells.get(row).and_then(|c| c.as_deref())
    }

    /// Cell parsed as a number; null and non-numeric cells give `None`.
    pub fn number(&self, row: usize) -> Option<f64> {
        self.get(row).and_then(parse_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.cells.iter().map(|c| c.as_deref())
    }

    pub fn n_unique(&self) -> usize {
        self.iter().collect::<HashSet<_>>().len()
    }

    fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            kind: self.kind,
            cells: rows.iter().map(|&r| self.cells[r].clone()).collect(),
        }
    }
}

fn infer_kind(cells: &[Option<String>]) -> ColumnKind {
    let mut kind = ColumnKind::Empty;
    for raw in cells.iter().flatten() {
        if parse_number(raw).is_none() {
            return ColumnKind::Text;
        }
        kind = ColumnKind::Number;
    }
    kind
}

/// In-memory columnar table. Every column has exactly `row_count` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        let row_count = columns.first().map_or(0, Column::len);
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        Self { columns, row_count }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[cfg(test)]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First column present among `candidates`.
    pub fn find_column<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.has_column(c))
    }

    /// New table with the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Column names reordered so the given ones come first (when present).
    pub fn ordered_columns<'a>(&'a self, priority: &[&str]) -> Vec<&'a str> {
        let mut names: Vec<&str> = priority
            .iter()
            .filter_map(|p| self.column(p).map(|c| c.name.as_str()))
            .collect();
        for c in &self.columns {
            if !names.contains(&c.name.as_str()) {
                names.push(c.name.as_str());
            }
        }
        names
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.row_count {
            wtr.write_record(self.columns.iter().map(|c| c.get(row).unwrap_or("")))?;
        }
        wtr.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Write `table` to `path` as CSV, creating parent folders as needed.
pub fn export_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    table.write_csv(std::io::BufWriter::new(file))
}

#[cfg(test)]
pub(crate) fn table_from(headers: &[&str], rows: &[&[Option<&str>]]) -> Table {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, h)| Column::new(*h, rows.iter().map(|r| r[i].map(str::to_string)).collect()))
        .collect();
    Table::new(columns)
}
