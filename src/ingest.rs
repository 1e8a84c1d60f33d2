use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::table::{Column, Table};

/// Cell tokens read as null.
const NULL_TOKENS: &[&str] = &["", "NULL", "null"];

/// Result of reading one export file.
#[derive(Debug, Clone, Default)]
pub struct Ingest {
    pub table: Table,
    /// Rows dropped because their field count did not match the header.
    pub skipped_rows: usize,
    /// Set when the file could not be read at all; `table` is then empty.
    pub failure: Option<String>,
}

fn to_cell(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    if NULL_TOKENS.contains(&text.as_ref()) {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Make header names unique: the second `X` becomes `X_duplicated_0`, and so on.
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());
    for name in raw {
        let dupes = seen.entry(name.clone()).or_insert(0);
        if *dupes == 0 {
            names.push(name);
        } else {
            names.push(format!("{name}_duplicated_{}", *dupes - 1));
        }
        *dupes += 1;
    }
    names
}

/// Read a CSV export into a table, skipping rows whose field count does not
/// match the header. Fails only when the file itself cannot be read.
pub fn read_table(path: &Path) -> Result<Ingest> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(std::io::BufReader::new(file));

    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let name = String::from_utf8_lossy(h).into_owned();
            if i == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name
            }
        })
        .collect();
    let headers = unique_headers(headers);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut skipped_rows = 0usize;
    let mut record = csv::ByteRecord::new();

    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                for (col, raw) in cells.iter_mut().zip(record.iter()) {
                    col.push(to_cell(raw));
                }
            }
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped_rows += 1;
                debug!(
                    line = e.position().map(|p| p.line()),
                    error = %e,
                    "skipping malformed row"
                );
            }
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(cells)
        .map(|(name, col)| Column::new(name, col))
        .collect();
    let table = Table::new(columns);

    if skipped_rows > 0 {
        warn!(path = %path.display(), skipped_rows, "skipped malformed rows");
    }
    info!(path = %path.display(), rows = table.row_count(), columns = table.width(), "loaded export");

    Ok(Ingest {
        table,
        skipped_rows,
        failure: None,
    })
}

/// Like [`read_table`], but never fails: an unreadable file yields an empty
/// table with the reason in `failure`.
pub fn load(path: &Path) -> Ingest {
    match read_table(path) {
        Ok(ingest) => ingest,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load export");
            Ingest {
                table: Table::empty(),
                skipped_rows: 0,
                failure: Some(format!("{}: {e}", path.display())),
            }
        }
    }
}
