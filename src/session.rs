use std::path::PathBuf;

use tracing::{info, warn};

use crate::aggregate::{filter_equals, filter_matching, MatchKind};
use crate::catalog::{scan, DayCatalog};
use crate::error::{DashError, Result};
use crate::ingest::load;
use crate::models::{DateKey, DayEntry, FileCategory, ResolvedFile};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file: ResolvedFile,
    pub table: Table,
    pub skipped_rows: usize,
}

/// Tables loaded for the selected day.
#[derive(Debug, Clone)]
pub struct LoadedDay {
    pub date: DateKey,
    pub reconciled: Option<LoadedFile>,
    pub driver_incident: Option<LoadedFile>,
    /// Files that resolved but could not be read.
    pub warnings: Vec<String>,
}

impl LoadedDay {
    pub fn file(&self, category: FileCategory) -> Option<&LoadedFile> {
        match category {
            FileCategory::Reconciled => self.reconciled.as_ref(),
            FileCategory::DriverIncident => self.driver_incident.as_ref(),
        }
    }

    pub fn table(&self, category: FileCategory) -> Option<&Table> {
        self.file(category).map(|f| &f.table)
    }
}

/// How drill-down rows were picked.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Equals(Option<String>),
    Matching { pattern: String, kind: MatchKind },
}

#[derive(Debug, Clone)]
pub struct DrillDown {
    pub category: FileCategory,
    pub column: String,
    pub selector: Selector,
    pub rows: Table,
}

/// Load every resolved file of `entry`. Fails only when nothing could be read.
pub fn load_day(entry: &DayEntry) -> Result<LoadedDay> {
    let mut day = LoadedDay {
        date: entry.date,
        reconciled: None,
        driver_incident: None,
        warnings: Vec::new(),
    };

    for category in FileCategory::ALL {
        let Some(file) = entry.file(category) else {
            continue;
        };
        let ingest = load(&file.path);
        if let Some(reason) = ingest.failure {
            day.warnings.push(reason);
            continue;
        }
        let loaded = LoadedFile {
            file: file.clone(),
            table: ingest.table,
            skipped_rows: ingest.skipped_rows,
        };
        match category {
            FileCategory::Reconciled => day.reconciled = Some(loaded),
            FileCategory::DriverIncident => day.driver_incident = Some(loaded),
        }
    }

    if day.reconciled.is_none() && day.driver_incident.is_none() {
        return Err(DashError::NoData(format!(
            "no export could be read for {}: {}",
            entry.date,
            day.warnings.join("; ")
        )));
    }
    Ok(day)
}

/// Current view state: one month catalog, at most one loaded day, and at
/// most one open drill-down on that day.
#[derive(Debug)]
pub struct Session {
    base: PathBuf,
    catalog: Option<DayCatalog>,
    day: Option<LoadedDay>,
    drill: Option<DrillDown>,
}

impl Session {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            catalog: None,
            day: None,
            drill: None,
        }
    }

    #[cfg(test)]
    pub fn catalog(&self) -> Option<&DayCatalog> {
        self.catalog.as_ref()
    }

    pub fn day(&self) -> Option<&LoadedDay> {
        self.day.as_ref()
    }

    #[cfg(test)]
    pub fn drill(&self) -> Option<&DrillDown> {
        self.drill.as_ref()
    }

    /// Rescan a month. On failure the previous catalog stays in place.
    pub fn refresh(&mut self, year: i32, month: u32) -> Result<&DayCatalog> {
        let catalog = scan(&self.base, year, month)?;
        Ok(self.catalog.insert(catalog))
    }

    /// Load a day of the current catalog, replacing the previous day and
    /// closing any drill-down. On failure nothing changes.
    pub fn select_day(&mut self, day: u32) -> Result<&LoadedDay> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| DashError::NoData("no month has been scanned".to_string()))?;
        let entry = catalog.get(day).ok_or_else(|| {
            DashError::NoData(format!(
                "no exports for day {day:02} of {:02}/{}",
                catalog.month, catalog.year
            ))
        })?;

        let loaded = load_day(entry)?;
        for w in &loaded.warnings {
            warn!("{w}");
        }
        info!(date = %loaded.date, "selected day");
        self.close_drill_down();
        Ok(self.day.insert(loaded))
    }

    /// Open a drill-down on the loaded day, replacing any open one.
    pub fn drill_down(&mut self, category: FileCategory, column: &str, selector: Selector) -> Result<&DrillDown> {
        let day = self
            .day
            .as_ref()
            .ok_or_else(|| DashError::NoData("no day is loaded".to_string()))?;
        let table = day.table(category).ok_or_else(|| {
            DashError::NoData(format!("no {} export for {}", category.label(), day.date))
        })?;
        if !table.has_column(column) {
            return Err(DashError::NoData(format!("column {column} not found")));
        }

        let rows = match &selector {
            Selector::Equals(value) => filter_equals(table, column, value.as_deref()),
            Selector::Matching { pattern, kind } => filter_matching(table, column, pattern, *kind)?,
        };
        Ok(self.drill.insert(DrillDown {
            category,
            column: column.to_string(),
            selector,
            rows,
        }))
    }

    pub fn close_drill_down(&mut self) {
        self.drill = None;
    }
}
