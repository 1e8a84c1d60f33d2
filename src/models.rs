use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{DashError, Result};

/// Logical kind of daily export. Each kind has its own filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileCategory {
    Reconciled,
    DriverIncident,
}

impl FileCategory {
    pub const ALL: [FileCategory; 2] = [FileCategory::Reconciled, FileCategory::DriverIncident];

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Reconciled => "pvi_transaction_reconciled_",
            Self::DriverIncident => "pvi_transaction_reconciled_taixe_",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Reconciled => "reconciled",
            Self::DriverIncident => "taixe",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Reconciled => "Reconciliation",
            Self::DriverIncident => "Driver incidents",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|c| c.key().eq_ignore_ascii_case(key.trim()))
            .copied()
            .ok_or_else(|| DashError::UnknownCategory(key.to_string()))
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A validated calendar date used to locate a day's exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DateKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateKey {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) || NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(DashError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")));
        }
        Ok(Self { year, month, day })
    }

    /// `YYYYMMDD`, the form embedded in export filenames.
    pub fn compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    pub fn parse_compact(raw: &str) -> Option<Self> {
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = raw[0..4].parse().ok()?;
        let month = raw[4..6].parse().ok()?;
        let day = raw[6..8].parse().ok()?;
        Self::new(year, month, day).ok()
    }

    /// Accepts `YYYYMMDD` or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(key) = Self::parse_compact(raw) {
            return Ok(key);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| DashError::InvalidDate(raw.to_string()))
            .and_then(|d| Self::new(d.year(), d.month(), d.day()))
    }

    pub fn month_dir(base: &Path, year: i32, month: u32) -> PathBuf {
        base.join(year.to_string()).join(format!("{month:02}"))
    }

    pub fn day_dir(&self, base: &Path) -> PathBuf {
        Self::month_dir(base, self.year, self.month).join(format!("{:02}", self.day))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

/// The file chosen for one (folder, date, category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub is_revised: bool,
}

impl ResolvedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// One day folder with at least one usable export.
#[derive(Debug, Clone, Serialize)]
pub struct DayEntry {
    pub date: DateKey,
    pub folder: PathBuf,
    pub reconciled: Option<ResolvedFile>,
    pub driver_incident: Option<ResolvedFile>,
}

impl DayEntry {
    pub fn file(&self, category: FileCategory) -> Option<&ResolvedFile> {
        match category {
            FileCategory::Reconciled => self.reconciled.as_ref(),
            FileCategory::DriverIncident => self.driver_incident.as_ref(),
        }
    }

    pub fn has(&self, category: FileCategory) -> bool {
        self.file(category).is_some()
    }

    pub fn has_any(&self) -> bool {
        FileCategory::ALL.iter().any(|c| self.has(*c))
    }

    pub fn has_revised(&self) -> bool {
        self.reconciled.as_ref().is_some_and(|f| f.is_revised)
    }
}
