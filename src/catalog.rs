use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{DashError, Result};
use crate::models::{DateKey, DayEntry, FileCategory};
use crate::resolver::resolve;

/// Days of one month that have at least one usable export.
#[derive(Debug, Clone, Default)]
pub struct DayCatalog {
    pub year: i32,
    pub month: u32,
    days: HashMap<u32, DayEntry>,
}

impl DayCatalog {
    pub fn get(&self, day: u32) -> Option<&DayEntry> {
        self.days.get(&day)
    }

    pub fn contains(&self, day: u32) -> bool {
        self.days.contains_key(&day)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Entries ordered by day of month.
    pub fn sorted(&self) -> Vec<&DayEntry> {
        let mut entries: Vec<&DayEntry> = self.days.values().collect();
        entries.sort_by_key(|e| e.date.day);
        entries
    }
}

fn is_numeric_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Ordering between folders naming the same day: the zero-padded name
/// first, then the lexically smallest.
fn folder_rank(name: &str, day: u32) -> (bool, String) {
    (name != format!("{day:02}"), name.to_string())
}

/// Scan `{base}/{year}/{month:02}` for day folders. A missing month folder
/// yields an empty catalog.
pub fn scan(base: &Path, year: i32, month: u32) -> Result<DayCatalog> {
    let month_dir = DateKey::month_dir(base, year, month);
    let mut catalog = DayCatalog {
        year,
        month,
        days: HashMap::new(),
    };

    let entries = match std::fs::read_dir(&month_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(dir = %month_dir.display(), "month folder not found");
            return Ok(catalog);
        }
        Err(e) => return Err(DashError::access(month_dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| DashError::access(&month_dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_numeric_name(&name) || !path.is_dir() {
            continue;
        }
        let Ok(day) = name.parse::<u32>() else {
            continue;
        };
        let Ok(date) = DateKey::new(year, month, day) else {
            debug!(folder = %path.display(), "skipping folder that is not a calendar day");
            continue;
        };

        let day_entry = DayEntry {
            date,
            reconciled: resolve(&path, &date, FileCategory::Reconciled)?,
            driver_incident: resolve(&path, &date, FileCategory::DriverIncident)?,
            folder: path,
        };
        if !day_entry.has_any() {
            continue;
        }
        match catalog.days.get(&day) {
            Some(existing) => {
                let existing_name = existing
                    .folder
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let keep_new = folder_rank(&name, day) < folder_rank(&existing_name, day);
                let (kept, dropped) = if keep_new { (&name, &existing_name) } else { (&existing_name, &name) };
                warn!(day, kept = %kept, ignored = %dropped, "two folders for the same day");
                if keep_new {
                    catalog.days.insert(day, day_entry);
                }
            }
            None => {
                catalog.days.insert(day, day_entry);
            }
        }
    }

    info!(year, month, days = catalog.len(), "scanned month");
    Ok(catalog)
}

fn numeric_subdirs(dir: &Path) -> Result<Vec<u32>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DashError::access(dir, e)),
    };
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DashError::access(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_numeric_name(&name) && entry.path().is_dir() {
            if let Ok(n) = name.parse() {
                found.push(n);
            }
        }
    }
    found.sort_unstable();
    found.dedup();
    Ok(found)
}

/// Year folders under the export root, ascending.
pub fn available_years(base: &Path) -> Result<Vec<i32>> {
    Ok(numeric_subdirs(base)?
        .into_iter()
        .filter_map(|y| i32::try_from(y).ok())
        .collect())
}

/// Month folders (1-12) under a year folder, ascending.
pub fn available_months(base: &Path, year: i32) -> Result<Vec<u32>> {
    Ok(numeric_subdirs(&base.join(year.to_string()))?
        .into_iter()
        .filter(|m| (1..=12).contains(m))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn day_dir(base: &Path, day: &str) -> PathBuf {
        let dir = base.join("2025").join("07").join(day);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "ORDER_ID\n1\n").unwrap();
    }

    #[test]
    fn test_month_scenario() {
        let base = tempfile::tempdir().unwrap();
        let d1 = day_dir(base.path(), "01");
        touch(&d1, "pvi_transaction_reconciled_20250701.csv");
        touch(&d1, "pvi_transaction_reconciled_20250701_2.csv");
        let d2 = day_dir(base.path(), "02");
        touch(&d2, "pvi_transaction_reconciled_20250702.csv");
        day_dir(base.path(), "03");

        let catalog = scan(base.path(), 2025, 7).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(1));
        assert!(catalog.contains(2));
        assert!(!catalog.contains(3));
        assert!(catalog.get(1).unwrap().has_revised());
        assert!(!catalog.get(2).unwrap().has_revised());
    }

    #[test]
    fn test_driver_incident_only_day_is_included() {
        let base = tempfile::tempdir().unwrap();
        let d = day_dir(base.path(), "05");
        touch(&d, "pvi_transaction_reconciled_taixe_20250705.csv");
        let catalog = scan(base.path(), 2025, 7).unwrap();
        let entry = catalog.get(5).unwrap();
        assert!(entry.reconciled.is_none());
        assert!(entry.has(FileCategory::DriverIncident));
    }

    #[test]
    fn test_non_numeric_and_invalid_days_are_ignored() {
        let base = tempfile::tempdir().unwrap();
        let odd = day_dir(base.path(), "backup");
        touch(&odd, "pvi_transaction_reconciled_20250701.csv");
        day_dir(base.path(), "32");
        day_dir(base.path(), "1a");
        std::fs::write(base.path().join("2025").join("07").join("04"), "not a dir").unwrap();
        let catalog = scan(base.path(), 2025, 7).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_unpadded_day_folder_uses_padded_filename() {
        let base = tempfile::tempdir().unwrap();
        let d = day_dir(base.path(), "7");
        touch(&d, "pvi_transaction_reconciled_20250707.csv");
        let catalog = scan(base.path(), 2025, 7).unwrap();
        assert!(catalog.contains(7));
    }

    #[test]
    fn test_padded_folder_wins_over_unpadded_duplicate() {
        let base = tempfile::tempdir().unwrap();
        let short = day_dir(base.path(), "7");
        touch(&short, "pvi_transaction_reconciled_20250707.csv");
        let padded = day_dir(base.path(), "07");
        touch(&padded, "pvi_transaction_reconciled_20250707_2.csv");
        let triple = day_dir(base.path(), "007");
        touch(&triple, "pvi_transaction_reconciled_20250707.csv");

        for _ in 0..3 {
            let catalog = scan(base.path(), 2025, 7).unwrap();
            assert_eq!(catalog.len(), 1);
            let entry = catalog.get(7).unwrap();
            assert!(entry.folder.ends_with("07"));
            assert!(entry.has_revised());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_candidate_fails_the_scan() {
        let base = tempfile::tempdir().unwrap();
        let d = day_dir(base.path(), "01");
        touch(&d, "pvi_transaction_reconciled_20250701.csv");
        // A self-referencing link cannot be stat'ed, even with elevated privileges.
        let looped = d.join("pvi_transaction_reconciled_20250701_2.csv");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        match scan(base.path(), 2025, 7) {
            Err(DashError::Access { path, .. }) => assert_eq!(path, looped),
            other => panic!("expected an access error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_month_is_empty() {
        let base = tempfile::tempdir().unwrap();
        let catalog = scan(base.path(), 2024, 1).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_sorted_by_day() {
        let base = tempfile::tempdir().unwrap();
        for day in ["15", "03", "09"] {
            let d = day_dir(base.path(), day);
            touch(&d, &format!("pvi_transaction_reconciled_202507{day}.csv"));
        }
        let catalog = scan(base.path(), 2025, 7).unwrap();
        let days: Vec<u32> = catalog.sorted().iter().map(|e| e.date.day).collect();
        assert_eq!(days, vec![3, 9, 15]);
    }

    #[test]
    fn test_rescan_sees_new_files() {
        let base = tempfile::tempdir().unwrap();
        let d = day_dir(base.path(), "01");
        assert!(scan(base.path(), 2025, 7).unwrap().is_empty());
        touch(&d, "pvi_transaction_reconciled_20250701.csv");
        assert_eq!(scan(base.path(), 2025, 7).unwrap().len(), 1);
    }

    #[test]
    fn test_available_years_and_months() {
        let base = tempfile::tempdir().unwrap();
        day_dir(base.path(), "01");
        std::fs::create_dir_all(base.path().join("2024").join("12")).unwrap();
        std::fs::create_dir_all(base.path().join("2025").join("13")).unwrap();
        std::fs::create_dir_all(base.path().join("archive")).unwrap();
        assert_eq!(available_years(base.path()).unwrap(), vec![2024, 2025]);
        assert_eq!(available_months(base.path(), 2025).unwrap(), vec![7]);
        assert!(available_months(base.path(), 2023).unwrap().is_empty());
    }
}
