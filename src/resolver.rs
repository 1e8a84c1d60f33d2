use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{DashError, Result};
use crate::models::{DateKey, FileCategory, ResolvedFile};

/// Filename suffixes in priority order. The first one present on disk wins.
const CANDIDATE_SUFFIXES: &[(&str, bool)] = &[("_2", true), ("", false)];

pub fn candidate_name(category: FileCategory, date: &DateKey, suffix: &str) -> String {
    format!("{}{}{}.csv", category.prefix(), date.compact(), suffix)
}

/// Candidate filenames for a date, most preferred first.
pub fn candidate_names(category: FileCategory, date: &DateKey) -> Vec<String> {
    CANDIDATE_SUFFIXES
        .iter()
        .map(|(suffix, _)| candidate_name(category, date, suffix))
        .collect()
}

/// Pick the export for `date` in `folder`: the revised `_2` file if present,
/// else the base file. `Ok(None)` means neither exists.
pub fn resolve(folder: &Path, date: &DateKey, category: FileCategory) -> Result<Option<ResolvedFile>> {
    for (suffix, is_revised) in CANDIDATE_SUFFIXES {
        let path = folder.join(candidate_name(category, date, suffix));
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                debug!(path = %path.display(), is_revised, "resolved export file");
                return Ok(Some(ResolvedFile {
                    path,
                    size_bytes: meta.len(),
                    is_revised: *is_revised,
                }));
            }
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(DashError::access(path, e)),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> DateKey {
        DateKey::new(2025, 7, 1).unwrap()
    }

    fn touch(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_revised_wins_when_both_exist() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "pvi_transaction_reconciled_20250701.csv", "a\n1\n");
        touch(dir.path(), "pvi_transaction_reconciled_20250701_2.csv", "a\n1\n2\n");
        let found = resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().unwrap();
        assert!(found.is_revised);
        assert_eq!(found.file_name(), "pvi_transaction_reconciled_20250701_2.csv");
        assert_eq!(found.size_bytes, 6);
    }

    #[test]
    fn test_base_when_only_base_exists() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "pvi_transaction_reconciled_20250701.csv", "a\n");
        let found = resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().unwrap();
        assert!(!found.is_revised);
        assert_eq!(found.file_name(), "pvi_transaction_reconciled_20250701.csv");
    }

    #[test]
    fn test_absent_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().is_none());
        let missing = dir.path().join("nope");
        assert!(resolve(&missing, &date(), FileCategory::Reconciled).unwrap().is_none());
    }

    #[test]
    fn test_categories_do_not_cross_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "pvi_transaction_reconciled_taixe_20250701.csv", "a\n");
        assert!(resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().is_none());
        let found = resolve(dir.path(), &date(), FileCategory::DriverIncident).unwrap().unwrap();
        assert!(!found.is_revised);
    }

    #[test]
    fn test_no_partial_or_case_folded_matches() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "pvi_transaction_reconciled_20250701_3.csv", "a\n");
        touch(dir.path(), "pvi_transaction_reconciled_20250701.CSV.bak", "a\n");
        touch(dir.path(), "pvi_transaction_reconciled_20250702.csv", "a\n");
        assert!(resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().is_none());
    }

    #[test]
    fn test_directory_with_candidate_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pvi_transaction_reconciled_20250701_2.csv")).unwrap();
        touch(dir.path(), "pvi_transaction_reconciled_20250701.csv", "a\n");
        let found = resolve(dir.path(), &date(), FileCategory::Reconciled).unwrap().unwrap();
        assert!(!found.is_revised);
    }

    #[test]
    fn test_candidate_names_in_priority_order() {
        let names = candidate_names(FileCategory::DriverIncident, &date());
        assert_eq!(
            names,
            vec![
                "pvi_transaction_reconciled_taixe_20250701_2.csv".to_string(),
                "pvi_transaction_reconciled_taixe_20250701.csv".to_string(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_error_is_distinct_from_absence() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("01");
        std::fs::create_dir(&locked).unwrap();
        touch(&locked, "pvi_transaction_reconciled_20250701.csv", "a\n");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass directory permissions; nothing to assert then.
        let bypassed = std::fs::metadata(locked.join("x")).map_or_else(
            |e| e.kind() == ErrorKind::NotFound,
            |_| true,
        );
        let result = resolve(&locked, &date(), FileCategory::Reconciled);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if bypassed {
            return;
        }
        let err = result.unwrap_err();
        assert!(matches!(err, DashError::Access { .. }), "got: {err}");
    }
}
