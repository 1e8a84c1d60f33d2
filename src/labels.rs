//! Display mappings for the categorical columns of an export.
//!
//! Each mapping is total: raw values outside the known set land in an explicit
//! variant so callers can tell "unmapped" apart from a known status.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceType {
    Normal,
    Express,
    Unknown,
    Other(String),
}

impl ServiceType {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Unknown
        } else if trimmed.eq_ignore_ascii_case("normal") {
            Self::Normal
        } else if trimmed.eq_ignore_ascii_case("express") {
            Self::Express
        } else {
            Self::Other(raw.to_string())
        }
    }

    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Self::Normal => Cow::Borrowed("Ride (Normal)"),
            Self::Express => Cow::Borrowed("Express"),
            Self::Unknown => Cow::Borrowed("Unknown"),
            Self::Other(raw) => Cow::Borrowed(raw.as_str()),
        }
    }
}

/// Display label for a raw `SERVICE_TYPE` cell.
pub fn service_label(raw: Option<&str>) -> String {
    ServiceType::from_raw(raw).label().into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    Match,
    /// In PVI only.
    NotFoundInM,
    /// In GSM only.
    NotFoundInExternal,
    Completed,
    Cancelled,
    Pending,
    Unmapped(String),
}

impl ReconcileStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "match" => Self::Match,
            "not_found_in_m" => Self::NotFoundInM,
            "not_found_in_external" => Self::NotFoundInExternal,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "pending" => Self::Pending,
            other => Self::Unmapped(other.to_string()),
        }
    }

    pub fn description(&self) -> Cow<'_, str> {
        match self {
            Self::Match => Cow::Borrowed("Matched (GSM + PVI)"),
            Self::NotFoundInM => Cow::Borrowed("PVI only (missing in GSM)"),
            Self::NotFoundInExternal => Cow::Borrowed("GSM only (missing in PVI)"),
            Self::Completed => Cow::Borrowed("Completed"),
            Self::Cancelled => Cow::Borrowed("Cancelled"),
            Self::Pending => Cow::Borrowed("Pending"),
            Self::Unmapped(raw) => Cow::Borrowed(raw.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsuranceStatus {
    Completed,
    Cancelled,
    Pending,
    Failed,
    Unmapped(String),
}

impl InsuranceStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            other => Self::Unmapped(other.to_string()),
        }
    }

    pub fn description(&self) -> Cow<'_, str> {
        match self {
            Self::Completed => Cow::Borrowed("Insured"),
            Self::Cancelled => Cow::Borrowed("Insurance cancelled"),
            Self::Pending => Cow::Borrowed("Insurance pending"),
            Self::Failed => Cow::Borrowed("Insurance failed"),
            Self::Unmapped(raw) => Cow::Borrowed(raw.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessFlag {
    Business,
    NonBusiness,
    Unknown(Option<String>),
}

impl BusinessFlag {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("true" | "1" | "yes") => Self::Business,
            Some("false" | "0" | "no") => Self::NonBusiness,
            _ => Self::Unknown(raw.map(str::to_string)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Business => "Business Orders".to_string(),
            Self::NonBusiness => "Non-Business Orders".to_string(),
            Self::Unknown(Some(raw)) => format!("Unknown ({raw})"),
            Self::Unknown(None) => "Unknown (null)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_case_insensitive() {
        let labels: Vec<String> = ["Normal", "NORMAL", "normal", " normal "]
            .iter()
            .map(|r| service_label(Some(r)))
            .collect();
        assert!(labels.iter().all(|l| l == "Ride (Normal)"));
        assert_eq!(service_label(Some("eXpReSs")), "Express");
    }

    #[test]
    fn test_service_type_unknown_and_passthrough() {
        assert_eq!(service_label(None), "Unknown");
        assert_eq!(service_label(Some("")), "Unknown");
        assert_eq!(service_label(Some("bike_delivery")), "bike_delivery");
        assert_eq!(
            ServiceType::from_raw(Some("bike_delivery")),
            ServiceType::Other("bike_delivery".to_string())
        );
    }

    #[test]
    fn test_service_type_idempotent() {
        for raw in ["normal", "Express", "", "food", "Ride (Normal)", "Unknown"] {
            let once = service_label(Some(raw));
            let twice = service_label(Some(&once));
            assert_eq!(once, twice, "raw: {raw}");
        }
    }

    #[test]
    fn test_reconcile_status_mapping() {
        assert_eq!(ReconcileStatus::from_raw("match"), ReconcileStatus::Match);
        assert_eq!(
            ReconcileStatus::from_raw("not_found_in_m").description(),
            "PVI only (missing in GSM)"
        );
        assert!(matches!(
            ReconcileStatus::from_raw("MATCH"),
            ReconcileStatus::Unmapped(_)
        ));
    }

    #[test]
    fn test_business_flag() {
        assert_eq!(BusinessFlag::from_raw(Some("True")), BusinessFlag::Business);
        assert_eq!(BusinessFlag::from_raw(Some("0")), BusinessFlag::NonBusiness);
        assert_eq!(BusinessFlag::from_raw(Some("maybe")).label(), "Unknown (maybe)");
        assert_eq!(BusinessFlag::from_raw(None).label(), "Unknown (null)");
    }

    #[test]
    fn test_insurance_unmapped_keeps_raw() {
        assert_eq!(InsuranceStatus::from_raw("refunded").description(), "refunded");
        assert_eq!(InsuranceStatus::from_raw("failed"), InsuranceStatus::Failed);
    }
}
