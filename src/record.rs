use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Matches the trailing `=value` segment of a scanned tag payload, e.g.
    // "https://true608.com/asset?id=AC-102" -> "AC-102".
    static ref TAG_QUERY_RE: Regex = Regex::new(r"=([^=&#]*)\z").unwrap();
}

/// Refrigerant types offered by the field entry form. Free-text labels are
/// still accepted at the data-model level.
pub const REFRIGERANTS: [&str; 4] = ["R-410A", "R-22", "R-404A", "R-134a"];

/// One refrigerant-handling event.
///
/// `location` and `refrigerant` are free-text grouping keys; `unit_id` is
/// purely descriptive. Missing optionals are tolerated by every consumer:
/// aggregation buckets them under "Unknown" and treats an absent `amount`
/// as zero.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LogRecord {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub location: Option<String>,
    pub unit_id: String,
    pub refrigerant: Option<String>,
    pub amount: Option<f64>,
}

/// Payload of the field entry form (`POST /api/logs`).
#[derive(Debug, Serialize, Deserialize)]
pub struct NewLogEntry {
    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub unit_id: String,

    #[serde(default)]
    pub refrigerant: String,

    pub amount: Option<f64>,
}

impl NewLogEntry {
    /// Check the entry against the form's compliance rules.
    ///
    /// Location, equipment ID, and amount are required; the amount must be
    /// a finite, non-negative number of pounds.
    ///
    /// # Errors
    /// * Returns a user-facing message naming the first failed rule
    pub fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("Job site location is required".to_string());
        }
        if self.unit_id.trim().is_empty() {
            return Err("Equipment ID is required".to_string());
        }
        match self.amount {
            None => Err("Amount is required".to_string()),
            Some(a) if !a.is_finite() => Err("Amount must be a number".to_string()),
            Some(a) if a < 0.0 => Err("Amount cannot be negative".to_string()),
            Some(_) => Ok(()),
        }
    }
}

/// Reduce a scanned QR payload to a bare equipment ID.
///
/// Asset tags encode either the ID itself or a full URL whose last query
/// value is the ID; in the latter case only the trailing value is kept.
pub fn normalize_asset_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    match TAG_QUERY_RE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(location: &str, unit_id: &str, amount: Option<f64>) -> NewLogEntry {
        NewLogEntry {
            location: location.to_string(),
            unit_id: unit_id.to_string(),
            refrigerant: "R-410A".to_string(),
            amount,
        }
    }

    #[test]
    fn validate_accepts_complete_entry() {
        assert!(entry("123 Main St", "AC-102", Some(5.0)).validate().is_ok());
    }

    #[test]
    fn validate_requires_all_fields() {
        assert!(entry("", "AC-102", Some(5.0)).validate().is_err());
        assert!(entry("   ", "AC-102", Some(5.0)).validate().is_err());
        assert!(entry("123 Main St", "", Some(5.0)).validate().is_err());
        assert!(entry("123 Main St", "AC-102", None).validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_amounts() {
        assert!(entry("123 Main St", "AC-102", Some(-1.0)).validate().is_err());
        assert!(entry("123 Main St", "AC-102", Some(f64::NAN)).validate().is_err());
        assert!(entry("123 Main St", "AC-102", Some(f64::INFINITY))
            .validate()
            .is_err());
        assert!(entry("123 Main St", "AC-102", Some(0.0)).validate().is_ok());
    }

    #[test]
    fn asset_tag_url_payload_reduces_to_id() {
        assert_eq!(
            normalize_asset_tag("https://true608.com/asset?id=AC-102"),
            "AC-102"
        );
        assert_eq!(normalize_asset_tag("tag=RTU-7 "), "RTU-7");
    }

    #[test]
    fn asset_tag_bare_id_passes_through() {
        assert_eq!(normalize_asset_tag("AC-102"), "AC-102");
        assert_eq!(normalize_asset_tag("  AC-102\n"), "AC-102");
    }

    #[test]
    fn catalog_leads_with_the_default_selection() {
        assert_eq!(REFRIGERANTS[0], "R-410A");
        assert!(REFRIGERANTS.contains(&"R-134a"));
    }

    #[test]
    fn null_optionals_deserialize() {
        let json = r#"{"id":1,"created_at":"2025-11-01T12:00:00Z","location":null,"unit_id":"AC-1","refrigerant":null,"amount":null}"#;
        let record: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.location, None);
        assert_eq!(record.refrigerant, None);
        assert_eq!(record.amount, None);
    }
}
