//! Open Pinball Database (OPDB) catalog export parsing
//!
//! The bulk export is a JSON array with one record per machine. Records carry
//! a nested manufacturer object, an optional feature-tag list, and an optional
//! image list. Dates in the export are plain `YYYY-MM-DD` strings.

use crate::error::{Result, SyncError};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

/// RFC-4122 shaped token, e.g. `3f9e4567-e89b-12d3-a456-426614174000`
const UUID_PATTERN: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(UUID_PATTERN).expect("UUID_PATTERN is a valid regex"))
}

/// One machine record from the OPDB bulk export
#[derive(Debug, Deserialize, Clone)]
pub struct MachineRecord {
    pub opdb_id: String,
    #[serde(default)]
    pub ipdb_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub manufacture_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<MachineImage>,
    pub manufacturer: ManufacturerRecord,
}

/// Nested manufacturer sub-object of a machine record
#[derive(Debug, Deserialize, Clone)]
pub struct ManufacturerRecord {
    pub manufacturer_id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Image entry; only the `backglass` type is of interest
#[derive(Debug, Deserialize, Clone)]
pub struct MachineImage {
    #[serde(rename = "type")]
    pub image_type: String,
    #[serde(default)]
    pub urls: ImageUrls,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImageUrls {
    #[serde(default)]
    pub large: Option<String>,
}

impl MachineRecord {
    /// Canonical feature-set key: tags comma-joined in source order.
    ///
    /// Order matters: `["Pro","LE"]` and `["LE","Pro"]` are distinct keys.
    /// Machines without tags have no feature set.
    pub fn features_key(&self) -> Option<String> {
        if self.features.is_empty() {
            None
        } else {
            Some(self.features.join(","))
        }
    }

    /// UUID extracted from the large backglass image URL, if any
    pub fn backglass_image_uuid(&self) -> Option<String> {
        let url = self
            .images
            .iter()
            .find(|image| image.image_type == "backglass")?
            .urls
            .large
            .as_deref()?;
        extract_uuid(url)
    }

    /// Machine `updated_at` as epoch seconds; this field is mandatory and an
    /// unparsable or missing value aborts the import
    pub fn updated_at_epoch(&self) -> Result<i64> {
        let value = self.updated_at.as_deref().unwrap_or("");
        parse_date(value).ok_or_else(|| SyncError::InvalidTimestamp {
            opdb_id: self.opdb_id.clone(),
            value: value.to_string(),
        })
    }

    /// Optional manufacture date as epoch seconds; unparsable is null, not an error
    pub fn manufacture_date_epoch(&self) -> Option<i64> {
        parse_date(self.manufacture_date.as_deref()?)
    }
}

impl ManufacturerRecord {
    /// Optional manufacturer update date as epoch seconds
    pub fn updated_at_epoch(&self) -> Option<i64> {
        parse_date(self.updated_at.as_deref()?)
    }
}

/// Parse a `YYYY-MM-DD` date into epoch seconds at UTC midnight
pub fn parse_date(value: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Extract the first RFC-4122-shaped UUID substring from a string
pub fn extract_uuid(value: &str) -> Option<String> {
    uuid_regex()
        .find(value)
        .map(|found| found.as_str().to_string())
}

/// Load and parse a catalog export file
pub fn load_catalog(path: &Path) -> Result<Vec<MachineRecord>> {
    let data = std::fs::read_to_string(path)?;
    let records: Vec<MachineRecord> = serde_json::from_str(&data)?;
    log::info!(
        "Loaded {} machine records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

#[cfg(test)]
pub use tests::make_test_record;
