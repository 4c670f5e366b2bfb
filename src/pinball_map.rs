//! Pinball Map API client for fetching the machine listing at a location

use crate::error::{Result, SyncError};
use serde::Deserialize;

/// Pinball Map API base URL
pub const API_BASE: &str = "https://pinballmap.com/api/v1";

/// One machine entry from the location feed; only the catalog id is used
#[derive(Debug, Deserialize)]
struct FeedMachine {
    #[serde(default)]
    opdb_id: Option<String>,
}

/// Location feed response shape
///
/// A structurally valid body may still carry an `errors` payload, which
/// means the whole response failed.
#[derive(Debug, Deserialize)]
struct MachineDetailsFile {
    #[serde(default)]
    machines: Vec<FeedMachine>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

/// Fetch the opdb ids of the machines currently at a location
pub async fn fetch_machine_details(base_url: &str, location_id: u32) -> Result<Vec<String>> {
    let url = format!("{}/locations/{}/machine_details.json", base_url, location_id);
    log::info!("Fetching machine listing from {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .header("User-Agent", "machine_sync/1.0")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SyncError::HttpStatus(response.status()));
    }

    let body = response.text().await?;
    parse_machine_details(&body)
}

/// Parse a location feed body into the listed opdb ids
///
/// Entries without an opdb id are skipped; a present `errors` field fails
/// the whole response.
pub fn parse_machine_details(body: &str) -> Result<Vec<String>> {
    let file: MachineDetailsFile = serde_json::from_str(body)?;

    if let Some(errors) = file.errors {
        return Err(SyncError::FeedErrors(errors.to_string()));
    }

    let opdb_ids: Vec<String> = file
        .machines
        .into_iter()
        .filter_map(|machine| machine.opdb_id)
        .collect();

    log::info!("Feed listed {} machines", opdb_ids.len());
    Ok(opdb_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_opdb_ids() {
        let body = r#"{
            "machines": [
                { "opdb_id": "G50LN-MQK1Z", "name": "Godzilla (Premium)" },
                { "opdb_id": "GRdNZ-MQo1e", "name": "Iron Maiden (Pro)" }
            ]
        }"#;

        let ids = parse_machine_details(body).unwrap();
        assert_eq!(ids, vec!["G50LN-MQK1Z", "GRdNZ-MQo1e"]);
    }

    #[test]
    fn parse_skips_machines_without_opdb_id() {
        let body = r#"{
            "machines": [
                { "opdb_id": "G50LN-MQK1Z" },
                { "name": "Homebrew Machine" }
            ]
        }"#;

        let ids = parse_machine_details(body).unwrap();
        assert_eq!(ids, vec!["G50LN-MQK1Z"]);
    }

    #[test]
    fn parse_fails_when_errors_field_present() {
        let body = r#"{ "errors": "Failed to find location" }"#;

        let result = parse_machine_details(body);
        assert!(matches!(result, Err(SyncError::FeedErrors(_))));
    }

    #[test]
    fn parse_fails_on_malformed_body() {
        let result = parse_machine_details("<html>not json</html>");
        assert!(matches!(result, Err(SyncError::Parse(_))));
    }

    #[test]
    fn parse_handles_empty_machine_list() {
        let ids = parse_machine_details(r#"{ "machines": [] }"#).unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn fetch_fails_on_unreachable_endpoint() {
        // Nothing listens on the discard port.
        let result = fetch_machine_details("http://127.0.0.1:9", 4907).await;
        assert!(matches!(result, Err(SyncError::Network(_))));
    }
}
