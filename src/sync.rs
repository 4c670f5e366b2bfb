//! Active-status synchronization against the Pinball Map location feed
//!
//! Runs at every startup and may be re-invoked at any time. Everything here
//! is best-effort: a failed attempt logs a warning and leaves the stored
//! active set untouched; the next run is the retry mechanism.

use crate::database;
use crate::pinball_map;
use rusqlite::Connection;

/// Reconcile every machine's active flag against the location feed
///
/// On any failure (network, HTTP status, body parse, feed `errors` payload,
/// or the database transaction) the attempt is abandoned with a warning and
/// the previous active set remains authoritative.
pub async fn sync_active_machines(conn: &mut Connection, base_url: &str, location_id: u32) {
    log::debug!("Assigning active machines for location {}", location_id);

    let opdb_ids = match pinball_map::fetch_machine_details(base_url, location_id).await {
        Ok(opdb_ids) => opdb_ids,
        Err(e) => {
            log::warn!(
                "Unable to get machine listing for location {}: {}",
                location_id,
                e
            );
            return;
        }
    };

    match database::assign_active_machines(conn, &opdb_ids) {
        Ok(marked) => {
            log::info!(
                "Marked {} of {} feed machines active for location {}",
                marked,
                opdb_ids.len(),
                location_id
            );
        }
        Err(e) => {
            log::warn!("Unable to assign active machines: {}", e);
        }
    }
}
