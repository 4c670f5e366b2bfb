//! Machine Sync - Pinball Machine Catalog Database
//!
//! Bootstraps the machine database from an OPDB catalog export on first run,
//! then syncs the active machine flags from the Pinball Map location feed.

use clap::Parser;
use machine_sync::database::{bootstrap, get_all_active_machines};
use machine_sync::{pinball_map, sync_active_machines};
use std::path::PathBuf;

/// Pinball machine database - imports an OPDB catalog export to SQLite and
/// syncs active machines from Pinball Map
#[derive(Parser, Debug)]
#[command(name = "machine_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Path to the OPDB catalog export (used only when creating the database)
    #[arg(short, long, default_value = "opdb.json")]
    catalog: String,

    /// Pinball Map location id to sync active machines against
    #[arg(short, long, default_value_t = 4907)]
    location: u32,

    /// Pinball Map API base URL
    #[arg(long, default_value = pinball_map::API_BASE)]
    api_base: String,
}

/// Returns the default database path: ~/.local/share/machine_sync/tpl.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("machine_sync")
        .join("tpl.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);
    let catalog_path = PathBuf::from(&args.catalog);

    log::info!("Starting machine_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    // Open the database, creating and importing the catalog on first run.
    // A failure here means the store never reached a bootstrapped state.
    let mut conn = match bootstrap(&db_path, &catalog_path) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to bootstrap database: {}", e);
            std::process::exit(1);
        }
    };

    // Best-effort: a failed sync keeps the previous active set.
    sync_active_machines(&mut conn, &args.api_base, args.location).await;

    match get_all_active_machines(&conn) {
        Ok(machines) => {
            log::info!(
                "{} machines active at location {}",
                machines.len(),
                args.location
            );
        }
        Err(e) => {
            log::error!("Failed to query active machines: {}", e);
            std::process::exit(1);
        }
    }
}
