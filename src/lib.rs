//! Machine Sync - Pinball Machine Catalog Database
//!
//! Imports an Open Pinball Database (OPDB) bulk export into a SQLite
//! database on first run and reconciles each machine's active flag against
//! the Pinball Map location feed at every startup.

pub mod database;
pub mod error;
pub mod opdb;
pub mod pinball_map;
pub mod sync;

pub use database::{
    bootstrap, get_all_active_machines, get_features, import_catalog, ImportStats, Machine,
};
pub use error::{Result, SyncError};
pub use sync::sync_active_machines;
