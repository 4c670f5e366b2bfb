//! Database operations for the pinball machine catalog
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! All writes are transactional; the initial bootstrap runs schema creation
//! and the full catalog import in one transaction with foreign keys off.

use crate::error::Result;
use crate::opdb::{self, MachineRecord, ManufacturerRecord};
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use std::path::Path;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// A machine row as served to the front end
#[derive(Debug, Clone, Serialize)]
pub struct Machine {
    pub opdb_id: String,
    pub manufacturer_id: i64,
    pub ipdb_id: Option<i64>,
    pub features_id: Option<i64>,
    pub name: String,
    pub manufacture_date: Option<i64>,
    pub backglass_image_uuid: Option<String>,
    pub updated_at: i64,
    pub active: bool,
}

/// Counters for one catalog import run
#[derive(Debug, Default)]
pub struct ImportStats {
    /// Machines inserted
    pub machines_inserted: usize,
    /// Machines skipped (duplicate opdb_id or failed insert)
    pub machines_skipped: usize,
    /// Manufacturers inserted (first occurrence wins)
    pub manufacturers_inserted: usize,
    /// Distinct feature-tag combinations created
    pub feature_sets_inserted: usize,
}

/// Create the full schema
///
/// The machines, machine_manufacturers, and features tables hold the
/// catalog; the league scheduling tables (leagues, seasons, teams, users,
/// matches, results) are created here too because results reference
/// machines by opdb_id.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE leagues (
            id     INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name   TEXT    NOT NULL,
            active BOOLEAN NOT NULL
        );

        -- One row per distinct comma-joined feature-tag combination
        CREATE TABLE features (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            features TEXT    NOT NULL UNIQUE
        );

        -- id is the external OPDB manufacturer id, not autogenerated
        CREATE TABLE machine_manufacturers (
            id         INTEGER PRIMARY KEY,
            name       TEXT    NOT NULL,
            full_name  TEXT    NOT NULL,
            updated_at INTEGER
        );

        -- opdb_id is the external catalog id, not autogenerated
        CREATE TABLE machines (
            opdb_id              TEXT    PRIMARY KEY NOT NULL,
            manufacturer_id      INTEGER NOT NULL
                                         REFERENCES machine_manufacturers (id),
            ipdb_id              INTEGER,
            features_id          INTEGER REFERENCES features (id),
            name                 TEXT    NOT NULL,
            manufacture_date     INTEGER,
            backglass_image_uuid TEXT,
            updated_at           INTEGER NOT NULL,
            active               BOOLEAN NOT NULL
        );

        CREATE TABLE seasons (
            id         INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name       TEXT    NOT NULL,
            start_date INTEGER NOT NULL,
            end_date   INTEGER
        );

        CREATE TABLE users (
            id        INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            league_id INTEGER NOT NULL REFERENCES leagues (id),
            email     TEXT    NOT NULL UNIQUE,
            password  TEXT    NOT NULL,
            name      TEXT    NOT NULL,
            initials  TEXT,
            active    BOOLEAN NOT NULL
        );

        CREATE TABLE teams (
            id        INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            league_id INTEGER NOT NULL REFERENCES leagues (id),
            name      TEXT    NOT NULL UNIQUE,
            a_player  INTEGER NOT NULL REFERENCES users (id),
            b_player  INTEGER NOT NULL REFERENCES users (id),
            active    BOOLEAN NOT NULL
        );

        CREATE TABLE matches (
            id        INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            league_id INTEGER NOT NULL REFERENCES leagues (id),
            season_id INTEGER NOT NULL REFERENCES seasons (id),
            team_1_id INTEGER NOT NULL REFERENCES teams (id),
            team_2_id INTEGER REFERENCES teams (id)
        );

        CREATE TABLE results (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            match_id              INTEGER NOT NULL REFERENCES matches (id),
            opdb_id               TEXT    NOT NULL
                                          REFERENCES machines (opdb_id),
            team_1_a_player_id    INTEGER REFERENCES users (id),
            team_1_a_player_score INTEGER,
            team_1_b_player_id    INTEGER REFERENCES users (id),
            team_1_b_player_score INTEGER,
            team_1_score          INTEGER,
            team_2_a_player_id    INTEGER REFERENCES users (id),
            team_2_a_player_score INTEGER,
            team_2_b_player_id    INTEGER REFERENCES users (id),
            team_2_b_player_score INTEGER,
            team_2_score          INTEGER
        );
        ",
    )?;

    log::debug!("Database schema created");
    Ok(())
}

/// Open the database, creating and seeding it on first run
///
/// When no file exists at `db_path` the schema is created and the full
/// catalog export is imported, all in a single transaction with foreign
/// keys disabled (the export does not order records to satisfy the
/// machine -> manufacturer edge). Any failure here is fatal: the store
/// is unusable until a bootstrap completes.
///
/// When the file already exists it is opened as-is; no schema work and
/// no re-import happen.
pub fn bootstrap(db_path: &Path, catalog_path: &Path) -> Result<Connection> {
    if db_path.exists() {
        let conn = Connection::open(db_path)?;
        // The foreign_keys pragma is per-connection, so enforcement must
        // be turned on for every post-bootstrap session too.
        conn.pragma_update(None, "foreign_keys", true)?;
        log::debug!("Opened existing database: {}", db_path.display());
        return Ok(conn);
    }

    log::info!("Creating database: {}", db_path.display());
    // Load the export before touching the store so a bad catalog path
    // does not leave an empty database file behind.
    let records = opdb::load_catalog(catalog_path)?;

    match create_and_seed(db_path, &records) {
        Ok(conn) => Ok(conn),
        Err(e) => {
            // A partial store file must not be mistaken for a
            // bootstrapped database on the next startup.
            if let Err(remove_err) = std::fs::remove_file(db_path) {
                log::warn!(
                    "Unable to remove partial database {}: {}",
                    db_path.display(),
                    remove_err
                );
            }
            Err(e)
        }
    }
}

fn create_and_seed(db_path: &Path, records: &[MachineRecord]) -> Result<Connection> {
    let mut conn = Connection::open(db_path)?;

    conn.pragma_update(None, "foreign_keys", false)?;
    let tx = conn.transaction()?;
    init_schema(&tx)?;
    let stats = import_catalog_tx(&tx, records)?;
    tx.commit()?;
    conn.pragma_update(None, "foreign_keys", true)?;

    log::info!(
        "Database bootstrapped: {} machines, {} manufacturers, {} feature sets",
        stats.machines_inserted,
        stats.manufacturers_inserted,
        stats.feature_sets_inserted
    );
    Ok(conn)
}

/// Import catalog records into the database
///
/// All inserts run in one transaction. Duplicate machines and
/// manufacturers are skipped, never updated (first import wins), so
/// re-importing the same export is a no-op. An unparsable mandatory
/// `updated_at` aborts and rolls back the whole import.
pub fn import_catalog(conn: &mut Connection, records: &[MachineRecord]) -> Result<ImportStats> {
    let tx = conn.transaction()?;
    let stats = import_catalog_tx(&tx, records)?;
    tx.commit()?;
    Ok(stats)
}

fn import_catalog_tx(tx: &Transaction<'_>, records: &[MachineRecord]) -> Result<ImportStats> {
    let mut insert_machine = tx.prepare_cached(
        "INSERT INTO machines
         (opdb_id, manufacturer_id, ipdb_id, features_id, name,
          manufacture_date, backglass_image_uuid, updated_at, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    let mut stats = ImportStats::default();

    for record in records {
        // Mandatory timestamp; a parse failure aborts the import.
        let updated_at = record.updated_at_epoch()?;

        let features_id = match record.features_key() {
            Some(key) => match get_or_create_features_tx(tx, &key) {
                Ok((id, created)) => {
                    if created {
                        stats.feature_sets_inserted += 1;
                    }
                    Some(id)
                }
                Err(e) => {
                    // A failed feature lookup costs the machine its feature
                    // reference, not the whole import.
                    log::warn!(
                        "Unable to resolve features {:?} for {}: {}",
                        key,
                        record.opdb_id,
                        e
                    );
                    None
                }
            },
            None => None,
        };

        if ensure_manufacturer_tx(tx, &record.manufacturer)? {
            stats.manufacturers_inserted += 1;
        }

        if machine_exists_tx(tx, &record.opdb_id)? {
            log::debug!("Machine {} already imported, skipping", record.opdb_id);
            stats.machines_skipped += 1;
            continue;
        }

        let inserted = insert_machine.execute(params![
            &record.opdb_id,
            record.manufacturer.manufacturer_id,
            record.ipdb_id,
            features_id,
            &record.name,
            record.manufacture_date_epoch(),
            record.backglass_image_uuid(),
            updated_at,
            false,
        ]);
        match inserted {
            Ok(_) => stats.machines_inserted += 1,
            Err(e) => {
                log::warn!("Unable to insert machine {}: {}", record.opdb_id, e);
                stats.machines_skipped += 1;
            }
        }
    }

    log::info!(
        "Imported {} machines ({} skipped), {} manufacturers, {} feature sets",
        stats.machines_inserted,
        stats.machines_skipped,
        stats.manufacturers_inserted,
        stats.feature_sets_inserted
    );
    Ok(stats)
}

/// Look up a feature-set id by its canonical comma-joined key, inserting a
/// new row on miss. Returns the id and whether a row was created.
fn get_or_create_features_tx(tx: &Transaction<'_>, key: &str) -> DbResult<(i64, bool)> {
    let mut select = tx.prepare_cached("SELECT id FROM features WHERE features = ?1")?;
    let mut rows = select.query(params![key])?;
    if let Some(row) = rows.next()? {
        return Ok((row.get(0)?, false));
    }

    let mut insert = tx.prepare_cached("INSERT INTO features (features) VALUES (?1)")?;
    insert.execute(params![key])?;
    Ok((tx.last_insert_rowid(), true))
}

/// Insert a manufacturer unless its external id is already present.
/// The first imported row wins; later occurrences never overwrite it.
fn ensure_manufacturer_tx(tx: &Transaction<'_>, mfr: &ManufacturerRecord) -> Result<bool> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM machine_manufacturers WHERE id = ?1",
        params![mfr.manufacturer_id],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Ok(false);
    }

    let mut insert = tx.prepare_cached(
        "INSERT INTO machine_manufacturers (id, name, full_name, updated_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    match insert.execute(params![
        mfr.manufacturer_id,
        &mfr.name,
        &mfr.full_name,
        mfr.updated_at_epoch(),
    ]) {
        Ok(_) => Ok(true),
        Err(e) => {
            log::warn!(
                "Unable to insert manufacturer {}: {}",
                mfr.manufacturer_id,
                e
            );
            Ok(false)
        }
    }
}

fn machine_exists_tx(tx: &Transaction<'_>, opdb_id: &str) -> DbResult<bool> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM machines WHERE opdb_id = ?1",
        params![opdb_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Reset every machine's active flag, then reassert it for the given
/// catalog ids, all in one transaction
///
/// An id with no matching machine is a no-op (the feed and catalog may be
/// out of sync). Returns the number of machines marked active.
pub fn assign_active_machines(conn: &mut Connection, opdb_ids: &[String]) -> DbResult<usize> {
    let tx = conn.transaction()?;
    let marked = assign_active_machines_tx(&tx, opdb_ids)?;
    tx.commit()?;
    Ok(marked)
}

fn assign_active_machines_tx(tx: &Transaction<'_>, opdb_ids: &[String]) -> DbResult<usize> {
    tx.execute("UPDATE machines SET active = 0", [])?;

    let mut stmt = tx.prepare_cached("UPDATE machines SET active = 1 WHERE opdb_id = ?1")?;
    let mut marked = 0;
    for opdb_id in opdb_ids {
        let updated = stmt.execute(params![opdb_id])?;
        if updated == 0 {
            log::debug!("Feed machine {} not in catalog", opdb_id);
        }
        marked += updated;
    }
    Ok(marked)
}

// ── Read queries for the front end ─────────────────────────────────────────

/// Get every machine currently marked active, in arbitrary order
pub fn get_all_active_machines(conn: &Connection) -> DbResult<Vec<Machine>> {
    let mut stmt = conn.prepare(
        "SELECT opdb_id, manufacturer_id, ipdb_id, features_id, name,
                manufacture_date, backglass_image_uuid, updated_at
         FROM machines
         WHERE active = 1",
    )?;

    let machines: DbResult<Vec<Machine>> = stmt
        .query_map([], |row| {
            Ok(Machine {
                opdb_id: row.get(0)?,
                manufacturer_id: row.get(1)?,
                ipdb_id: row.get(2)?,
                features_id: row.get(3)?,
                name: row.get(4)?,
                manufacture_date: row.get(5)?,
                backglass_image_uuid: row.get(6)?,
                updated_at: row.get(7)?,
                active: true,
            })
        })?
        .collect();
    machines
}

/// Get the canonical comma-joined feature string for a feature-set id
pub fn get_features(conn: &Connection, features_id: i64) -> DbResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT features FROM features WHERE id = ?1")?;
    let mut rows = stmt.query(params![features_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// Get total count of machines in the database
pub fn get_machine_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM machines", [], |row| row.get(0))
}

/// Get total count of manufacturers
pub fn get_manufacturer_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM machine_manufacturers", [], |row| {
        row.get(0)
    })
}

/// Get total count of feature sets
pub fn get_features_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))
}
