//! Open the index database.

use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;

use super::{SCHEMA, WAL_PRAGMAS};

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(WAL_PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open or create the index DB and ensure schema + WAL with optimizations.
/// Callers hold a [`super::StoreLock`] for the lifetime of the connection.
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    apply_wal_and_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory DB with the same schema (tests and previews; no WAL pragmas needed).
pub fn open_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
