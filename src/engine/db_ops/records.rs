//! Primary store: `files` table, id → record JSON.

use rusqlite::{Connection, OptionalExtension};

use crate::FileRecord;
use crate::error::{Error, Result};

use super::INSERT_RECORD_SQL;

fn decode_record(id: &str, data: &str) -> Result<FileRecord> {
    serde_json::from_str(data).map_err(|e| Error::decode(format!("index record {id}"), e))
}

/// Insert a record. Does not overwrite: an existing ID is `AlreadyExists`, or
/// `IdCollision` when the stored record belongs to a different filename.
pub fn insert_record(conn: &Connection, record: &FileRecord) -> Result<()> {
    if let Some(existing) = get_record(conn, &record.id)? {
        if existing.filename != record.filename {
            return Err(Error::IdCollision {
                id: record.id.clone(),
                existing: existing.filename,
                incoming: record.filename.clone(),
            });
        }
        return Err(Error::AlreadyExists(format!(
            "id {} ({})",
            record.id, record.filename
        )));
    }
    let data = serde_json::to_string(record)
        .map_err(|e| Error::decode(format!("index record {}", record.id), e))?;
    conn.execute(INSERT_RECORD_SQL, (record.id.as_str(), data.as_str()))?;
    Ok(())
}

/// Replace the stored record for an existing ID. The filename must not change; renames go
/// through a delete and insert instead.
pub fn update_record(conn: &Connection, record: &FileRecord) -> Result<()> {
    let existing = get_record(conn, &record.id)?
        .ok_or_else(|| Error::NotFound(format!("id {}", record.id)))?;
    if existing.filename != record.filename {
        return Err(Error::Inconsistent(format!(
            "update of {} would change filename {:?} to {:?}",
            record.id, existing.filename, record.filename
        )));
    }
    let data = serde_json::to_string(record)
        .map_err(|e| Error::decode(format!("index record {}", record.id), e))?;
    conn.execute(
        "UPDATE files SET data = ?2 WHERE id = ?1",
        (record.id.as_str(), data.as_str()),
    )?;
    Ok(())
}

pub fn get_record(conn: &Connection, id: &str) -> Result<Option<FileRecord>> {
    let data: Option<String> = conn
        .query_row("SELECT data FROM files WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    data.map(|d| decode_record(id, &d)).transpose()
}

pub fn record_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM files WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Remove a record; returns false when the ID was not present.
pub fn delete_record(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM files WHERE id = ?1", [id])?;
    Ok(n > 0)
}

/// Every record, ordered by ID.
pub fn all_records(conn: &Connection) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare("SELECT id, data FROM files ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let data: String = row.get(1)?;
        Ok((id, data))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, data) = row?;
        out.push(decode_record(&id, &data)?);
    }
    Ok(out)
}

/// `(file count, total bytes)` from the primary store.
pub fn file_count_and_size(conn: &Connection) -> Result<(usize, u64)> {
    let (count, total): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(json_extract(data, '$.size')), 0) FROM files",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((count.max(0) as usize, total.max(0) as u64))
}
