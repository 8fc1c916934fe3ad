//! Inverted-index primitives over the `buckets` table: attribute value → set of IDs.

use rusqlite::{Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::{Bucket, FileRecord};

use super::INSERT_BUCKET_SQL;

/// Add `id` to the ID set stored under `value` in `bucket`, creating the key if new.
///
/// Idempotent. Empty values (and `0` in numeric buckets) produce no entry.
pub fn attribute_insert(conn: &Connection, bucket: Bucket, value: &str, id: &str) -> Result<()> {
    if value.is_empty() || (bucket.is_numeric() && value == "0") {
        return Ok(());
    }
    conn.execute(INSERT_BUCKET_SQL, (bucket.name(), value, id))?;
    Ok(())
}

/// Drop every key of `bucket`.
pub fn clear_bucket(conn: &Connection, bucket: Bucket) -> Result<()> {
    conn.execute("DELETE FROM buckets WHERE bucket = ?1", [bucket.name()])?;
    Ok(())
}

/// Index every record into each of `buckets`. Call inside a transaction after clearing them.
pub fn populate_buckets(conn: &Connection, records: &[FileRecord], buckets: &[Bucket]) -> Result<()> {
    let mut stmt = conn.prepare(INSERT_BUCKET_SQL)?;
    for f in records {
        for bucket in buckets {
            for key in bucket.keys_for(f) {
                stmt.execute((bucket.name(), key.as_str(), f.id.as_str()))?;
            }
        }
    }
    Ok(())
}

pub fn key_exists(conn: &Connection, bucket: Bucket, key: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM buckets WHERE bucket = ?1 AND key = ?2 LIMIT 1",
            (bucket.name(), key),
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// ID set stored under `key`, or `None` when the key is absent.
pub fn bucket_ids(conn: &Connection, bucket: Bucket, key: &str) -> Result<Option<BTreeSet<String>>> {
    let mut stmt = conn.prepare("SELECT file_id FROM buckets WHERE bucket = ?1 AND key = ?2")?;
    let rows = stmt.query_map((bucket.name(), key), |row| row.get::<_, String>(0))?;
    let mut ids = BTreeSet::new();
    for row in rows {
        ids.insert(row?);
    }
    Ok((!ids.is_empty()).then_some(ids))
}

/// Remove `id` from the set under `key`. A key whose set becomes empty disappears.
pub fn remove_id_from_key(conn: &Connection, bucket: Bucket, key: &str, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM buckets WHERE bucket = ?1 AND key = ?2 AND file_id = ?3",
        (bucket.name(), key, id),
    )?;
    Ok(())
}

/// Whole bucket as key → ID set, keys in storage order.
pub fn bucket_entries(conn: &Connection, bucket: Bucket) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut stmt = conn.prepare("SELECT key, file_id FROM buckets WHERE bucket = ?1")?;
    let rows = stmt.query_map([bucket.name()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        let (key, id) = row?;
        map.entry(key).or_default().insert(id);
    }
    Ok(map)
}

/// Size of each key's ID set.
pub fn key_cardinalities(conn: &Connection, bucket: Bucket) -> Result<BTreeMap<String, usize>> {
    let mut stmt = conn.prepare(
        "SELECT key, COUNT(*) FROM buckets WHERE bucket = ?1 GROUP BY key ORDER BY key",
    )?;
    let rows = stmt.query_map([bucket.name()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (key, n) = row?;
        map.insert(key, n.max(0) as usize);
    }
    Ok(map)
}
