//! Index engine: primary store plus derived inverted indexes, with three refresh tiers.
//!
//! | Tier | Refresh | Buckets |
//! |------|---------|---------|
//! | synchronous | [`IndexEngine::put`], [`IndexEngine::delete`], [`IndexEngine::rename_record`], [`IndexEngine::rebuild_ctime_only`] | Filename, CTime |
//! | lazy | [`IndexEngine::rebuild_cache`] (from the primary store) | all other attributes |
//! | disk | [`IndexEngine::rebuild_all`] (from sidecars) | primary store and everything above |
//!
//! Every multi-row mutation runs in one SQLite transaction: it commits in full or not at all.
//! A crash mid-rebuild is recovered by running the rebuild again.

use log::{debug, info};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::engine::db_ops::{
    self, StoreLock, all_records, attribute_insert, bucket_entries, bucket_ids, clear_bucket,
    delete_record, file_count_and_size, get_record, insert_record, key_cardinalities, key_exists,
    populate_buckets, record_exists, remove_id_from_key, update_record,
};
use crate::engine::sidecar::read_all_sidecars;
use crate::engine::tools::name_to_id;
use crate::error::{Error, Result};
use crate::orphan::find_orphans;
use crate::project::ProjectLayout;
use crate::{Bucket, FileRecord, MatchMode};

/// An open index store. Holds the project's store lock (if file-backed) until dropped.
pub struct IndexEngine {
    conn: Connection,
    _lock: Option<StoreLock>,
}

impl IndexEngine {
    /// Lock and open `project.db` under `layout`. Fails with [`Error::Locked`] if another
    /// process holds the store for longer than `lock_timeout`.
    pub fn open(layout: &ProjectLayout, lock_timeout: Duration) -> Result<Self> {
        let lock = StoreLock::acquire(&layout.lock_path(), lock_timeout)?;
        let conn = db_ops::open_db(&layout.db_path())?;
        debug!("Opened index {}", layout.db_path().display());
        Ok(Self {
            conn,
            _lock: Some(lock),
        })
    }

    /// Unlocked, in-memory store with the same schema.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: db_ops::open_db_in_memory()?,
            _lock: None,
        })
    }

    /// Underlying connection, for read-only inspection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ---- Primary store ----

    pub fn get(&self, id: &str) -> Result<FileRecord> {
        get_record(&self.conn, id)?.ok_or_else(|| Error::NotFound(format!("id {id}")))
    }

    /// Like [`Self::get`] but absence is `Ok(None)`.
    pub fn find(&self, id: &str) -> Result<Option<FileRecord>> {
        get_record(&self.conn, id)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        record_exists(&self.conn, id)
    }

    pub fn all_files(&self) -> Result<Vec<FileRecord>> {
        all_records(&self.conn)
    }

    pub fn all_ids(&self) -> Result<Vec<String>> {
        Ok(self.all_files()?.into_iter().map(|f| f.id).collect())
    }

    /// `(file count, total bytes)`.
    pub fn total_size(&self) -> Result<(usize, u64)> {
        file_count_and_size(&self.conn)
    }

    /// Filenames for `ids`, in order. Unknown IDs are `NotFound`.
    pub fn ids_to_names(&self, ids: &[String]) -> Result<Vec<String>> {
        ids.iter()
            .map(|id| self.get(id).map(|f| f.filename))
            .collect()
    }

    /// Insert one record and its Filename entry. Never overwrites an existing ID.
    pub fn put(&mut self, id: &str, record: &FileRecord) -> Result<()> {
        if id != record.id {
            return Err(Error::Inconsistent(format!(
                "put: key {id} does not match record id {}",
                record.id
            )));
        }
        self.put_all(std::slice::from_ref(record))
    }

    /// Insert a batch in one transaction. Any duplicate aborts the whole batch.
    pub fn put_all(&mut self, records: &[FileRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for r in records {
            insert_record(&tx, r)?;
            attribute_insert(&tx, Bucket::Filename, &r.filename, &r.id)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Overwrite the metadata of an existing record (same ID, same filename). Buckets other
    /// than Filename and CTime pick the change up on the next cache rebuild.
    pub fn update(&mut self, record: &FileRecord) -> Result<()> {
        update_record(&self.conn, record)
    }

    /// Remove records and their Filename entries. Other buckets are left stale until the next
    /// cache rebuild. Unknown IDs abort the whole delete with `NotFound`.
    pub fn delete(&mut self, ids: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for id in ids.iter().collect::<BTreeSet<_>>() {
            let record =
                get_record(&tx, id)?.ok_or_else(|| Error::NotFound(format!("id {id}")))?;
            delete_record(&tx, id)?;
            remove_id_from_key(&tx, Bucket::Filename, &record.filename, id)?;
        }
        tx.commit()?;
        Ok(())
    }

    // ---- Rebuilds ----

    /// Repopulate everything from the sidecars on disk.
    ///
    /// Refuses with `Inconsistent` (and writes nothing) when content and metadata disagree,
    /// when a sidecar's ID does not match its filename, or with `IdCollision` when two
    /// sidecars share an ID. Returns the number of records indexed.
    pub fn rebuild_all(&mut self, layout: &ProjectLayout) -> Result<usize> {
        let orphans = find_orphans(layout)?;
        if !orphans.is_empty() {
            return Err(Error::Inconsistent(format!(
                "{} orphans in {} (content without metadata: {:?}; metadata without content: {:?}); run `orphan` and resolve them first",
                orphans.len(),
                layout.root().display(),
                orphans.files_only,
                orphans.metadata_only
            )));
        }
        let records = read_all_sidecars(layout)?;
        check_sidecar_ids(&records)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files", [])?;
        for r in &records {
            insert_record(&tx, r)?;
        }
        for bucket in Bucket::ALL {
            clear_bucket(&tx, bucket)?;
        }
        populate_buckets(&tx, &records, &Bucket::ALL)?;
        tx.commit()?;
        info!("Rebuilt index from {} sidecars", records.len());
        Ok(records.len())
    }

    /// Repopulate every bucket from the primary store. Does not see filesystem-only changes.
    pub fn rebuild_cache(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let records = all_records(&tx)?;
        for bucket in Bucket::ALL {
            clear_bucket(&tx, bucket)?;
        }
        populate_buckets(&tx, &records, &Bucket::ALL)?;
        tx.commit()?;
        debug!("Refreshed buckets for {} records", records.len());
        Ok(records.len())
    }

    /// Repopulate only the CTime bucket from the primary store (after add/delete).
    pub fn rebuild_ctime_only(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        let records = all_records(&tx)?;
        clear_bucket(&tx, Bucket::CTime)?;
        populate_buckets(&tx, &records, &[Bucket::CTime])?;
        tx.commit()?;
        Ok(())
    }

    // ---- Rename ----

    /// Move `old_id` to `new_id` inside the CTime set for `ctime`.
    /// `Inconsistent` if that key is absent (the bucket fell out of sync).
    pub fn rename(&mut self, old_id: &str, new_id: &str, ctime: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        rename_ctime(&tx, ctime, old_id, new_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace `old_id` by `new_record` in the primary store, Filename and CTime buckets,
    /// in one transaction.
    pub fn rename_record(&mut self, old_id: &str, new_record: &FileRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        let old =
            get_record(&tx, old_id)?.ok_or_else(|| Error::NotFound(format!("id {old_id}")))?;
        delete_record(&tx, old_id)?;
        remove_id_from_key(&tx, Bucket::Filename, &old.filename, old_id)?;
        insert_record(&tx, new_record)?;
        attribute_insert(&tx, Bucket::Filename, &new_record.filename, &new_record.id)?;
        rename_ctime(&tx, &new_record.ctime, old_id, &new_record.id)?;
        tx.commit()?;
        Ok(())
    }

    // ---- Buckets ----

    /// Add `id` under `value` in `bucket` (idempotent; empty/zero values are skipped).
    pub fn attribute_insert(&mut self, bucket: Bucket, value: &str, id: &str) -> Result<()> {
        attribute_insert(&self.conn, bucket, value, id)
    }

    /// IDs whose `bucket` key matches `pattern` under `mode`.
    ///
    /// `Exact` is a direct key lookup (`NotFound` when absent); the other modes scan all keys
    /// and union the matching sets.
    pub fn search_ids(
        &self,
        pattern: &str,
        mode: MatchMode,
        bucket: Bucket,
    ) -> Result<BTreeSet<String>> {
        match mode {
            MatchMode::Exact => bucket_ids(&self.conn, bucket, pattern)?
                .ok_or_else(|| Error::NotFound(format!("{bucket} {pattern:?}"))),
            _ => Ok(bucket_entries(&self.conn, bucket)?
                .into_iter()
                .filter(|(key, _)| mode.matches(key, pattern))
                .flat_map(|(_, ids)| ids)
                .collect()),
        }
    }

    /// [`Self::search_ids`] resolved through the primary store.
    pub fn search(&self, pattern: &str, mode: MatchMode, bucket: Bucket) -> Result<Vec<FileRecord>> {
        let ids = self.search_ids(pattern, mode, bucket)?;
        self.resolve(ids)
    }

    /// Records for `ids`. IDs left behind in a lazy bucket after a delete are skipped.
    fn resolve<I: IntoIterator<Item = String>>(&self, ids: I) -> Result<Vec<FileRecord>> {
        let mut files = Vec::new();
        for id in ids {
            match get_record(&self.conn, &id)? {
                Some(f) => files.push(f),
                None => debug!("Skipping stale bucket entry {id}; run `db cache` to refresh"),
            }
        }
        Ok(files)
    }

    /// Every key of `bucket` with the size of its ID set.
    pub fn key_cardinalities(&self, bucket: Bucket) -> Result<BTreeMap<String, usize>> {
        key_cardinalities(&self.conn, bucket)
    }

    /// Distinct key count per bucket.
    pub fn bucket_key_counts(&self) -> Result<Vec<(Bucket, usize)>> {
        Bucket::ALL
            .iter()
            .map(|b| Ok((*b, key_cardinalities(&self.conn, *b)?.len())))
            .collect()
    }

    /// Up to `limit` IDs in `bucket` key order (numeric for Size/Like).
    pub fn sorted_ids(&self, bucket: Bucket, limit: usize, descending: bool) -> Result<Vec<String>> {
        let mut keyed: Vec<(String, BTreeSet<String>)> =
            bucket_entries(&self.conn, bucket)?.into_iter().collect();
        if bucket.is_numeric() {
            keyed.sort_by(|(a, _), (b, _)| {
                let na = a.parse::<i64>().unwrap_or(0);
                let nb = b.parse::<i64>().unwrap_or(0);
                na.cmp(&nb).then_with(|| a.cmp(b))
            });
        }
        if descending {
            keyed.reverse();
        }
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        'outer: for (_, set) in keyed {
            for id in set {
                if ids.len() >= limit {
                    break 'outer;
                }
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// [`Self::sorted_ids`] resolved through the primary store.
    pub fn sorted_files(&self, bucket: Bucket, limit: usize, descending: bool) -> Result<Vec<FileRecord>> {
        let ids = self.sorted_ids(bucket, limit, descending)?;
        self.resolve(ids)
    }
}

fn rename_ctime(conn: &Connection, ctime: &str, old_id: &str, new_id: &str) -> Result<()> {
    if !key_exists(conn, Bucket::CTime, ctime)? {
        return Err(Error::Inconsistent(format!(
            "ctime bucket has no key {ctime:?}; run `db cache` before renaming"
        )));
    }
    remove_id_from_key(conn, Bucket::CTime, ctime, old_id)?;
    attribute_insert(conn, Bucket::CTime, ctime, new_id)
}

/// Every sidecar's ID must be derived from its filename, and no two may share one.
fn check_sidecar_ids(records: &[FileRecord]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(records.len());
    for r in records {
        let expected = name_to_id(&r.filename);
        if r.id != expected {
            return Err(Error::Inconsistent(format!(
                "sidecar for {:?} has id {} but its filename maps to {}",
                r.filename, r.id, expected
            )));
        }
        if let Some(existing) = seen.insert(r.id.as_str(), r.filename.as_str()) {
            return Err(Error::IdCollision {
                id: r.id.clone(),
                existing: existing.to_string(),
                incoming: r.filename.clone(),
            });
        }
    }
    Ok(())
}
