//! Database operations: schema, open/lock, primary store and bucket primitives.

mod buckets;
mod connection;
mod lock;
mod records;

pub use buckets::{
    attribute_insert, bucket_entries, bucket_ids, clear_bucket, key_cardinalities, key_exists,
    populate_buckets, remove_id_from_key,
};
pub use connection::{open_db, open_db_in_memory};
pub use lock::StoreLock;
pub use records::{
    all_records, delete_record, file_count_and_size, get_record, insert_record, record_exists,
    update_record,
};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// `files` is the primary store (id → record JSON); `buckets` holds every inverted index,
/// one row per (bucket, key, id) so membership is a set by construction.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS buckets (
    bucket TEXT NOT NULL,
    key TEXT NOT NULL,
    file_id TEXT NOT NULL,
    PRIMARY KEY (bucket, key, file_id)
);
CREATE INDEX IF NOT EXISTS idx_buckets_file ON buckets(bucket, file_id);
"#;

pub(crate) const INSERT_RECORD_SQL: &str = "INSERT INTO files (id, data) VALUES (?1, ?2)";

pub(crate) const INSERT_BUCKET_SQL: &str =
    "INSERT OR IGNORE INTO buckets (bucket, key, file_id) VALUES (?1, ?2, ?3)";
