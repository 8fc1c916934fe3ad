//! Metadata sidecars: `metadata/<filename>.json`, the ground truth for the index.

use log::debug;
use std::path::Path;

use crate::FileRecord;
use crate::engine::tools::regular_file_names;
use crate::error::{Error, Result};
use crate::project::ProjectLayout;
use crate::utils::config::ProjectFiles;
use crate::utils::{read_json, write_json_atomic};

pub fn read_sidecar(path: &Path) -> Result<FileRecord> {
    read_json(path)
}

/// Write the sidecar for `record` and return the bytes written.
pub fn write_sidecar(layout: &ProjectLayout, record: &FileRecord) -> Result<Vec<u8>> {
    let path = layout.meta_path(&record.filename);
    debug!("Write => {}", path.display());
    write_json_atomic(record, &path)
}

/// Decode every sidecar in the metadata directory, in filename order.
/// A sidecar whose `filename` field disagrees with its own name is `Inconsistent`.
pub fn read_all_sidecars(layout: &ProjectLayout) -> Result<Vec<FileRecord>> {
    let dir = layout.metadata_dir();
    let mut records = Vec::new();
    for name in regular_file_names(&dir)? {
        let Some(stem) = name.strip_suffix(ProjectFiles::SIDECAR_EXT) else {
            continue;
        };
        let path = dir.join(&name);
        let record = read_sidecar(&path)?;
        if record.filename != stem {
            return Err(Error::Inconsistent(format!(
                "{} describes {:?}",
                path.display(),
                record.filename
            )));
        }
        records.push(record);
    }
    Ok(records)
}
