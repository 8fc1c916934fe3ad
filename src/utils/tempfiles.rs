//! Atomic writes: stage into an anonymous temp file in the target's directory, then persist
//! it over the target.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Error, PathContext, Result};

/// Open a uniquely named temp file next to `path` (same directory, so persisting stays
/// on one volume and never reuses a name that could belong to a stored file).
fn staging_file_for(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).at(dir)
}

/// Rename the staged file over `final_path`. The temp file is removed on failure.
fn persist_staged(staged: NamedTempFile, final_path: &Path) -> Result<()> {
    staged
        .persist(final_path)
        .map(|_| ())
        .map_err(|e| e.error)
        .at(final_path)
}

/// Pretty-print `value` with a 4-space indent.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Error::decode("serialize", e))?;
    Ok(buf)
}

/// Write `value` as pretty JSON to `path` atomically. Returns the bytes written.
pub fn write_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<Vec<u8>> {
    let data = to_pretty_json(value)?;
    let mut staged = staging_file_for(path)?;
    staged.write_all(&data).at(path)?;
    persist_staged(staged, path)?;
    Ok(data)
}

/// Read and decode a JSON file, tagging errors with its path.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path).at(path)?;
    serde_json::from_slice(&data).map_err(|e| Error::decode(path.display().to_string(), e))
}

/// Copy `src` over `dst` through a temp file, so `dst` is never left half-written.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let mut input = File::open(src).at(src)?;
    let mut staged = staging_file_for(dst)?;
    let n = io::copy(&mut input, staged.as_file_mut()).at(src)?;
    staged.as_file().sync_all().at(dst)?;
    persist_staged(staged, dst)?;
    Ok(n)
}
