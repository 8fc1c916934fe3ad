//! Project-level file operations: init, add from `input/`, delete to the recycle bin, rename,
//! like.
//!
//! Each operation validates everything it can before touching the disk, then writes sidecars
//! and content, then updates the index in one transaction and the ledger last.

use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::engine::hashing::hash_file;
use crate::engine::sidecar::write_sidecar;
use crate::engine::tools::{
    check_filename, name_to_id, now_string, regular_file_names, type_by_filename,
};
use crate::error::{Error, PathContext, Result};
use crate::index::IndexEngine;
use crate::integrity::Ledger;
use crate::project::{ProjectContext, ProjectLayout};
use crate::utils::{LockConsts, ProjectFiles};
use crate::{FileRecord, ProjectInfo};

/// Create a project in `root`, which must be empty (it is created if missing).
pub fn init(root: &Path, name: &str, is_backup: bool) -> Result<ProjectContext> {
    if name.trim().is_empty() {
        return Err(Error::Inconsistent("project name must not be empty".to_string()));
    }
    fs::create_dir_all(root).at(root)?;
    if fs::read_dir(root).at(root)?.next().is_some() {
        return Err(Error::AlreadyExists(format!(
            "{} is not empty; init needs an empty folder",
            root.display()
        )));
    }

    let layout = ProjectLayout::new(root);
    for dir in layout.dirs() {
        fs::create_dir_all(&dir).at(&dir)?;
    }
    let mut info = ProjectInfo::new(name);
    info.is_backup = is_backup;
    let ctx = ProjectContext { layout, info };
    ctx.save_info()?;
    Ledger::empty(ctx.layout.ledger_path()).save()?;
    IndexEngine::open(
        &ctx.layout,
        std::time::Duration::from_millis(LockConsts::DEFAULT_TIMEOUT_MS),
    )?;
    info!("Created project {name:?} in {}", root.display());
    Ok(ctx)
}

/// Regular files waiting in `input/`.
pub fn pending_inputs(ctx: &ProjectContext) -> Result<Vec<String>> {
    regular_file_names(&ctx.layout.input_dir())
}

/// Records for `names` in `input/`, hashed but not yet written anywhere.
///
/// Fails before any write if a name is invalid, its ID is taken (`AlreadyExists` for the
/// same filename, `IdCollision` otherwise) or its destination already exists.
pub fn prepare_inputs(
    ctx: &ProjectContext,
    index: &IndexEngine,
    names: &[String],
) -> Result<Vec<FileRecord>> {
    let layout = &ctx.layout;
    let mut batch: HashMap<String, &str> = HashMap::new();
    let mut records = Vec::with_capacity(names.len());

    for name in names {
        check_filename(name)?;
        let id = name_to_id(name);
        if let Some(existing) = index.find(&id)? {
            return Err(collision(&id, existing.filename, name));
        }
        if let Some(other) = batch.insert(id.clone(), name) {
            return Err(collision(&id, other.to_string(), name));
        }
        for dst in [layout.file_path(name), layout.meta_path(name)] {
            if dst.exists() {
                return Err(Error::AlreadyExists(dst.display().to_string()));
            }
        }

        let src = layout.input_dir().join(name);
        let (checksum, size) = hash_file(&src)?;
        let mut record = FileRecord::new(name);
        record.checksum = checksum;
        record.size = size;
        record.file_type = type_by_filename(name);
        records.push(record);
    }
    Ok(records)
}

fn collision(id: &str, existing: String, incoming: &str) -> Error {
    if existing == incoming {
        Error::AlreadyExists(format!("{incoming} (id {id})"))
    } else {
        Error::IdCollision {
            id: id.to_string(),
            existing,
            incoming: incoming.to_string(),
        }
    }
}

/// Move `names` from `input/` into the project.
pub fn add_from_input(
    ctx: &ProjectContext,
    index: &mut IndexEngine,
    ledger: &mut Ledger,
    names: &[String],
) -> Result<Vec<FileRecord>> {
    ctx.ensure_not_backup()?;
    let records = prepare_inputs(ctx, index, names)?;
    let layout = &ctx.layout;

    for r in &records {
        write_sidecar(layout, r)?;
        let src = layout.input_dir().join(&r.filename);
        let dst = layout.file_path(&r.filename);
        info!("Add => {}", dst.display());
        fs::rename(&src, &dst).at(&src)?;
    }

    index.put_all(&records)?;
    index.rebuild_ctime_only()?;
    for r in &records {
        ledger.insert_new(&r.id, &r.ctime);
    }
    ledger.save_if_changed()?;
    Ok(records)
}

/// Move content and sidecars of `ids` to `recyclebin/` and drop them from index and ledger.
pub fn delete(
    ctx: &ProjectContext,
    index: &mut IndexEngine,
    ledger: &mut Ledger,
    ids: &[String],
) -> Result<Vec<FileRecord>> {
    ctx.ensure_not_backup()?;
    let ids: Vec<String> = ids.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let records = ids
        .iter()
        .map(|id| index.get(id))
        .collect::<Result<Vec<_>>>()?;

    let layout = &ctx.layout;
    let bin = layout.recyclebin_dir();
    for r in &records {
        let meta = layout.meta_path(&r.filename);
        let content = layout.file_path(&r.filename);
        for src in [meta, content] {
            if let Some(file_name) = src.file_name() {
                let dst = bin.join(file_name);
                info!("Delete => {}", dst.display());
                fs::rename(&src, &dst).at(&src)?;
            }
        }
    }

    index.delete(&ids)?;
    index.rebuild_ctime_only()?;
    for id in &ids {
        ledger.remove(id);
    }
    ledger.save_if_changed()?;
    Ok(records)
}

/// Rename the file with `id` to `new_name`. Its ID changes with the name.
pub fn rename(
    ctx: &ProjectContext,
    index: &mut IndexEngine,
    ledger: &mut Ledger,
    id: &str,
    new_name: &str,
) -> Result<FileRecord> {
    ctx.ensure_not_backup()?;
    check_filename(new_name)?;
    let old = index.get(id)?;
    let new_id = name_to_id(new_name);
    if let Some(existing) = index.find(&new_id)? {
        return Err(collision(&new_id, existing.filename, new_name));
    }

    let layout = &ctx.layout;
    let moves = [
        (layout.meta_path(&old.filename), layout.meta_path(new_name)),
        (layout.file_path(&old.filename), layout.file_path(new_name)),
    ];
    for (src, dst) in &moves {
        if !src.exists() {
            return Err(Error::NotFound(src.display().to_string()));
        }
        if dst.exists() {
            return Err(Error::AlreadyExists(dst.display().to_string()));
        }
    }

    let mut record = old.clone();
    record.id = new_id.clone();
    record.filename = new_name.to_string();

    let [(old_meta, _), (old_content, new_content)] = moves;
    write_sidecar(layout, &record)?;
    let binned = layout
        .recyclebin_dir()
        .join(format!("{}{}", old.filename, ProjectFiles::SIDECAR_EXT));
    debug!("Rename: {} => {}", old_meta.display(), binned.display());
    fs::rename(&old_meta, &binned).at(&old_meta)?;
    info!("Rename: {} => {}", old_content.display(), new_content.display());
    fs::rename(&old_content, &new_content).at(&old_content)?;

    index.rename_record(id, &record)?;

    match ledger.get(id).cloned() {
        Some(entry) => {
            ledger.remove(id);
            ledger.set(&new_id, &entry.checked, entry.damaged);
        }
        None => ledger.reset(&new_id),
    }
    ledger.save_if_changed()?;
    Ok(record)
}

/// Set the Like score of `id` to `n` and bump its UTime, rewriting sidecar and record.
/// Returns the record and whether anything changed; an equal score writes nothing.
pub fn like(
    ctx: &ProjectContext,
    index: &mut IndexEngine,
    id: &str,
    n: i64,
) -> Result<(FileRecord, bool)> {
    ctx.ensure_not_backup()?;
    let mut record = index.get(id)?;
    if record.like == n {
        return Ok((record, false));
    }
    record.like = n;
    record.utime = now_string();
    write_sidecar(&ctx.layout, &record)?;
    index.update(&record)?;
    debug!("Like {} => {}", record.filename, n);
    Ok((record, true))
}
