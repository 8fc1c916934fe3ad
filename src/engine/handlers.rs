//! Command handlers: open the project context, call the library, print reports.

use anyhow::{Result, bail};
use log::{info, warn};
use std::path::Path;
use std::time::Duration;

use crate::{FileRecord, Freshness};
use crate::backup::{
    FixReport, FixSide, ProjectStatus, SysinfoProbe, auto_fix, changed_files, check_status,
    sync_backup,
};
use crate::engine::arg_parser::{
    BackupArgs, CheckArgs, DbAction, ListArgs, ListOrder, SearchArgs, SearchOrder,
};
use crate::engine::tools::{file_size_to_string, names_to_ids, now};
use crate::index::IndexEngine;
use crate::integrity::{Ledger, SweepOptions, damaged_report, renew, sweep};
use crate::orphan::find_orphans;
use crate::project::ProjectContext;
use crate::store;
use crate::utils::{Settings, to_pretty_json};

/// What every handler needs besides its own arguments.
pub struct RunEnv {
    pub dir: std::path::PathBuf,
    pub verbose: bool,
    pub settings: Settings,
}

impl RunEnv {
    fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.lock_timeout_ms)
    }

    fn open(&self) -> Result<(ProjectContext, IndexEngine)> {
        open_at(&self.dir, self.lock_timeout())
    }
}

fn open_at(root: &Path, timeout: Duration) -> Result<(ProjectContext, IndexEngine)> {
    let ctx = ProjectContext::open(root)?;
    let index = IndexEngine::open(&ctx.layout, timeout)?;
    Ok((ctx, index))
}

fn print_files(files: &[FileRecord], more: bool) -> Result<()> {
    if files.is_empty() {
        println!("No files.");
        return Ok(());
    }
    for f in files {
        if more {
            println!("{}", String::from_utf8_lossy(&to_pretty_json(f)?));
        } else {
            let size = format!("({})", file_size_to_string(f.size, 2));
            println!("{:<8} {:<11} {}", f.id, size, f.filename);
        }
    }
    Ok(())
}

pub fn handle_init(env: &RunEnv, name: &str, backup: bool) -> Result<()> {
    let ctx = store::init(&env.dir, name, backup)?;
    println!("Created {}", ctx.layout.info_path().display());
    Ok(())
}

pub fn handle_add(env: &RunEnv, danger: bool) -> Result<()> {
    let (ctx, mut index) = env.open()?;
    ctx.ensure_not_backup()?;
    let names = store::pending_inputs(&ctx)?;
    if names.is_empty() {
        println!("No new files in {}", ctx.layout.input_dir().display());
        return Ok(());
    }
    if !danger {
        let records = store::prepare_inputs(&ctx, &index, &names)?;
        print_files(&records, false)?;
        println!("Preview only; add --danger to add {} files.", records.len());
        return Ok(());
    }
    let mut ledger = Ledger::load(&ctx.layout.ledger_path())?;
    let added = store::add_from_input(&ctx, &mut index, &mut ledger, &names)?;
    println!("Added {} files.", added.len());
    Ok(())
}

pub fn handle_delete(env: &RunEnv, ids: &[String], names: &[String], danger: bool) -> Result<()> {
    let (ctx, mut index) = env.open()?;
    let ids = if ids.is_empty() {
        names_to_ids(names)
    } else {
        ids.to_vec()
    };
    let records = ids
        .iter()
        .map(|id| index.get(id))
        .collect::<crate::Result<Vec<_>>>()?;
    if !danger {
        print_files(&records, false)?;
        println!("Preview only; add --danger to delete {} files.", records.len());
        return Ok(());
    }
    let mut ledger = Ledger::load(&ctx.layout.ledger_path())?;
    let deleted = store::delete(&ctx, &mut index, &mut ledger, &ids)?;
    println!(
        "Moved {} files to {}",
        deleted.len(),
        ctx.layout.recyclebin_dir().display()
    );
    Ok(())
}

pub fn handle_rename(env: &RunEnv, id: &str, new_name: &str) -> Result<()> {
    let (ctx, mut index) = env.open()?;
    let mut ledger = Ledger::load(&ctx.layout.ledger_path())?;
    let record = store::rename(&ctx, &mut index, &mut ledger, id, new_name)?;
    println!("{} => {} {}", id, record.id, record.filename);
    Ok(())
}

pub fn handle_like(env: &RunEnv, id: &str, n: i64) -> Result<()> {
    let (ctx, mut index) = env.open()?;
    let (record, changed) = store::like(&ctx, &mut index, id, n)?;
    println!("like={} [{}] {}", record.like, record.id, record.filename);
    if changed {
        println!("UTime = {}", record.utime);
    } else {
        println!("Unchanged.");
    }
    Ok(())
}

pub fn handle_orphan(env: &RunEnv) -> Result<()> {
    let ctx = ProjectContext::open(&env.dir)?;
    let orphans = find_orphans(&ctx.layout)?;
    if orphans.is_empty() {
        println!("No orphans.");
        return Ok(());
    }
    for name in &orphans.files_only {
        println!("content without metadata: {name}");
    }
    for name in &orphans.metadata_only {
        println!("metadata without content: {name}");
    }
    bail!("{} orphans in {}", orphans.len(), ctx.root().display())
}

pub fn handle_db(env: &RunEnv, action: DbAction) -> Result<()> {
    let (ctx, mut index) = env.open()?;
    match action {
        DbAction::Rebuild => {
            let n = index.rebuild_all(&ctx.layout)?;
            println!("Rebuilt index from {n} sidecars.");
        }
        DbAction::Cache => {
            let n = index.rebuild_cache()?;
            println!("Refreshed buckets for {n} files.");
        }
        DbAction::Count => {
            let (count, _) = index.total_size()?;
            println!("{:<11} {:>6} files ({})", "primary", count, Freshness::PRIMARY_STORE);
            for (bucket, keys) in index.bucket_key_counts()? {
                println!("{:<11} {:>6} keys  ({})", bucket.name(), keys, bucket.freshness());
            }
        }
        DbAction::Size => {
            let (count, size) = index.total_size()?;
            println!("{count} files, {}", file_size_to_string(size, 2));
        }
    }
    Ok(())
}

pub fn handle_check(env: &RunEnv, args: &CheckArgs) -> Result<()> {
    let main = ProjectContext::open(&env.dir)?;
    if args.projects {
        for slot in 0..main.info.projects.len() {
            print_project_status(&main, slot, env.lock_timeout());
        }
        return Ok(());
    }

    let root = if args.n == 0 {
        main.root().to_path_buf()
    } else {
        main.backup_root(args.n)?
    };
    let (ctx, index) = open_at(&root, env.lock_timeout())?;
    let ledger_path = ctx.layout.ledger_path();

    if args.renew {
        let ledger = renew(&ledger_path, &index)?;
        println!("Created {} with {} entries.", ledger_path.display(), ledger.len());
        return Ok(());
    }

    let mut ledger = Ledger::load(&ledger_path)?;
    let opts = SweepOptions {
        interval_days: ctx.info.check_interval,
        budget_bytes: ctx.info.check_size_limit,
        show_progress: env.verbose,
    };
    let report = sweep(&mut ledger, &index, &ctx.layout, &opts, &now())?;
    println!(
        "Checked {} files ({}).",
        report.checked,
        file_size_to_string(report.bytes, 2)
    );
    let damaged = damaged_report(&ledger, &index)?;
    if damaged.is_empty() {
        return Ok(());
    }
    for (id, name) in &damaged {
        println!("damaged: {id} {name}");
    }
    bail!("{} damaged files in {}", damaged.len(), ctx.root().display())
}

fn print_project_status(main: &ProjectContext, slot: usize, timeout: Duration) {
    let root = if slot == 0 {
        Ok(main.root().to_path_buf())
    } else {
        main.backup_root(slot)
    };
    let status = root
        .map_err(anyhow::Error::from)
        .and_then(|root| open_at(&root, timeout))
        .and_then(|(ctx, index)| Ok(ProjectStatus::collect(&ctx, &index)?));
    match status {
        Ok(status) => {
            print!("[{slot}] ");
            status.print();
        }
        Err(e) => warn!("[{slot}] {}: {e:#}", main.info.projects[slot]),
    }
}

pub fn handle_backup(env: &RunEnv, args: &BackupArgs) -> Result<()> {
    let (mut main, main_index) = env.open()?;
    let Some(slot) = args.n else {
        for (i, (root, at)) in main
            .info
            .projects
            .iter()
            .zip(&main.info.last_backup_at)
            .enumerate()
        {
            let at = if at.is_empty() { "never" } else { at.as_str() };
            println!("[{i}] {root}  (last backup: {at})");
        }
        return Ok(());
    };
    main.ensure_not_backup()?;

    let bk_root = main.backup_root(slot)?;
    let (mut backup, mut bk_index) = open_at(&bk_root, env.lock_timeout())?;
    let main_status = ProjectStatus::collect(&main, &main_index)?;
    let bk_status = ProjectStatus::collect(&backup, &bk_index)?;
    main_status.print();
    bk_status.print();
    check_status(&main_status, &bk_status, args.fix, &SysinfoProbe)?;

    if args.fix {
        let mut main_ledger = Ledger::load(&main.layout.ledger_path())?;
        let mut bk_ledger = Ledger::load(&backup.layout.ledger_path())?;
        let (main_report, bk_report) = auto_fix(
            FixSide {
                layout: &main.layout,
                index: &main_index,
                ledger: &mut main_ledger,
            },
            FixSide {
                layout: &backup.layout,
                index: &bk_index,
                ledger: &mut bk_ledger,
            },
        )?;
        print_fix_report(main.root(), &main_report);
        print_fix_report(backup.root(), &bk_report);
        let unfixed = main_report.unfixed.len() + bk_report.unfixed.len();
        if unfixed > 0 {
            bail!("{unfixed} damaged files could not be repaired");
        }
        return Ok(());
    }

    let changes = changed_files(&main_index, &bk_index)?;
    changes.print_summary();
    if !args.danger {
        println!("Preview only; add --danger to sync.");
        return Ok(());
    }
    sync_backup(
        &mut main,
        &mut backup,
        &mut bk_index,
        slot,
        &changes,
        env.verbose,
    )?;
    info!("Backup {} is up to date", backup.root().display());
    Ok(())
}

fn print_fix_report(root: &Path, report: &FixReport) {
    for f in &report.fixed {
        println!("fixed in {}: {}", root.display(), f.filename);
    }
    for f in &report.unfixed {
        println!("unfixed in {}: {}", root.display(), f.filename);
    }
}

pub fn handle_search(env: &RunEnv, args: &SearchArgs) -> Result<()> {
    let (_ctx, index) = env.open()?;
    let mode = args.mode.unwrap_or_else(|| args.attr.default_mode());
    let mut files = index.search(&args.pattern, mode, args.attr.bucket())?;

    let order = args.orderby.or_else(|| {
        env.settings
            .order_by
            .as_deref()
            .and_then(|s| <SearchOrder as clap::ValueEnum>::from_str(s, true).ok())
    });
    match order.unwrap_or(SearchOrder::Ctime) {
        SearchOrder::Ctime => files.sort_by(|a, b| a.ctime.cmp(&b.ctime)),
        SearchOrder::Utime => files.sort_by(|a, b| a.utime.cmp(&b.utime)),
        SearchOrder::Filename => files.sort_by(|a, b| a.filename.cmp(&b.filename)),
    }
    if !args.asc {
        files.reverse();
    }
    files.truncate(args.limit.unwrap_or(env.settings.list_limit));
    print_files(&files, args.more)
}

pub fn handle_list(env: &RunEnv, args: &ListArgs) -> Result<()> {
    let (_ctx, index) = env.open()?;
    if let Some(keys) = args.keys {
        for (key, count) in index.key_cardinalities(keys.bucket())? {
            println!("{count:>6}  {key}");
        }
        return Ok(());
    }
    let order = args.orderby.or_else(|| {
        env.settings
            .order_by
            .as_deref()
            .and_then(|s| <ListOrder as clap::ValueEnum>::from_str(s, true).ok())
    });
    let bucket = order.unwrap_or(ListOrder::Ctime).bucket();
    let limit = args.limit.unwrap_or(env.settings.list_limit);
    let files = index.sorted_files(bucket, limit, !args.asc)?;
    print_files(&files, args.more)
}
