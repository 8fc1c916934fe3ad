mod common;

use common::{TestProject, record};
use std::fs;
use std::path::{Path, PathBuf};
use stowage::backup::{
    ProjectStatus, SpaceProbe, apply_changes, auto_fix_one_way, changed_files, check_status,
    sync_backup,
};
use stowage::engine::tools::{EPOCH, now_string};
use stowage::utils::GIB;
use stowage::{Error, IndexEngine, ProjectInfo, Result};

struct FixedSpace(u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> Result<u64> {
        Ok(self.0)
    }
}

fn status(name: &str, is_backup: bool, total_size: u64, damaged_count: usize) -> ProjectStatus {
    let mut info = ProjectInfo::new(name);
    info.is_backup = is_backup;
    ProjectStatus {
        root: PathBuf::from(if is_backup { "/bk" } else { "/main" }),
        info,
        files_count: 0,
        total_size,
        damaged_count,
    }
}

fn names(list: &[stowage::backup::ChangedFile]) -> Vec<&str> {
    list.iter().map(|f| f.filename.as_str()).collect()
}

// --- diff ---

#[test]
fn test_changed_files_classification() {
    let mut main = IndexEngine::in_memory().unwrap();
    let mut bk = IndexEngine::in_memory().unwrap();

    let same = record("A", "same.txt");
    let mut content = record("B", "content.txt");
    let mut meta = record("C", "meta.txt");
    main.put_all(&[same.clone(), content.clone(), meta.clone(), record("D", "new.txt")])
        .unwrap();

    content.checksum = "old-sum".to_string();
    meta.utime = "2023-12-31 00:00:00+00:00".to_string();
    bk.put_all(&[same, content, meta, record("E", "gone.txt")]).unwrap();

    let changes = changed_files(&main, &bk).unwrap();
    assert_eq!(names(&changes.deleted), vec!["gone.txt"]);
    assert_eq!(names(&changes.overwritten), vec!["content.txt"]);
    assert_eq!(names(&changes.updated), vec!["meta.txt"]);
    assert_eq!(names(&changes.added), vec!["new.txt"]);
    assert_eq!(changes.len(), 4);
}

#[test]
fn test_changed_files_identical_is_empty() {
    let mut main = IndexEngine::in_memory().unwrap();
    let mut bk = IndexEngine::in_memory().unwrap();
    main.put("A", &record("A", "a.txt")).unwrap();
    bk.put("A", &record("A", "a.txt")).unwrap();
    assert!(changed_files(&main, &bk).unwrap().is_empty());
}

// --- pre-flight ---

#[test]
fn test_check_status_passes() {
    let main = status("demo", false, 10 * GIB, 0);
    let bk = status("demo", true, 8 * GIB, 0);
    check_status(&main, &bk, false, &FixedSpace(3 * GIB)).unwrap();
}

#[test]
fn test_check_status_name_mismatch() {
    let main = status("demo", false, 0, 0);
    let bk = status("other", true, 0, 0);
    assert!(matches!(
        check_status(&main, &bk, false, &FixedSpace(u64::MAX)),
        Err(Error::Inconsistent(_))
    ));
}

#[test]
fn test_check_status_target_not_backup() {
    let main = status("demo", false, 0, 0);
    let bk = status("demo", false, 0, 0);
    assert!(matches!(
        check_status(&main, &bk, false, &FixedSpace(u64::MAX)),
        Err(Error::Inconsistent(_))
    ));
}

#[test]
fn test_check_status_damage_needs_fix_mode() {
    let main = status("demo", false, 0, 1);
    let bk = status("demo", true, 0, 0);
    assert!(matches!(
        check_status(&main, &bk, false, &FixedSpace(u64::MAX)),
        Err(Error::Inconsistent(_))
    ));
    check_status(&main, &bk, true, &FixedSpace(u64::MAX)).unwrap();
}

#[test]
fn test_check_status_insufficient_space() {
    let main = status("demo", false, 5 * GIB, 0);
    let bk = status("demo", true, 2 * GIB, 0);
    match check_status(&main, &bk, false, &FixedSpace(4 * GIB - 1)) {
        Err(Error::InsufficientSpace { needed, available, .. }) => {
            assert_eq!(needed, 4 * GIB);
            assert_eq!(available, 4 * GIB - 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_check_status_smaller_source_still_needs_margin() {
    let main = status("demo", false, GIB, 0);
    let bk = status("demo", true, 2 * GIB, 0);
    assert!(check_status(&main, &bk, false, &FixedSpace(GIB - 1)).is_err());
    check_status(&main, &bk, false, &FixedSpace(GIB)).unwrap();
}

// --- sync ---

#[test]
fn test_sync_backup_end_to_end() {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new_backup("demo");
    main.register_backup(&bk);
    main.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo"), ("c.txt", "charlie")]);

    let changes = changed_files(&main.index, &bk.index).unwrap();
    assert_eq!(changes.added.len(), 3);
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &changes, false).unwrap();

    assert_eq!(fs::read(bk.ctx.layout.file_path("b.txt")).unwrap(), b"bravo");
    assert!(bk.ctx.layout.meta_path("b.txt").is_file());
    assert_eq!(bk.index.all_files().unwrap(), main.index.all_files().unwrap());
    assert!(changed_files(&main.index, &bk.index).unwrap().is_empty());

    let bk_ledger = bk.reload_ledger();
    assert_eq!(bk_ledger.len(), 3);
    assert!(bk_ledger.entries().all(|e| e.checked == EPOCH));

    let main_info = stowage::ProjectContext::open(main.dir.path()).unwrap().info;
    let bk_info = stowage::ProjectContext::open(bk.dir.path()).unwrap().info;
    assert!(!main_info.last_backup_at[0].is_empty());
    assert_eq!(main_info.last_backup_at[0], main_info.last_backup_at[1]);
    assert!(bk_info.is_backup);
    assert_eq!(bk_info.project_name, "demo");
    assert_eq!(bk_info.last_backup_at, main_info.last_backup_at);
}

#[test]
fn test_sync_backup_propagates_delete() {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new_backup("demo");
    main.register_backup(&bk);
    let added = main.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let first = changed_files(&main.index, &bk.index).unwrap();
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &first, false).unwrap();

    stowage::store::delete(
        &main.ctx,
        &mut main.index,
        &mut main.ledger,
        &[added[0].id.clone()],
    )
    .unwrap();
    let second = changed_files(&main.index, &bk.index).unwrap();
    assert_eq!(names(&second.deleted), vec!["a.txt"]);
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &second, false).unwrap();

    assert!(!bk.ctx.layout.file_path("a.txt").exists());
    assert!(!bk.ctx.layout.meta_path("a.txt").exists());
    assert_eq!(bk.index.all_ids().unwrap(), vec![added[1].id.clone()]);
    assert!(bk.reload_ledger().get(&added[0].id).is_none());
}

#[test]
fn test_apply_changes_aborts_on_first_error() {
    let mut main = TestProject::new("demo");
    let bk = TestProject::new_backup("demo");
    main.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let changes = changed_files(&main.index, &bk.index).unwrap();
    fs::remove_file(main.ctx.layout.file_path("a.txt")).unwrap();

    assert!(apply_changes(&main.ctx.layout, &bk.ctx.layout, &changes, false).is_err());
    assert!(!bk.ctx.layout.file_path("b.txt").exists());
}

// --- auto-fix ---

fn mirrored_pair() -> (TestProject, TestProject, String) {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new("demo");
    let added = main.add_files(&[("a.txt", "alpha")]);
    bk.add_files(&[("a.txt", "alpha")]);
    bk.mark_backup();
    (main, bk, added[0].id.clone())
}

#[test]
fn test_auto_fix_restores_from_other_side() {
    let (mut main, bk, id) = mirrored_pair();
    fs::write(main.ctx.layout.file_path("a.txt"), "rotted").unwrap();
    main.ledger.set(&id, &now_string(), true);

    let report =
        auto_fix_one_way(&main.ctx.layout, &main.index, &mut main.ledger, &bk.ctx.layout).unwrap();

    assert_eq!(names(&report.fixed), vec!["a.txt"]);
    assert!(report.unfixed.is_empty());
    assert_eq!(fs::read(main.ctx.layout.file_path("a.txt")).unwrap(), b"alpha");
    assert!(!main.reload_ledger().get(&id).unwrap().damaged);
}

#[test]
fn test_auto_fix_leaves_unrepairable_damage() {
    let (mut main, bk, id) = mirrored_pair();
    fs::write(main.ctx.layout.file_path("a.txt"), "rotted").unwrap();
    fs::write(bk.ctx.layout.file_path("a.txt"), "also rotted").unwrap();
    main.ledger.set(&id, &now_string(), true);
    main.ledger.save().unwrap();

    let report =
        auto_fix_one_way(&main.ctx.layout, &main.index, &mut main.ledger, &bk.ctx.layout).unwrap();

    assert!(report.fixed.is_empty());
    assert_eq!(names(&report.unfixed), vec!["a.txt"]);
    assert_eq!(fs::read(main.ctx.layout.file_path("a.txt")).unwrap(), b"rotted");
    assert!(main.reload_ledger().get(&id).unwrap().damaged);
}

#[test]
fn test_auto_fix_missing_counterpart_is_unfixed() {
    let (mut main, bk, id) = mirrored_pair();
    fs::remove_file(bk.ctx.layout.file_path("a.txt")).unwrap();
    main.ledger.set(&id, &now_string(), true);

    let report =
        auto_fix_one_way(&main.ctx.layout, &main.index, &mut main.ledger, &bk.ctx.layout).unwrap();
    assert_eq!(names(&report.unfixed), vec!["a.txt"]);
}

#[test]
fn test_auto_fix_keeps_tmp_named_neighbour() {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new("demo");
    let added = main.add_files(&[("a.txt", "alpha"), ("a.txt.tmp", "precious")]);
    bk.add_files(&[("a.txt", "alpha"), ("a.txt.tmp", "precious")]);
    bk.mark_backup();
    let id = added[0].id.clone();
    fs::write(main.ctx.layout.file_path("a.txt"), "rotted").unwrap();
    main.ledger.set(&id, &now_string(), true);

    let report =
        auto_fix_one_way(&main.ctx.layout, &main.index, &mut main.ledger, &bk.ctx.layout).unwrap();

    assert_eq!(names(&report.fixed), vec!["a.txt"]);
    assert_eq!(fs::read(main.ctx.layout.file_path("a.txt")).unwrap(), b"alpha");
    assert_eq!(
        fs::read(main.ctx.layout.file_path("a.txt.tmp")).unwrap(),
        b"precious"
    );
    assert!(stowage::orphan::find_orphans(&main.ctx.layout).unwrap().is_empty());
    assert_eq!(main.index.rebuild_all(&main.ctx.layout).unwrap(), 2);
}

#[test]
fn test_sync_overwrite_keeps_tmp_named_neighbour() {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new_backup("demo");
    main.register_backup(&bk);
    main.add_files(&[("a.txt", "alpha"), ("a.txt.tmp", "precious")]);
    let first = changed_files(&main.index, &bk.index).unwrap();
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &first, false).unwrap();

    fs::write(bk.ctx.layout.file_path("a.txt"), "stale").unwrap();
    let mut stale = bk
        .index
        .all_files()
        .unwrap()
        .into_iter()
        .find(|f| f.filename == "a.txt")
        .unwrap();
    stale.checksum = "stale-sum".to_string();
    bk.index.update(&stale).unwrap();

    let second = changed_files(&main.index, &bk.index).unwrap();
    assert_eq!(names(&second.overwritten), vec!["a.txt"]);
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &second, false).unwrap();

    assert_eq!(fs::read(bk.ctx.layout.file_path("a.txt")).unwrap(), b"alpha");
    assert_eq!(
        fs::read(bk.ctx.layout.file_path("a.txt.tmp")).unwrap(),
        b"precious"
    );
    assert!(stowage::orphan::find_orphans(&bk.ctx.layout).unwrap().is_empty());
}

#[test]
fn test_sync_backup_without_changes_still_stamps_both() {
    let mut main = TestProject::new("demo");
    let mut bk = TestProject::new_backup("demo");
    main.register_backup(&bk);
    assert!(main.ctx.info.last_backup_at.iter().all(|t| t.is_empty()));

    let changes = changed_files(&main.index, &bk.index).unwrap();
    assert!(changes.is_empty());
    sync_backup(&mut main.ctx, &mut bk.ctx, &mut bk.index, 1, &changes, false).unwrap();

    let main_info = stowage::ProjectContext::open(main.dir.path()).unwrap().info;
    let bk_info = stowage::ProjectContext::open(bk.dir.path()).unwrap().info;
    assert!(!main_info.last_backup_at[0].is_empty());
    assert_eq!(main_info.last_backup_at[0], main_info.last_backup_at[1]);
    assert_eq!(bk_info.last_backup_at, main_info.last_backup_at);
    assert!(bk_info.is_backup);
}

#[test]
fn test_like_shows_up_as_updated() {
    let mut main = TestProject::new("demo");
    let added = main.add_files(&[("a.txt", "alpha")]);
    let mut old = added[0].clone();
    old.utime = "2020-01-01 00:00:00+00:00".to_string();
    main.index.update(&old).unwrap();

    let mut bk = IndexEngine::in_memory().unwrap();
    bk.put_all(std::slice::from_ref(&old)).unwrap();
    assert!(changed_files(&main.index, &bk).unwrap().is_empty());

    stowage::store::like(&main.ctx, &mut main.index, &old.id, 3).unwrap();

    let changes = changed_files(&main.index, &bk).unwrap();
    assert_eq!(names(&changes.updated), vec!["a.txt"]);
    assert!(changes.overwritten.is_empty());
}
