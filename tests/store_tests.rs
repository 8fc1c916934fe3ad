mod common;

use common::TestProject;
use std::fs;
use stowage::engine::tools::name_to_id;
use stowage::orphan::find_orphans;
use stowage::{Bucket, Error, MatchMode, ProjectContext, store};

#[test]
fn test_init_refuses_non_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "x").unwrap();
    assert!(matches!(
        store::init(dir.path(), "demo", false),
        Err(Error::AlreadyExists(_))
    ));
}

#[test]
fn test_init_creates_recognizable_project() {
    let p = TestProject::new("demo");
    let ctx = ProjectContext::open(p.dir.path()).unwrap();
    assert_eq!(ctx.info.project_name, "demo");
    assert!(!ctx.info.is_backup);
    assert_eq!(ctx.info.projects.len(), ctx.info.last_backup_at.len());
    for dir in ctx.layout.dirs() {
        assert!(dir.is_dir());
    }
}

#[test]
fn test_open_rejects_foreign_project_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("project.json"), r#"{"RepoName": "something else", "ProjectName": "x", "CheckInterval": 1, "CheckSizeLimit": 1, "ExportSizeLimit": 1}"#).unwrap();
    assert!(matches!(
        ProjectContext::open(dir.path()),
        Err(Error::Inconsistent(_))
    ));
    let empty = tempfile::tempdir().unwrap();
    assert!(matches!(
        ProjectContext::open(empty.path()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_add_moves_input_and_indexes() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("hello.txt", "hi there")]);

    let f = &added[0];
    assert_eq!(f.id, "53KO8R");
    assert_eq!(f.size, 8);
    assert_eq!(f.file_type, "text/plain");
    assert!(!p.ctx.layout.input_dir().join("hello.txt").exists());
    assert!(p.ctx.layout.file_path("hello.txt").is_file());
    assert!(p.ctx.layout.meta_path("hello.txt").is_file());
    assert_eq!(p.index.get(&f.id).unwrap(), *f);
    assert_eq!(
        p.index
            .search_ids(&f.ctime, MatchMode::Exact, Bucket::CTime)
            .unwrap()
            .len(),
        1
    );
    assert!(!p.reload_ledger().get(&f.id).unwrap().damaged);
    assert!(store::pending_inputs(&p.ctx).unwrap().is_empty());
}

#[test]
fn test_add_duplicate_name_writes_nothing() {
    let mut p = TestProject::new("demo");
    p.add_files(&[("a.txt", "first")]);
    fs::write(p.ctx.layout.input_dir().join("a.txt"), "second").unwrap();

    let err = store::add_from_input(
        &p.ctx,
        &mut p.index,
        &mut p.ledger,
        &["a.txt".to_string()],
    )
    .unwrap_err();

    assert!(matches!(err, Error::AlreadyExists(_)));
    assert!(p.ctx.layout.input_dir().join("a.txt").exists());
    assert_eq!(fs::read(p.ctx.layout.file_path("a.txt")).unwrap(), b"first");
}

#[test]
fn test_add_refused_on_backup() {
    let mut p = TestProject::new_backup("demo");
    fs::write(p.ctx.layout.input_dir().join("a.txt"), "x").unwrap();
    assert!(matches!(
        store::add_from_input(&p.ctx, &mut p.index, &mut p.ledger, &["a.txt".to_string()]),
        Err(Error::Inconsistent(_))
    ));
}

#[test]
fn test_delete_moves_to_recyclebin() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let id = added[0].id.clone();

    store::delete(&p.ctx, &mut p.index, &mut p.ledger, &[id.clone()]).unwrap();

    let bin = p.ctx.layout.recyclebin_dir();
    assert!(bin.join("a.txt").is_file());
    assert!(bin.join("a.txt.json").is_file());
    assert!(!p.index.contains(&id).unwrap());
    assert!(p.reload_ledger().get(&id).is_none());
    assert!(find_orphans(&p.ctx.layout).unwrap().is_empty());
}

#[test]
fn test_delete_unknown_id_touches_nothing() {
    let mut p = TestProject::new("demo");
    p.add_files(&[("a.txt", "alpha")]);
    let err = store::delete(&p.ctx, &mut p.index, &mut p.ledger, &["NOPE".to_string()]).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(p.ctx.layout.file_path("a.txt").is_file());
}

#[test]
fn test_rename_moves_everything_to_new_id() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("draft.txt", "words")]);
    let old = &added[0];

    let renamed = store::rename(&p.ctx, &mut p.index, &mut p.ledger, &old.id, "final.txt").unwrap();

    assert_eq!(renamed.id, name_to_id("final.txt"));
    assert_eq!(renamed.checksum, old.checksum);
    assert!(p.ctx.layout.file_path("final.txt").is_file());
    assert!(!p.ctx.layout.file_path("draft.txt").exists());
    assert!(p.ctx.layout.recyclebin_dir().join("draft.txt.json").is_file());
    assert!(matches!(p.index.get(&old.id), Err(Error::NotFound(_))));
    assert_eq!(
        p.index
            .search("fin", MatchMode::Prefix, Bucket::Filename)
            .unwrap(),
        vec![renamed.clone()]
    );
    let ledger = p.reload_ledger();
    assert!(ledger.get(&old.id).is_none());
    assert!(ledger.get(&renamed.id).is_some());

    p.index.rebuild_all(&p.ctx.layout).unwrap();
    assert_eq!(p.index.all_ids().unwrap(), vec![renamed.id]);
}

#[test]
fn test_rename_rejects_bad_name_and_taken_name() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let id = added[0].id.clone();

    assert!(store::rename(&p.ctx, &mut p.index, &mut p.ledger, &id, "x/y.txt").is_err());
    assert!(matches!(
        store::rename(&p.ctx, &mut p.index, &mut p.ledger, &id, "b.txt"),
        Err(Error::AlreadyExists(_))
    ));
    assert!(p.ctx.layout.file_path("a.txt").is_file());
}

#[test]
fn test_find_orphans_both_directions() {
    let mut p = TestProject::new("demo");
    p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    fs::remove_file(p.ctx.layout.meta_path("a.txt")).unwrap();
    fs::remove_file(p.ctx.layout.file_path("b.txt")).unwrap();

    let orphans = find_orphans(&p.ctx.layout).unwrap();
    assert_eq!(orphans.files_only, vec!["a.txt".to_string()]);
    assert_eq!(orphans.metadata_only, vec!["b.txt".to_string()]);
    assert_eq!(orphans.len(), 2);
}

#[test]
fn test_delete_repeated_id_deletes_once() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let id = added[0].id.clone();

    let deleted = store::delete(&p.ctx, &mut p.index, &mut p.ledger, &[id.clone(), id.clone()]).unwrap();

    assert_eq!(deleted.len(), 1);
    assert!(!p.index.contains(&id).unwrap());
    assert!(p.ctx.layout.recyclebin_dir().join("a.txt").is_file());
    assert!(p.reload_ledger().get(&id).is_none());
    assert!(find_orphans(&p.ctx.layout).unwrap().is_empty());
}

#[test]
fn test_like_rewrites_sidecar_and_record() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha")]);
    let id = added[0].id.clone();

    let (liked, changed) = store::like(&p.ctx, &mut p.index, &id, 5).unwrap();

    assert!(changed);
    assert_eq!(liked.like, 5);
    assert_eq!(p.index.get(&id).unwrap(), liked);
    let sidecar = stowage::engine::sidecar::read_sidecar(&p.ctx.layout.meta_path("a.txt")).unwrap();
    assert_eq!(sidecar, liked);

    p.index.rebuild_cache().unwrap();
    assert_eq!(
        p.index.search_ids("5", MatchMode::Exact, Bucket::Like).unwrap().len(),
        1
    );
}

#[test]
fn test_like_same_score_writes_nothing() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha")]);
    let (same, changed) = store::like(&p.ctx, &mut p.index, &added[0].id, added[0].like).unwrap();
    assert!(!changed);
    assert_eq!(same, added[0]);
}

#[test]
fn test_like_refused_on_backup_and_unknown_id() {
    let mut p = TestProject::new("demo");
    assert!(matches!(
        store::like(&p.ctx, &mut p.index, "NOPE", 1),
        Err(Error::NotFound(_))
    ));
    let mut bk = TestProject::new_backup("demo");
    assert!(matches!(
        store::like(&bk.ctx, &mut bk.index, "NOPE", 1),
        Err(Error::Inconsistent(_))
    ));
}
