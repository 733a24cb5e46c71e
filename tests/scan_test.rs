//! スキャンテスト
//!
//! フォルダ列挙・読み込み・集計と、スキャン元フォルダ名のタグを検証

use pdf_meta_common::{Action, ConfirmationPolicy, Decision, Field, FieldValues, FileHealth};
use pdf_meta_rust::batch::BatchOrchestrator;
use pdf_meta_rust::scanner::{self, ScanStats};
use pdf_meta_rust::{Invocation, MemoryBackend, Session, WorkerPool};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"%PDF-1.4").unwrap();
}

/// サブフォルダ内のファイルと命名警告が記録される
#[tokio::test]
async fn test_load_records_marks_subfolder_and_warnings() {
    let dir = tempdir().expect("Failed to create temp dir");
    let good = dir.path().join("2020-0101 {AGM} minutes.pdf");
    let bad = dir.path().join("sub").join("notes.pdf");
    touch(&good);
    touch(&bad);

    let backend = Arc::new(MemoryBackend::new());
    backend.insert(&good, FieldValues::default());
    backend.insert(&bad, FieldValues::default());
    let pool = WorkerPool::new(Arc::clone(&backend), 2);

    let paths = scanner::scan_folder(dir.path(), true).unwrap();
    assert_eq!(paths.len(), 2);
    let records = scanner::load_records(&pool, Some(dir.path()), &paths, None).await;

    let good_record = records.iter().find(|r| r.path == good).unwrap();
    assert!(!good_record.in_subfolder);
    assert!(good_record.filename_warning.is_none());

    let bad_record = records.iter().find(|r| r.path == bad).unwrap();
    assert!(bad_record.in_subfolder);
    assert!(bad_record.filename_warning.is_some());

    let stats = ScanStats::from_records(&records);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.naming_warnings, 1);
}

/// 読めないファイルは Unreadable として一覧に残る
#[tokio::test]
async fn test_unknown_file_is_unreadable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let known = dir.path().join("a.pdf");
    let unknown = dir.path().join("b.pdf");
    touch(&known);
    touch(&unknown);

    let backend = Arc::new(MemoryBackend::new());
    backend.insert(&known, FieldValues::default());
    backend.set_health(&known, FileHealth::Corrupted);
    let pool = WorkerPool::new(backend, 2);

    let paths = scanner::scan_folder(dir.path(), false).unwrap();
    let records = scanner::load_records(&pool, None, &paths, None).await;
    let stats = ScanStats::from_records(&records);

    assert_eq!(stats.corrupted, 1);
    assert_eq!(stats.unreadable, 1);
    assert_eq!(stats.ok, 0);
}

/// FolderTag はスキャン元フォルダ名から shib- タグを作る
#[tokio::test]
async fn test_folder_tag_uses_scan_root() {
    let dir = tempdir().expect("Failed to create temp dir");
    let root = dir.path().join("Board Minutes");
    let file = root.join("a.pdf");
    touch(&file);

    let backend = Arc::new(MemoryBackend::new());
    backend.insert(
        &file,
        FieldValues {
            keywords: "finance".into(),
            ..Default::default()
        },
    );
    let pool = WorkerPool::new(Arc::clone(&backend), 1);
    let mut session = Session::new(BatchOrchestrator::new(pool, ConfirmationPolicy::default()));

    let stats = session.load_folder(&root, true, None).await.unwrap();
    assert_eq!(stats.ok, 1);
    assert_eq!(session.orchestrator().folder_tag(), Some("shib-Board-Minutes"));

    session.check_all();
    let invocation = session.invoke(Field::Keywords, Action::FolderTag, None).await.unwrap();
    assert!(matches!(invocation, Invocation::NeedsConfirmation { .. }));
    session.resolve(Decision::Accepted, None).await.unwrap();

    assert_eq!(
        backend.value(&file, Field::Keywords).as_deref(),
        Some("finance, shib-Board-Minutes")
    );
}

/// SentinelTag は常に末尾に置かれる
#[tokio::test]
async fn test_sentinel_tag_goes_last() {
    let dir = tempdir().expect("Failed to create temp dir");
    let file = dir.path().join("a.pdf");
    touch(&file);

    let backend = Arc::new(MemoryBackend::new());
    backend.insert(
        &file,
        FieldValues {
            keywords: "shib-9, zeta".into(),
            ..Default::default()
        },
    );
    let pool = WorkerPool::new(Arc::clone(&backend), 1);
    let mut session = Session::new(BatchOrchestrator::new(pool, ConfirmationPolicy::default()));
    session.load_folder(dir.path(), false, None).await.unwrap();

    session.check_all();
    session.invoke(Field::Keywords, Action::SentinelTag, None).await.unwrap();
    session.resolve(Decision::Accepted, None).await.unwrap();

    assert_eq!(
        backend.value(&file, Field::Keywords).as_deref(),
        Some("zeta, shib-9, shib-1234")
    );
}
