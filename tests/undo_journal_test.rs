//! Undoジャーナルテスト
//!
//! 直前バッチの記録・保存・読み込みを検証

use pdf_meta_common::{Field, UndoChange, UndoEntry};
use pdf_meta_rust::batch::undo::UndoJournal;
use std::path::PathBuf;
use tempfile::tempdir;

fn entry(description: &str, paths: &[&str]) -> UndoEntry {
    UndoEntry {
        description: description.to_string(),
        changes: paths
            .iter()
            .map(|p| UndoChange {
                path: PathBuf::from(p),
                field: Field::Keywords,
                previous: format!("old-{}", p),
            })
            .collect(),
    }
}

/// ファイルがない場合は空
#[test]
fn test_journal_missing_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let journal = UndoJournal::load(&dir.path().join("undo.json"));

    assert!(!journal.is_available());
    assert!(journal.entry().is_none());
}

/// 保存と読み込み
#[test]
fn test_journal_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("undo.json");

    let mut journal = UndoJournal::new();
    assert!(journal.record(entry("clear Keywords", &["/d/a.pdf", "/d/b.pdf"])));
    journal.save(&path).expect("ジャーナル保存失敗");

    let loaded = UndoJournal::load(&path);
    let restored = loaded.entry().expect("エントリがない");
    assert_eq!(restored.description, "clear Keywords");
    assert_eq!(restored.changes.len(), 2);
    assert_eq!(restored.changes[1].previous, "old-/d/b.pdf");
}

/// 空のエントリは前回分を上書きしない
#[test]
fn test_journal_ignores_empty_entry() {
    let mut journal = UndoJournal::new();
    journal.record(entry("update Title", &["/d/a.pdf"]));

    assert!(!journal.record(entry("update Title", &[])));
    assert_eq!(journal.entry().unwrap().changes.len(), 1);
}

/// 新しいバッチは前回分を置き換える（1件のみ保持）
#[test]
fn test_journal_keeps_only_latest() {
    let mut journal = UndoJournal::new();
    journal.record(entry("clear Title", &["/d/a.pdf"]));
    journal.record(entry("add Keywords", &["/d/b.pdf", "/d/c.pdf"]));

    let taken = journal.take().unwrap();
    assert_eq!(taken.description, "add Keywords");
    assert!(journal.take().is_none());
}

/// 壊れたファイルは空として扱う
#[test]
fn test_journal_corrupt_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("undo.json");
    std::fs::write(&path, "{ not json").unwrap();

    let journal = UndoJournal::load(&path);
    assert!(!journal.is_available());
}

/// バージョン違いは破棄
#[test]
fn test_journal_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("undo.json");
    std::fs::write(
        &path,
        r#"{"version": 99, "entry": {"description": "x", "changes": [{"path": "/a.pdf", "field": "title", "previous": ""}]}}"#,
    )
    .unwrap();

    let journal = UndoJournal::load(&path);
    assert!(!journal.is_available());
}
