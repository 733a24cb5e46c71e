//! Undoジャーナル
//!
//! 直前のバッチ1件分だけを保持する。Undo自体は取り消せない。
//! ワンショットのCLIでも前回の実行を取り消せるよう、JSONにも保存する。

use crate::error::Result;
use pdf_meta_common::UndoEntry;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoJournal {
    /// バージョン（互換性チェック用）
    version: u32,
    entry: Option<UndoEntry>,
}

impl Default for UndoJournal {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entry: None,
        }
    }
}

impl UndoJournal {
    const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// ジャーナルファイルを読み込み（ない・壊れている場合は空）
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, UndoJournal>(BufReader::new(file)) {
            Ok(journal) if journal.version == Self::CURRENT_VERSION => journal,
            Ok(_) => {
                tracing::warn!("Undoジャーナルのバージョン不一致、破棄します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Undoジャーナルを読めません: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// バッチの結果を記録する。空のエントリでは前回分を残す
    pub fn record(&mut self, entry: UndoEntry) -> bool {
        if entry.is_empty() {
            return false;
        }
        self.entry = Some(entry);
        true
    }

    /// 取り出して空にする
    pub fn take(&mut self) -> Option<UndoEntry> {
        self.entry.take()
    }

    pub fn entry(&self) -> Option<&UndoEntry> {
        self.entry.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.entry.is_some()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
