//! インメモリのバックエンド
//!
//! ExifToolなしでバッチ・Undo・タイムアウトの挙動を確かめるためのもの。
//! ファイルごとに健全性・書き込み失敗・遅延を差し込める。

use super::{BackendError, ErrorClass, MetadataBackend, ReadOutcome, WriteOutcome};
use pdf_meta_common::{Field, FieldValues, FileHealth};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct MemoryFile {
    values: FieldValues,
    health: FileHealth,
    write_error: Option<BackendError>,
    delay: Option<Duration>,
}

/// 書き込み履歴の1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub path: PathBuf,
    pub field: Field,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
    writes: Mutex<Vec<WriteRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, values: FieldValues) {
        self.with_files(|files| {
            files.entry(path.into()).or_default().values = values;
        });
    }

    pub fn set_health(&self, path: impl Into<PathBuf>, health: FileHealth) {
        self.with_files(|files| {
            files.entry(path.into()).or_default().health = health;
        });
    }

    /// 以後の書き込みを失敗させる
    pub fn fail_writes(&self, path: impl Into<PathBuf>, class: ErrorClass, message: &str) {
        let error = BackendError::new(class, message);
        self.with_files(|files| {
            files.entry(path.into()).or_default().write_error = Some(error);
        });
    }

    pub fn clear_failure(&self, path: &Path) {
        self.with_files(|files| {
            if let Some(file) = files.get_mut(path) {
                file.write_error = None;
            }
        });
    }

    /// 読み書きのたびに待たせる
    pub fn set_delay(&self, path: impl Into<PathBuf>, delay: Duration) {
        self.with_files(|files| {
            files.entry(path.into()).or_default().delay = Some(delay);
        });
    }

    pub fn values(&self, path: &Path) -> Option<FieldValues> {
        self.with_files(|files| files.get(path).map(|f| f.values.clone()))
    }

    pub fn value(&self, path: &Path, field: Field) -> Option<String> {
        self.values(path).map(|v| v.get(field).to_string())
    }

    /// これまでの書き込み（成功したもののみ、到着順）
    pub fn writes(&self) -> Vec<WriteRecord> {
        match self.writes.lock() {
            Ok(writes) => writes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    fn with_files<T>(&self, f: impl FnOnce(&mut HashMap<PathBuf, MemoryFile>) -> T) -> T {
        match self.files.lock() {
            Ok(mut files) => f(&mut files),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn delay_for(&self, path: &Path) -> Option<Duration> {
        self.with_files(|files| files.get(path).and_then(|f| f.delay))
    }
}

fn health_error(health: FileHealth) -> Option<BackendError> {
    match health {
        FileHealth::Ok => None,
        FileHealth::Protected => Some(BackendError::new(ErrorClass::Protected, "Password protected")),
        FileHealth::Corrupted => Some(BackendError::new(ErrorClass::Corrupted, "Corrupted PDF")),
        FileHealth::Unreadable => Some(BackendError::new(ErrorClass::Unreadable, "Unreadable")),
    }
}

impl MetadataBackend for MemoryBackend {
    async fn read(&self, path: &Path) -> ReadOutcome {
        if let Some(delay) = self.delay_for(path) {
            tokio::time::sleep(delay).await;
        }
        self.with_files(|files| match files.get(path) {
            None => Err(BackendError::new(ErrorClass::Unreadable, "File not found")),
            Some(file) => match health_error(file.health) {
                Some(err) => Err(err),
                None => Ok(file.values.clone()),
            },
        })
    }

    async fn write(&self, path: &Path, field: Field, value: &str) -> WriteOutcome {
        if let Some(delay) = self.delay_for(path) {
            tokio::time::sleep(delay).await;
        }
        self.with_files(|files| -> WriteOutcome {
            let file = files
                .get_mut(path)
                .ok_or_else(|| BackendError::new(ErrorClass::Unreadable, "File not found"))?;
            if let Some(err) = health_error(file.health) {
                return Err(err);
            }
            if let Some(err) = &file.write_error {
                return Err(err.clone());
            }
            file.values.set(field, value.trim());
            Ok(())
        })?;

        let record = WriteRecord {
            path: path.to_path_buf(),
            field,
            value: value.trim().to_string(),
        };
        match self.writes.lock() {
            Ok(mut writes) => writes.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}
