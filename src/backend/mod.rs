//! メタデータ読み書きのバックエンド
//!
//! - ExifToolBackend: 外部プロセス（exiftool）経由
//! - MemoryBackend: テスト用のインメモリ実装
//!
//! バッチ処理側はこのトレイトにだけ依存する。

mod exiftool;
mod memory;

pub use exiftool::ExifToolBackend;
pub use memory::{MemoryBackend, WriteRecord};

use pdf_meta_common::{Field, FieldValues, FileHealth, JobFailure};
use std::fmt;
use std::future::Future;
use std::path::Path;

/// バックエンドエラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Protected,
    Corrupted,
    Unreadable,
    /// 他のプロセスが開いている等
    Locked,
    Other,
}

/// 1ファイル分のバックエンドエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub class: ErrorClass,
    pub message: String,
}

impl BackendError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    /// 読み込み時の健全性へ
    pub fn health(&self) -> FileHealth {
        match self.class {
            ErrorClass::Protected => FileHealth::Protected,
            ErrorClass::Corrupted => FileHealth::Corrupted,
            ErrorClass::Unreadable | ErrorClass::Locked | ErrorClass::Other => {
                FileHealth::Unreadable
            }
        }
    }

    /// 書き込みジョブの失敗理由へ
    pub fn job_failure(&self) -> JobFailure {
        match self.class {
            ErrorClass::Other => JobFailure::Backend(self.message.clone()),
            _ => JobFailure::WriteRejected(self.message.clone()),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {}

pub type ReadOutcome = std::result::Result<FieldValues, BackendError>;
pub type WriteOutcome = std::result::Result<(), BackendError>;

/// メタデータのバックエンド
///
/// 書き込みはファイル単位で冪等（同じ値の再書き込みは成功扱い）であること。
pub trait MetadataBackend: Send + Sync + 'static {
    /// 健全性チェックと4フィールドの読み込み
    fn read(&self, path: &Path) -> impl Future<Output = ReadOutcome> + Send;

    /// 1フィールドの書き込み（空文字はクリア）
    fn write(&self, path: &Path, field: Field, value: &str)
        -> impl Future<Output = WriteOutcome> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_mapping() {
        let protected = BackendError::new(ErrorClass::Protected, "Password protected");
        assert_eq!(protected.health(), FileHealth::Protected);
        assert!(matches!(protected.job_failure(), JobFailure::WriteRejected(_)));

        let locked = BackendError::new(ErrorClass::Locked, "locked");
        assert_eq!(locked.health(), FileHealth::Unreadable);
        assert!(matches!(locked.job_failure(), JobFailure::WriteRejected(_)));

        let other = BackendError::new(ErrorClass::Other, "boom");
        assert_eq!(other.job_failure(), JobFailure::Backend("boom".into()));
    }
}
