use pdf_meta_common::{Action, Field};
use std::path::PathBuf;
use thiserror::Error;

/// バッチ開始前の検証エラー（ジョブは一切実行されない）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("対象ファイルがありません（チェックまたはクリックで選択してください）")]
    EmptyTargetSet,

    #[error("書き込みできないファイルが含まれています: {}件", .0.len())]
    IneligibleTargets(Vec<PathBuf>),

    #[error("{0} の入力が変更されていません")]
    NotDirty(Field),

    #[error("{0} に {1} は使えません")]
    UnsupportedAction(Field, Action),

    #[error("フォルダ名から shib- タグを作れません")]
    NoFolderTag,
}

#[derive(Error, Debug)]
pub enum PdfMetaError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ExifToolが見つかりません。`pdf-meta config --set-exiftool PATH` で設定するか PATH に追加してください")]
    ExifToolNotFound,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("PDFが見つかりません: {0}")]
    NoPdfsFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("キャンセルしました")]
    ConfirmationDeclined,

    #[error("取り消せる操作がありません")]
    NothingToUndo,

    #[error("別のバッチを実行中です")]
    BatchInProgress,

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] pdf_meta_common::Error),
}

pub type Result<T> = std::result::Result<T, PdfMetaError>;
