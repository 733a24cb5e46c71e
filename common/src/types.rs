//! メタデータ一括編集の型定義
//!
//! CLIと対話シェルで共有される型:
//! - Field / Action: 編集対象フィールドと操作
//! - FileRecord: スキャン結果（現在値と健全性）
//! - JobResult: ワーカーの1ファイル分の結果
//! - BatchSummary: バッチ全体の集計
//! - UndoEntry: 直前バッチの書き込み前の値

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 編集対象のメタデータフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Author,
    Subject,
    Keywords,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Author, Field::Subject, Field::Keywords];

    /// ExifToolのタグ名
    pub fn tag(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Author => "Author",
            Field::Subject => "Subject",
            Field::Keywords => "Keywords",
        }
    }

    /// 設定キー等で使う小文字名
    pub fn key(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Subject => "subject",
            Field::Keywords => "keywords",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" | "t" => Ok(Field::Title),
            "author" | "a" => Ok(Field::Author),
            "subject" | "s" => Ok(Field::Subject),
            "keywords" | "keyword" | "k" => Ok(Field::Keywords),
            _ => Err(Error::Parse(format!(
                "Unknown field: {}. Use title, author, subject, or keywords",
                s
            ))),
        }
    }
}

/// フィールドに対する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// 入力値で置き換え
    Update,
    /// 既存値に追加（マージ）
    Add,
    /// 空にする
    Clear,
    /// ファイル名（拡張子なし）をTitleへ
    CopyFilenameToTitle,
    /// スキャン元フォルダ名から shib- タグを追加（Keywordsのみ）
    FolderTag,
    /// 固定タグ shib-1234 を追加（Keywordsのみ）
    SentinelTag,
}

impl Action {
    pub fn key(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Add => "add",
            Action::Clear => "clear",
            Action::CopyFilenameToTitle => "copy_filename",
            Action::FolderTag => "folder_tag",
            Action::SentinelTag => "sentinel_tag",
        }
    }

    /// 入力欄の変更（dirty）を要求する操作か
    pub fn is_dirty_gated(&self) -> bool {
        matches!(self, Action::Update | Action::Add)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Update => "update",
            Action::Add => "add",
            Action::Clear => "clear",
            Action::CopyFilenameToTitle => "copy-filename",
            Action::FolderTag => "folder-tag",
            Action::SentinelTag => "sentinel-tag",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "update" | "replace" | "set" => Ok(Action::Update),
            "add" | "append" => Ok(Action::Add),
            "clear" => Ok(Action::Clear),
            "copy-filename" | "from-filename" | "copy-filename-to-title" => {
                Ok(Action::CopyFilenameToTitle)
            }
            "folder-tag" => Ok(Action::FolderTag),
            "sentinel-tag" | "shib-1234" => Ok(Action::SentinelTag),
            _ => Err(Error::Parse(format!(
                "Unknown action: {}. Use update, add, clear, copy-filename, folder-tag, or sentinel-tag",
                s
            ))),
        }
    }
}

/// 4フィールドの値
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldValues {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
}

impl FieldValues {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Author => &self.author,
            Field::Subject => &self.subject,
            Field::Keywords => &self.keywords,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Title => self.title = value,
            Field::Author => self.author = value,
            Field::Subject => self.subject = value,
            Field::Keywords => self.keywords = value,
        }
    }
}

/// ファイルの健全性（スキャン時に判定）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileHealth {
    #[default]
    Ok,
    /// パスワード保護
    Protected,
    /// 破損
    Corrupted,
    /// 読み込み不可
    Unreadable,
}

impl FileHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, FileHealth::Ok)
    }
}

impl fmt::Display for FileHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileHealth::Ok => "ok",
            FileHealth::Protected => "protected",
            FileHealth::Corrupted => "corrupted",
            FileHealth::Unreadable => "unreadable",
        };
        write!(f, "{}", label)
    }
}

/// スキャン済みファイル
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: PathBuf,
    pub file_name: String,

    /// スキャンルート直下ではなくサブフォルダ内にある
    #[serde(default)]
    pub in_subfolder: bool,

    #[serde(default)]
    pub values: FieldValues,

    #[serde(default)]
    pub health: FileHealth,

    /// 健全性判定の詳細（ExifToolのエラー等）
    #[serde(default)]
    pub error_message: String,

    /// ファイル名規約の警告（書き込みは妨げない）
    #[serde(default)]
    pub filename_warning: Option<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            ..Default::default()
        }
    }

    /// バッチ対象になれるか
    pub fn is_eligible(&self) -> bool {
        self.health.is_ok()
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(field)
    }
}

/// 書き込みジョブの失敗理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "message")]
pub enum JobFailure {
    /// ExifTool側のエラー
    Backend(String),
    /// 待機時間超過
    Timeout,
    /// 保護・破損・ロック等で書き込み拒否
    WriteRejected(String),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Backend(msg) => write!(f, "backend error: {}", msg),
            JobFailure::Timeout => write!(f, "timeout"),
            JobFailure::WriteRejected(msg) => write!(f, "write rejected: {}", msg),
        }
    }
}

/// 1ファイル分の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Written,
    SkippedEmptyInput,
    SkippedIneligible(FileHealth),
    Failed(JobFailure),
}

/// ワーカーが返す1ファイル分の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub path: PathBuf,
    pub field: Field,
    pub outcome: JobOutcome,
    /// 書き込み前の値（読み取れた場合のみ）
    pub previous: Option<String>,
    /// 書き込んだ値
    pub new_value: Option<String>,
}

impl JobResult {
    pub fn is_written(&self) -> bool {
        matches!(self.outcome, JobOutcome::Written)
    }
}

/// バッチ全体の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<(PathBuf, JobFailure)>,
}

impl BatchSummary {
    pub fn from_results(results: &[JobResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                JobOutcome::Written => summary.written += 1,
                JobOutcome::SkippedEmptyInput | JobOutcome::SkippedIneligible(_) => {
                    summary.skipped += 1
                }
                JobOutcome::Failed(failure) => {
                    summary.failed += 1;
                    summary.failures.push((result.path.clone(), failure.clone()));
                }
            }
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "成功: {}, スキップ: {}, 失敗: {} (計{}件)",
            self.written, self.skipped, self.failed, self.total
        )
    }
}

/// Undo用の1変更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoChange {
    pub path: PathBuf,
    pub field: Field,
    pub previous: String,
}

/// 直前バッチ1件分のUndo情報
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    /// 表示用の説明（例: "clear Keywords"）
    #[serde(default)]
    pub description: String,
    pub changes: Vec<UndoChange>,
}

impl UndoEntry {
    /// 書き込み成功した結果だけからUndo情報を組み立てる
    pub fn from_results(description: impl Into<String>, results: &[JobResult]) -> Self {
        let changes = results
            .iter()
            .filter(|r| r.is_written())
            .map(|r| UndoChange {
                path: r.path.clone(),
                field: r.field,
                previous: r.previous.clone().unwrap_or_default(),
            })
            .collect();
        Self {
            description: description.into(),
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn touches(&self, path: &Path) -> bool {
        self.changes.iter().any(|c| c.path == path)
    }
}

/// パネルに表示する値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelValue {
    /// 対象全ファイルで同じ値
    Uniform(String),
    /// 値がばらばら（プレースホルダ表示）
    Mixed,
}

impl PanelValue {
    /// 入力欄に表示する初期値
    pub fn editable_text(&self) -> &str {
        match self {
            PanelValue::Uniform(v) => v,
            PanelValue::Mixed => "",
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, PanelValue::Mixed)
    }
}
