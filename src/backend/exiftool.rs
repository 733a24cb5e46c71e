//! ExifTool連携
//!
//! 読み込み: `-Encrypted` で保護チェック → `-json -fast` で破損チェック → `-json -G1` で値を取得
//! 書き込み: 同じフォルダに一時コピー → `-overwrite_original` で書き込み → 元ファイルを置き換え

use super::{BackendError, ErrorClass, MetadataBackend, ReadOutcome, WriteOutcome};
use pdf_meta_common::rules::keywords::split_keywords;
use pdf_meta_common::{is_encrypted_probe, parse_exiftool_json, Field, EXIFTOOL_READ_TAGS};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// 置き換えのリトライ回数
const REPLACE_ATTEMPTS: u32 = 12;
const REPLACE_BASE_BACKOFF: Duration = Duration::from_millis(60);
const REPLACE_MAX_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ExifToolBackend {
    exiftool_path: PathBuf,
}

impl ExifToolBackend {
    pub fn new(exiftool_path: impl Into<PathBuf>) -> Self {
        let exiftool_path = exiftool_path.into();
        tracing::info!("ExifTool: {}", exiftool_path.display());
        Self { exiftool_path }
    }

    pub fn exiftool_path(&self) -> &Path {
        &self.exiftool_path
    }

    /// exiftool を実行する（待機を打ち切られたらプロセスも終了させる）
    async fn run(&self, args: &[String], path: &Path) -> Result<Output, BackendError> {
        Command::new(&self.exiftool_path)
            .args(args)
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::new(ErrorClass::Other, format!("ExifTool起動エラー: {}", e)))
    }

    /// 保護・破損チェック
    async fn check_security(&self, path: &Path) -> Result<(), BackendError> {
        let probe = self
            .run(&["-s3".to_string(), "-Encrypted".to_string()], path)
            .await
            .map_err(|e| BackendError::new(ErrorClass::Corrupted, e.message))?;
        if !probe.status.success() {
            return Err(BackendError::new(
                ErrorClass::Corrupted,
                format!("ExifTool error: {}", stderr_text(&probe)),
            ));
        }
        if is_encrypted_probe(&String::from_utf8_lossy(&probe.stdout)) {
            return Err(BackendError::new(ErrorClass::Protected, "Password protected"));
        }

        let quick = self
            .run(&["-json".to_string(), "-fast".to_string()], path)
            .await
            .map_err(|e| BackendError::new(ErrorClass::Corrupted, e.message))?;
        if !quick.status.success() {
            return Err(BackendError::new(
                ErrorClass::Corrupted,
                format!("ExifTool error: {}", stderr_text(&quick)),
            ));
        }
        Ok(())
    }
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        "unknown error".to_string()
    } else {
        text
    }
}

/// 書き込み失敗時のExifToolメッセージを分類する
fn classify_write_error(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ErrorClass::Protected
    } else if lower.contains("corrupt") || lower.contains("not a valid pdf") || lower.contains("format error") {
        ErrorClass::Corrupted
    } else {
        ErrorClass::Other
    }
}

/// 1フィールド分の書き込み引数
///
/// Keywordsはトークンごとに `-Keywords=` を並べる。空文字はクリア。
fn write_args(field: Field, value: &str) -> Vec<String> {
    let tag = field.tag();
    let mut args = vec!["-overwrite_original".to_string()];
    let value = value.trim();
    if value.is_empty() {
        args.push(format!("-{}=", tag));
        return args;
    }
    match field {
        Field::Keywords => {
            args.extend(
                split_keywords(value)
                    .into_iter()
                    .map(|token| format!("-{}={}", tag, token)),
            );
        }
        _ => args.push(format!("-{}={}", tag, value)),
    }
    args
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::PermissionDenied | ErrorKind::WouldBlock | ErrorKind::Interrupted)
}

/// 一時ファイルで元ファイルを置き換える（ロック中はバックオフしてリトライ）
async fn replace_with_retries(mut temp: NamedTempFile, target: &Path) -> Result<(), BackendError> {
    let mut attempt = 0;
    loop {
        match temp.persist(target) {
            Ok(_) => return Ok(()),
            Err(e) if is_transient(e.error.kind()) && attempt + 1 < REPLACE_ATTEMPTS => {
                let backoff = (REPLACE_BASE_BACKOFF * 2u32.saturating_pow(attempt)).min(REPLACE_MAX_BACKOFF);
                tracing::debug!(
                    "置き換えをリトライ ({}/{}): {}: {}",
                    attempt + 1,
                    REPLACE_ATTEMPTS,
                    target.display(),
                    e.error
                );
                tokio::time::sleep(backoff).await;
                temp = e.file;
                attempt += 1;
            }
            Err(e) if is_transient(e.error.kind()) => {
                return Err(BackendError::new(
                    ErrorClass::Locked,
                    "The PDF appears to be open or locked. Close the file and retry.",
                ));
            }
            Err(e) => {
                return Err(BackendError::new(
                    ErrorClass::Other,
                    format!("Error replacing file: {}", e.error),
                ));
            }
        }
    }
}

impl MetadataBackend for ExifToolBackend {
    async fn read(&self, path: &Path) -> ReadOutcome {
        if !path.exists() {
            return Err(BackendError::new(ErrorClass::Unreadable, "File not found"));
        }

        self.check_security(path).await?;

        let mut args = vec!["-json".to_string(), "-G1".to_string()];
        args.extend(EXIFTOOL_READ_TAGS.iter().map(|tag| format!("-{}", tag)));

        let output = self
            .run(&args, path)
            .await
            .map_err(|e| BackendError::new(ErrorClass::Unreadable, e.message))?;
        if !output.status.success() {
            return Err(BackendError::new(
                ErrorClass::Unreadable,
                format!("ExifTool error: {}", stderr_text(&output)),
            ));
        }

        parse_exiftool_json(&String::from_utf8_lossy(&output.stdout)).map_err(|e| {
            tracing::debug!("{}: {}", path.display(), e);
            BackendError::new(ErrorClass::Unreadable, "Invalid metadata format")
        })
    }

    async fn write(&self, path: &Path, field: Field, value: &str) -> WriteOutcome {
        if !path.exists() {
            return Err(BackendError::new(ErrorClass::Unreadable, "File not found"));
        }

        let folder = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // 失敗時は NamedTempFile の drop で一時ファイルが消える
        let temp = tempfile::Builder::new()
            .prefix(".pdf-meta-")
            .suffix(".pdf")
            .tempfile_in(folder)
            .map_err(|e| BackendError::new(ErrorClass::Locked, format!("一時ファイル作成エラー: {}", e)))?;
        tokio::fs::copy(path, temp.path())
            .await
            .map_err(|e| BackendError::new(ErrorClass::Unreadable, format!("コピーエラー: {}", e)))?;

        let output = self.run(&write_args(field, value), temp.path()).await?;
        if !output.status.success() {
            let message = stderr_text(&output);
            return Err(BackendError::new(
                classify_write_error(&message),
                format!("ExifTool error: {}", message),
            ));
        }

        replace_with_retries(temp, path).await?;
        tracing::debug!("書き込み完了: {} {}", path.display(), field);
        Ok(())
    }
}
