use crate::error::{PdfMetaError, Result};
use pdf_meta_common::SuppressionFlags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ExifToolパスの環境変数
pub const EXIFTOOL_ENV: &str = "PDF_META_EXIFTOOL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exiftool_path: Option<PathBuf>,
    pub workers: usize,
    pub read_timeout_seconds: u64,
    pub write_timeout_seconds: u64,
    /// サブフォルダも再帰的にスキャン
    pub recursive: bool,
    pub log_to_file: bool,
    /// 起動時から確認を省略するキー（例: `clear_keywords`）
    pub suppress_confirmations: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exiftool_path: None,
            workers: 4,
            read_timeout_seconds: 15,
            write_timeout_seconds: 30,
            recursive: true,
            log_to_file: true,
            suppress_confirmations: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PdfMetaError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("pdf-meta"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// ログ出力先（`<data dir>/pdf-meta/logs`）
    pub fn log_dir() -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| PdfMetaError::Config("データディレクトリが見つかりません".into()))?;
        Ok(base.join("pdf-meta").join("logs"))
    }

    pub fn undo_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("undo.json"))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds.max(1))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds.max(1))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    pub fn suppression_flags(&self) -> SuppressionFlags {
        SuppressionFlags::from_settings_keys(&self.suppress_confirmations)
    }

    /// ExifToolの場所を決める
    ///
    /// 環境変数 → 設定ファイル → PATH の順。
    pub fn resolve_exiftool(&self) -> Result<PathBuf> {
        let env_path = std::env::var_os(EXIFTOOL_ENV).map(PathBuf::from);
        resolve_exiftool_from(env_path, self.exiftool_path.clone(), find_on_path("exiftool"))
    }

    pub fn set_exiftool(&mut self, path: PathBuf) -> Result<()> {
        if !path.exists() {
            return Err(PdfMetaError::FileNotFound(path.display().to_string()));
        }
        self.exiftool_path = Some(path);
        self.save()
    }

    pub fn set_workers(&mut self, workers: usize) -> Result<()> {
        if workers == 0 {
            return Err(PdfMetaError::Config("ワーカー数は1以上にしてください".into()));
        }
        self.workers = workers;
        self.save()
    }
}

fn resolve_exiftool_from(
    env_path: Option<PathBuf>,
    configured: Option<PathBuf>,
    on_path: Option<PathBuf>,
) -> Result<PathBuf> {
    // 環境変数を優先
    if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    if let Some(path) = configured.filter(|p| p.exists()) {
        return Ok(path);
    }
    on_path.ok_or(PdfMetaError::ExifToolNotFound)
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    let name = if cfg!(windows) {
        format!("{}.exe", program)
    } else {
        program.to_string()
    };
    std::env::split_paths(&paths)
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
}
