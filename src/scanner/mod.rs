use crate::backend::MetadataBackend;
use crate::error::{PdfMetaError, Result};
use crate::pool::WorkerPool;
use indicatif::ProgressBar;
use pdf_meta_common::{natural_cmp, validate_filename, FileHealth, FileRecord};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 書き込み中の一時ファイル
const TEMP_PREFIX: &str = ".pdf-meta-";

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(TEMP_PREFIX))
        .unwrap_or(false)
}

/// フォルダ内のPDFを列挙する（パスの自然順）
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PdfMetaError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut pdfs: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_pdf(p) && !is_temp_file(p))
        .collect();

    pdfs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    tracing::info!("{}件のPDFを検出: {}", pdfs.len(), folder.display());
    Ok(pdfs)
}

/// `scan_folder` と同じだが、PDFが1件もなければ `NoPdfsFound`
pub fn find_pdfs(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let pdfs = scan_folder(folder, recursive)?;
    if pdfs.is_empty() {
        return Err(PdfMetaError::NoPdfsFound(folder.display().to_string()));
    }
    Ok(pdfs)
}

/// 候補パスを読み込んで FileRecord にする（入力順）
///
/// `root` を渡すと、その直下にないファイルに `in_subfolder` を立てる。
pub async fn load_records<B: MetadataBackend>(
    pool: &WorkerPool<B>,
    root: Option<&Path>,
    paths: &[PathBuf],
    progress: Option<&ProgressBar>,
) -> Vec<FileRecord> {
    let mut records = pool.read_all(paths, progress).await;
    for record in &mut records {
        record.in_subfolder = match root {
            Some(root) => record.path.parent() != Some(root),
            None => false,
        };
        record.filename_warning = validate_filename(&record.file_name);
    }
    records
}

/// スキャン結果の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub total: usize,
    pub ok: usize,
    pub protected: usize,
    pub corrupted: usize,
    pub unreadable: usize,
    pub naming_warnings: usize,
}

impl ScanStats {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.health {
                FileHealth::Ok => stats.ok += 1,
                FileHealth::Protected => stats.protected += 1,
                FileHealth::Corrupted => stats.corrupted += 1,
                FileHealth::Unreadable => stats.unreadable += 1,
            }
            if record.filename_warning.is_some() {
                stats.naming_warnings += 1;
            }
        }
        stats
    }
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "計{}件 (正常: {}, 保護: {}, 破損: {}, 読込不可: {}, 命名警告: {})",
            self.total, self.ok, self.protected, self.corrupted, self.unreadable, self.naming_warnings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(is_pdf(Path::new("a.PDF")));
        assert!(!is_pdf(Path::new("a.pdf.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"), true);
        assert!(matches!(result, Err(PdfMetaError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_folder_natural_order_and_filter() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("doc10.pdf")).unwrap();
        File::create(dir.path().join("doc9.PDF")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join(".pdf-meta-abc.pdf")).unwrap();

        let result = scan_folder(dir.path(), false).unwrap();
        let names: Vec<_> = result
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc9.PDF", "doc10.pdf"]);
    }

    #[test]
    fn test_scan_folder_recursive_flag() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("top.pdf")).unwrap();
        File::create(dir.path().join("sub").join("inner.pdf")).unwrap();

        assert_eq!(scan_folder(dir.path(), false).unwrap().len(), 1);
        assert_eq!(scan_folder(dir.path(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_scan_stats() {
        let mut protected = FileRecord::new("/x/p.pdf");
        protected.health = FileHealth::Protected;
        let mut warned = FileRecord::new("/x/a.pdf");
        warned.filename_warning = Some("bad".into());

        let stats = ScanStats::from_records(&[protected, warned]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.ok, 1);
        assert_eq!(stats.protected, 1);
        assert_eq!(stats.naming_warnings, 1);
    }
}
