//! セッション
//!
//! 表示層（表・パネル）との境界。
//! 受け取るもの: チェック・クリック・入力の変更、操作の実行、確認の回答
//! 返すもの: バッチ完了の集計、パネル表示値、Undo可否

use crate::backend::MetadataBackend;
use crate::batch::{BatchOperation, BatchOrchestrator, BatchReport, PendingBatch, PlanEntry, Prepared};
use crate::error::{PdfMetaError, Result};
use crate::scanner::{self, ScanStats};
use indicatif::ProgressBar;
use pdf_meta_common::{Action, Decision, Field, PanelValue, SelectionModel};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 操作の結果
#[derive(Debug)]
pub enum Invocation {
    Completed(BatchReport),
    /// 確認待ち（`resolve` で回答する）
    NeedsConfirmation { prompt: String, target_count: usize },
}

pub struct Session<B: MetadataBackend> {
    selection: SelectionModel,
    orchestrator: BatchOrchestrator<B>,
    root: Option<PathBuf>,
    pending: Option<PendingBatch>,
}

impl<B: MetadataBackend> Session<B> {
    pub fn new(orchestrator: BatchOrchestrator<B>) -> Self {
        Self {
            selection: SelectionModel::new(),
            orchestrator,
            root: None,
            pending: None,
        }
    }

    /// フォルダをスキャンして一覧を置き換える
    pub async fn load_folder(
        &mut self,
        root: &Path,
        recursive: bool,
        progress: Option<&ProgressBar>,
    ) -> Result<ScanStats> {
        let paths = scanner::scan_folder(root, recursive)?;
        if let Some(pb) = progress {
            pb.set_length(paths.len() as u64);
        }
        let records = scanner::load_records(self.orchestrator.pool(), Some(root), &paths, progress).await;
        self.orchestrator.set_scan_root(root);
        self.root = Some(root.to_path_buf());
        Ok(self.replace_records(records))
    }

    /// 候補パスを直接読み込む
    pub async fn load_paths(&mut self, paths: &[PathBuf], progress: Option<&ProgressBar>) -> ScanStats {
        let records = scanner::load_records(self.orchestrator.pool(), None, paths, progress).await;
        self.root = None;
        self.replace_records(records)
    }

    /// 同じフォルダを読み直す
    pub async fn rescan(&mut self, recursive: bool, progress: Option<&ProgressBar>) -> Result<ScanStats> {
        let root = self
            .root
            .clone()
            .ok_or_else(|| PdfMetaError::Config("スキャン元フォルダがありません".into()))?;
        self.load_folder(&root, recursive, progress).await
    }

    fn replace_records(&mut self, records: Vec<pdf_meta_common::FileRecord>) -> ScanStats {
        let stats = ScanStats::from_records(&records);
        tracing::info!("スキャン完了: {}", stats);
        self.selection.replace_records(records);
        self.pending = None;
        stats
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn check(&mut self, path: &Path) -> bool {
        self.selection.check(path)
    }

    pub fn uncheck(&mut self, path: &Path) {
        self.selection.uncheck(path);
    }

    pub fn check_all(&mut self) -> usize {
        self.selection.check_all()
    }

    pub fn clear_checked(&mut self) {
        self.selection.clear_checked();
    }

    pub fn invert_checked(&mut self) {
        self.selection.invert_checked();
    }

    pub fn click(&mut self, path: Option<&Path>) {
        self.selection.click(path);
    }

    pub fn set_input(&mut self, field: Field, text: impl Into<String>) {
        self.selection.set_input(field, text);
    }

    pub fn reset_input(&mut self, field: Field) {
        self.selection.reset_input(field);
    }

    /// 操作を実行する
    ///
    /// 入力値はパネルの入力欄から取る。確認が必要なら保留して返す。
    pub async fn invoke(
        &mut self,
        field: Field,
        action: Action,
        progress: Option<&ProgressBar>,
    ) -> Result<Invocation> {
        let input = self.selection.input_text(field).to_string();
        self.pending = None;

        match self.orchestrator.prepare(&self.selection, field, action, &input)? {
            Prepared::Ready(op) => Ok(Invocation::Completed(self.run(op, progress).await)),
            Prepared::NeedsConfirmation(pending) => {
                let invocation = Invocation::NeedsConfirmation {
                    prompt: pending.prompt(),
                    target_count: pending.operation().targets.len(),
                };
                self.pending = Some(pending);
                Ok(invocation)
            }
        }
    }

    /// 確認の回答
    pub async fn resolve(&mut self, decision: Decision, progress: Option<&ProgressBar>) -> Result<BatchReport> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| PdfMetaError::Config("確認待ちの操作がありません".into()))?;
        let op = self.orchestrator.resolve(pending, decision)?;
        Ok(self.run(op, progress).await)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 変更内容のプレビュー（書き込まない）
    pub fn plan(&self, field: Field, action: Action) -> Result<Vec<PlanEntry>> {
        let input = self.selection.input_text(field);
        let op = self.orchestrator.validate(&self.selection, field, action, input)?;
        Ok(self.orchestrator.plan(&op, &self.selection))
    }

    pub async fn undo(&mut self, progress: Option<&ProgressBar>) -> Result<BatchReport> {
        self.pending = None;
        self.orchestrator.undo(Some(&mut self.selection), progress).await
    }

    pub fn undo_available(&self) -> bool {
        self.orchestrator.undo_available()
    }

    pub fn panel_values(&self) -> BTreeMap<Field, PanelValue> {
        self.selection.panel_values()
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator<B> {
        &self.orchestrator
    }

    async fn run(&mut self, op: BatchOperation, progress: Option<&ProgressBar>) -> BatchReport {
        if let Some(pb) = progress {
            pb.set_length(op.targets.len() as u64);
        }
        self.orchestrator.execute(op, &mut self.selection, progress).await
    }
}
