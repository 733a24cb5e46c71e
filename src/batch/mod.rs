//! バッチ処理
//!
//! 1回の操作ごとに次の順で進む:
//! Validating → Confirming → Executing → Committing → Done
//! （検証失敗・確認で取り消し → Aborted）
//!
//! 確認待ちは `PendingBatch` として呼び出し側に返し、回答を `resolve` で受け取る。
//! 実行開始後は中断しない。失敗したファイルは集計に残るだけでUndoには入らない。

pub mod undo;

use crate::backend::MetadataBackend;
use crate::error::{PdfMetaError, Result, ValidationError};
use crate::pool::{JobValue, WorkerPool, WriteJob};
use indicatif::ProgressBar;
use pdf_meta_common::{
    folder_tag, rule_for, Action, BatchSummary, ConfirmationKey, ConfirmationPolicy, Decision, Field,
    FileHealth, JobOutcome, JobResult, Rule, SelectionModel, UndoEntry, SENTINEL_TAG,
};
use std::fmt;
use std::path::{Path, PathBuf};
use undo::UndoJournal;

/// バッチの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Validating,
    Confirming,
    Executing,
    Committing,
    Done,
    Aborted,
}

/// 検証済みの1操作（ボタンを押した時点の対象を保持する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperation {
    pub field: Field,
    pub action: Action,
    pub rule: Rule,
    pub input: String,
    pub targets: Vec<PathBuf>,
}

impl BatchOperation {
    pub fn key(&self) -> ConfirmationKey {
        ConfirmationKey::new(self.field, self.action)
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.action, self.field)
    }

    fn jobs(&self) -> Vec<WriteJob> {
        self.targets
            .iter()
            .map(|path| WriteJob {
                path: path.clone(),
                field: self.field,
                value: JobValue::Computed {
                    rule: self.rule,
                    input: self.input.clone(),
                },
            })
            .collect()
    }
}

/// 確認待ちのバッチ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBatch {
    operation: BatchOperation,
}

impl PendingBatch {
    pub fn key(&self) -> ConfirmationKey {
        self.operation.key()
    }

    pub fn operation(&self) -> &BatchOperation {
        &self.operation
    }

    /// 確認ダイアログの文言
    pub fn prompt(&self) -> String {
        let count = self.operation.targets.len();
        match self.operation.action {
            Action::Clear => format!("{}件のファイルの {} を空にします。よろしいですか？", count, self.operation.field),
            Action::FolderTag | Action::SentinelTag => format!(
                "{}件のファイルの Keywords に {} を追加します。よろしいですか？",
                count, self.operation.input
            ),
            _ => format!(
                "{}件のファイルの {} を変更します ({})。よろしいですか？",
                count,
                self.operation.field,
                self.operation.action
            ),
        }
    }
}

/// 準備の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Ready(BatchOperation),
    NeedsConfirmation(PendingBatch),
}

/// バッチ完了時の報告
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub description: String,
    pub summary: BatchSummary,
    pub results: Vec<JobResult>,
    /// Undoジャーナルを更新したか
    pub undo_recorded: bool,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.summary)
    }
}

/// ドライランの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub previous: String,
    /// `None` は空入力で変更なし
    pub new_value: Option<String>,
}

pub struct BatchOrchestrator<B: MetadataBackend> {
    pool: WorkerPool<B>,
    policy: ConfirmationPolicy,
    journal: UndoJournal,
    journal_path: Option<PathBuf>,
    folder_tag: Option<String>,
    state: BatchState,
}

impl<B: MetadataBackend> BatchOrchestrator<B> {
    pub fn new(pool: WorkerPool<B>, policy: ConfirmationPolicy) -> Self {
        Self {
            pool,
            policy,
            journal: UndoJournal::new(),
            journal_path: None,
            folder_tag: None,
            state: BatchState::Idle,
        }
    }

    /// Undoジャーナルをファイルに保存する（既存の内容を読み込む）
    pub fn with_journal_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.journal = UndoJournal::load(&path);
        self.journal_path = Some(path);
        self
    }

    pub fn pool(&self) -> &WorkerPool<B> {
        &self.pool
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn undo_available(&self) -> bool {
        self.journal.is_available()
    }

    pub fn journal(&self) -> &UndoJournal {
        &self.journal
    }

    /// スキャン元フォルダ（FolderTag用）
    pub fn set_scan_root(&mut self, root: &Path) {
        self.folder_tag = root
            .file_name()
            .and_then(|name| folder_tag(&name.to_string_lossy()));
    }

    pub fn folder_tag(&self) -> Option<&str> {
        self.folder_tag.as_deref()
    }

    /// 検証のみ（状態は変えない）
    pub fn validate(
        &self,
        selection: &SelectionModel,
        field: Field,
        action: Action,
        input: &str,
    ) -> std::result::Result<BatchOperation, ValidationError> {
        let rule = rule_for(field, action).ok_or(ValidationError::UnsupportedAction(field, action))?;

        let targets = selection.target_set();
        if targets.is_empty() {
            return Err(ValidationError::EmptyTargetSet);
        }
        let ineligible: Vec<PathBuf> = targets
            .iter()
            .filter(|r| !r.is_eligible())
            .map(|r| r.path.clone())
            .collect();
        if !ineligible.is_empty() {
            return Err(ValidationError::IneligibleTargets(ineligible));
        }

        if action.is_dirty_gated() && !selection.is_dirty(field) {
            return Err(ValidationError::NotDirty(field));
        }

        let input = match action {
            Action::Update | Action::Add => input.to_string(),
            Action::FolderTag => self
                .folder_tag
                .clone()
                .ok_or(ValidationError::NoFolderTag)?,
            Action::SentinelTag => SENTINEL_TAG.to_string(),
            Action::Clear | Action::CopyFilenameToTitle => String::new(),
        };

        Ok(BatchOperation {
            field,
            action,
            rule,
            input,
            targets: targets.iter().map(|r| r.path.clone()).collect(),
        })
    }

    /// 検証して、確認が必要かを判定する
    pub fn prepare(
        &mut self,
        selection: &SelectionModel,
        field: Field,
        action: Action,
        input: &str,
    ) -> Result<Prepared> {
        if self.state == BatchState::Executing || self.state == BatchState::Committing {
            return Err(PdfMetaError::BatchInProgress);
        }

        self.state = BatchState::Validating;
        let operation = match self.validate(selection, field, action, input) {
            Ok(op) => op,
            Err(e) => {
                tracing::info!("バッチを中止: {}", e);
                self.state = BatchState::Aborted;
                return Err(e.into());
            }
        };

        if self
            .policy
            .requires_confirmation(field, action, operation.targets.len())
        {
            self.state = BatchState::Confirming;
            Ok(Prepared::NeedsConfirmation(PendingBatch { operation }))
        } else {
            Ok(Prepared::Ready(operation))
        }
    }

    /// 確認の回答を反映する
    pub fn resolve(&mut self, pending: PendingBatch, decision: Decision) -> Result<BatchOperation> {
        if self.policy.resolve(pending.key(), decision) {
            Ok(pending.operation)
        } else {
            tracing::info!("キャンセル: {}", pending.operation.description());
            self.state = BatchState::Aborted;
            Err(PdfMetaError::ConfirmationDeclined)
        }
    }

    /// 実行してコミットする
    pub async fn execute(
        &mut self,
        operation: BatchOperation,
        selection: &mut SelectionModel,
        progress: Option<&ProgressBar>,
    ) -> BatchReport {
        let description = operation.description();
        tracing::info!("バッチ開始: {} ({}件)", description, operation.targets.len());

        self.state = BatchState::Executing;
        let results = self.pool.write_all(operation.jobs(), progress).await;

        self.state = BatchState::Committing;
        let entry = UndoEntry::from_results(description.clone(), &results);
        let undo_recorded = self.journal.record(entry);
        if undo_recorded {
            self.persist_journal();
        }
        apply_results(selection, &results);

        let summary = BatchSummary::from_results(&results);
        tracing::info!("バッチ完了: {}: {}", description, summary);
        self.state = BatchState::Done;

        BatchReport {
            description,
            summary,
            results,
            undo_recorded,
        }
    }

    /// 直前のバッチを取り消す
    ///
    /// ルール・確認・dirty判定を通さず、記録した値をそのまま書き戻す。
    pub async fn undo(
        &mut self,
        selection: Option<&mut SelectionModel>,
        progress: Option<&ProgressBar>,
    ) -> Result<BatchReport> {
        if self.state == BatchState::Executing || self.state == BatchState::Committing {
            return Err(PdfMetaError::BatchInProgress);
        }
        let entry = self.journal.take().ok_or(PdfMetaError::NothingToUndo)?;

        let description = format!("undo {}", entry.description);
        tracing::info!("Undo開始: {} ({}件)", entry.description, entry.changes.len());

        self.state = BatchState::Executing;
        let jobs = entry
            .changes
            .into_iter()
            .map(|change| WriteJob {
                path: change.path,
                field: change.field,
                value: JobValue::Literal(change.previous),
            })
            .collect();
        let results = self.pool.write_all(jobs, progress).await;

        // 書き戻しが終わるまでファイル上のエントリは残す
        self.state = BatchState::Committing;
        self.persist_journal();
        if let Some(selection) = selection {
            apply_results(selection, &results);
        }
        let summary = BatchSummary::from_results(&results);
        tracing::info!("Undo完了: {}", summary);
        self.state = BatchState::Done;

        Ok(BatchReport {
            description,
            summary,
            results,
            undo_recorded: false,
        })
    }

    /// 書き込まずに変更内容を計算する（画面上の値が基準）
    pub fn plan(&self, operation: &BatchOperation, selection: &SelectionModel) -> Vec<PlanEntry> {
        operation
            .targets
            .iter()
            .filter_map(|path| selection.record(path))
            .map(|record| {
                let previous = record.value(operation.field).to_string();
                let new_value = operation
                    .rule
                    .apply(&previous, &operation.input, &record.file_name);
                PlanEntry {
                    path: record.path.clone(),
                    previous,
                    new_value,
                }
            })
            .collect()
    }

    fn persist_journal(&self) {
        if let Some(path) = &self.journal_path {
            if let Err(e) = self.journal.save(path) {
                tracing::warn!("Undoジャーナルを保存できません: {}", e);
            }
        }
    }
}

/// 結果をパスで特定して反映する（表の並び順には依存しない）
///
/// 書き込み時に保護・破損と分かったファイルは健全性を更新してチェックから外す。
/// 入力欄は1件以上書き込めたときだけ表示値に戻す。
fn apply_results(selection: &mut SelectionModel, results: &[JobResult]) {
    let mut written = false;
    for result in results {
        match &result.outcome {
            JobOutcome::Written => {
                if let Some(value) = &result.new_value {
                    written |= selection.apply_written(&result.path, result.field, value);
                }
            }
            JobOutcome::SkippedIneligible(health) => {
                tracing::info!("対象外に変更: {}: {}", result.path.display(), health);
                selection.set_health(&result.path, *health, health_message(*health));
            }
            _ => {}
        }
    }
    if written {
        selection.refresh_panel();
    }
}

fn health_message(health: FileHealth) -> &'static str {
    match health {
        FileHealth::Protected => "Password protected",
        FileHealth::Corrupted => "Corrupted PDF",
        FileHealth::Unreadable => "Unreadable",
        FileHealth::Ok => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use pdf_meta_common::{FieldValues, FileRecord};
    use std::sync::Arc;

    fn setup(titles: &[(&str, &str)]) -> (Arc<MemoryBackend>, SelectionModel) {
        let backend = Arc::new(MemoryBackend::new());
        let mut records = Vec::new();
        for (path, title) in titles {
            let values = FieldValues {
                title: title.to_string(),
                ..Default::default()
            };
            backend.insert(*path, values.clone());
            let mut record = FileRecord::new(*path);
            record.values = values;
            records.push(record);
        }
        (backend, SelectionModel::with_records(records))
    }

    fn orchestrator(backend: &Arc<MemoryBackend>) -> BatchOrchestrator<MemoryBackend> {
        BatchOrchestrator::new(WorkerPool::new(Arc::clone(backend), 2), ConfirmationPolicy::default())
    }

    #[test]
    fn test_validate_rejects_empty_targets() {
        let (backend, selection) = setup(&[("/d/a.pdf", "A")]);
        let orch = orchestrator(&backend);
        assert_eq!(
            orch.validate(&selection, Field::Title, Action::Clear, ""),
            Err(ValidationError::EmptyTargetSet)
        );
    }

    #[test]
    fn test_validate_requires_dirty_for_update() {
        let (backend, mut selection) = setup(&[("/d/a.pdf", "A")]);
        selection.check_all();
        let orch = orchestrator(&backend);
        assert_eq!(
            orch.validate(&selection, Field::Title, Action::Update, "A"),
            Err(ValidationError::NotDirty(Field::Title))
        );
        // Clear と CopyFilenameToTitle は dirty 不要
        assert!(orch.validate(&selection, Field::Title, Action::Clear, "").is_ok());
        assert!(orch
            .validate(&selection, Field::Title, Action::CopyFilenameToTitle, "")
            .is_ok());
    }

    #[test]
    fn test_validate_unsupported_and_folder_tag() {
        let (backend, mut selection) = setup(&[("/d/a.pdf", "A")]);
        selection.check_all();
        let mut orch = orchestrator(&backend);
        assert_eq!(
            orch.validate(&selection, Field::Title, Action::Add, "x"),
            Err(ValidationError::UnsupportedAction(Field::Title, Action::Add))
        );
        assert_eq!(
            orch.validate(&selection, Field::Keywords, Action::FolderTag, ""),
            Err(ValidationError::NoFolderTag)
        );

        orch.set_scan_root(Path::new("/archive/A.4.3"));
        let op = orch
            .validate(&selection, Field::Keywords, Action::FolderTag, "")
            .unwrap();
        assert_eq!(op.input, "shib-A.4.3");
    }

    #[test]
    fn test_prepare_asks_for_multi_file_update() {
        let (backend, mut selection) = setup(&[("/d/a.pdf", "A"), ("/d/b.pdf", "B")]);
        selection.check_all();
        selection.set_input(Field::Title, "New");
        let mut orch = orchestrator(&backend);

        let prepared = orch.prepare(&selection, Field::Title, Action::Update, "New").unwrap();
        assert!(matches!(prepared, Prepared::NeedsConfirmation(_)));
        assert_eq!(orch.state(), BatchState::Confirming);

        if let Prepared::NeedsConfirmation(pending) = prepared {
            assert!(matches!(
                orch.resolve(pending, Decision::Declined),
                Err(PdfMetaError::ConfirmationDeclined)
            ));
        }
        assert_eq!(orch.state(), BatchState::Aborted);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_commits_undo_and_updates_records() {
        let (backend, mut selection) = setup(&[("/d/a.pdf", "A"), ("/d/b.pdf", "B")]);
        selection.check_all();
        let mut orch = orchestrator(&backend);

        let op = orch
            .validate(&selection, Field::Title, Action::CopyFilenameToTitle, "")
            .unwrap();
        let report = orch.execute(op, &mut selection, None).await;

        assert_eq!(report.summary.written, 2);
        assert!(orch.undo_available());
        assert_eq!(selection.record(Path::new("/d/a.pdf")).unwrap().values.title, "a");
        assert_eq!(orch.state(), BatchState::Done);

        let undo = orch.undo(Some(&mut selection), None).await.unwrap();
        assert_eq!(undo.summary.written, 2);
        assert_eq!(selection.record(Path::new("/d/b.pdf")).unwrap().values.title, "B");
        assert!(!orch.undo_available());
        assert!(matches!(orch.undo(None, None).await, Err(PdfMetaError::NothingToUndo)));
    }

    #[test]
    fn test_plan_uses_rules_without_writing() {
        let (backend, mut selection) = setup(&[("/d/a.pdf", "Old")]);
        selection.check_all();
        selection.set_input(Field::Title, "  New ");
        let orch = orchestrator(&backend);

        let op = orch
            .validate(&selection, Field::Title, Action::Update, "  New ")
            .unwrap();
        let plan = orch.plan(&op, &selection);
        assert_eq!(plan[0].previous, "Old");
        assert_eq!(plan[0].new_value.as_deref(), Some("New"));
        assert_eq!(backend.write_count(), 0);
    }
}
