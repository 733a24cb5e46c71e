//! ワーカープール
//!
//! ファイル単位の読み込み・書き込みジョブを並列数を制限して実行する。
//! 1ファイルの失敗は他に影響しない。書き込み結果はチャネル経由で戻す。

use crate::backend::{ErrorClass, MetadataBackend};
use indicatif::ProgressBar;
use pdf_meta_common::{Field, FileHealth, FileRecord, JobFailure, JobOutcome, JobResult, Rule};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// 書き込む値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobValue {
    /// 書き込み直前の値からルールで計算する
    Computed { rule: Rule, input: String },
    /// そのまま書き込む（Undo用）
    Literal(String),
}

/// 1ファイル1フィールドの書き込みジョブ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteJob {
    pub path: PathBuf,
    pub field: Field,
    pub value: JobValue,
}

pub struct WorkerPool<B: MetadataBackend> {
    backend: Arc<B>,
    workers: usize,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl<B: MetadataBackend> Clone for WorkerPool<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            workers: self.workers,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

impl<B: MetadataBackend> WorkerPool<B> {
    pub fn new(backend: Arc<B>, workers: usize) -> Self {
        Self {
            backend,
            workers: workers.max(1),
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, read_timeout: Duration, write_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self.write_timeout = write_timeout;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 読み込みジョブを実行し、入力順の FileRecord を返す
    pub async fn read_all(&self, paths: &[PathBuf], progress: Option<&ProgressBar>) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = paths
            .iter()
            .map(|path| {
                let mut record = FileRecord::new(path.clone());
                record.health = FileHealth::Unreadable;
                record.error_message = "worker terminated".to_string();
                record
            })
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set: JoinSet<(usize, FileRecord)> = JoinSet::new();

        for (idx, path) in paths.iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let backend = Arc::clone(&self.backend);
            let path = path.clone();
            let read_timeout = self.read_timeout;

            join_set.spawn(async move {
                let _permit = permit;
                (idx, read_record(&*backend, path, read_timeout).await)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, record)) => {
                    if let Some(slot) = records.get_mut(idx) {
                        *slot = record;
                    }
                }
                Err(e) => tracing::warn!("読み込みタスクが異常終了: {}", e),
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        records
    }

    /// 書き込みジョブを実行する
    ///
    /// 投入は `jobs` の順。完了順は不定だが、結果は投入順に並べて返す。
    pub async fn write_all(&self, jobs: Vec<WriteJob>, progress: Option<&ProgressBar>) -> Vec<JobResult> {
        let total = jobs.len();
        let mut ordered: Vec<Option<JobResult>> = (0..total).map(|_| None).collect();
        let submitted: Vec<(PathBuf, Field)> = jobs.iter().map(|j| (j.path.clone(), j.field)).collect();

        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, JobResult)>();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set: JoinSet<()> = JoinSet::new();

        for (idx, job) in jobs.into_iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let backend = Arc::clone(&self.backend);
            let tx = tx.clone();
            let read_timeout = self.read_timeout;
            let write_timeout = self.write_timeout;

            join_set.spawn(async move {
                let _permit = permit;
                let result = run_write_job(&*backend, job, read_timeout, write_timeout).await;
                // 受信側が先に閉じることはない
                let _ = tx.send((idx, result));
            });
        }
        drop(tx);

        while let Some((idx, result)) = rx.recv().await {
            if let JobOutcome::Failed(failure) = &result.outcome {
                tracing::warn!("書き込み失敗: {}: {}", result.path.display(), failure);
            }
            if let Some(slot) = ordered.get_mut(idx) {
                *slot = Some(result);
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("書き込みタスクが異常終了: {}", e);
            }
        }

        ordered
            .into_iter()
            .zip(submitted)
            .map(|(result, (path, field))| {
                result.unwrap_or_else(|| JobResult {
                    path,
                    field,
                    outcome: JobOutcome::Failed(JobFailure::Backend("worker terminated".into())),
                    previous: None,
                    new_value: None,
                })
            })
            .collect()
    }
}

async fn read_record<B: MetadataBackend>(backend: &B, path: PathBuf, read_timeout: Duration) -> FileRecord {
    let mut record = FileRecord::new(path);
    match timeout(read_timeout, backend.read(&record.path)).await {
        Ok(Ok(values)) => record.values = values,
        Ok(Err(e)) => {
            tracing::debug!("読み込み不可: {}: {}", record.path.display(), e);
            record.health = e.health();
            record.error_message = e.message;
        }
        Err(_) => {
            record.health = FileHealth::Unreadable;
            record.error_message = "Timeout reading metadata".to_string();
        }
    }
    record
}

/// 書き込み前の値を読み、ルールで新しい値を決めてから書き込む
async fn run_write_job<B: MetadataBackend>(
    backend: &B,
    job: WriteJob,
    read_timeout: Duration,
    write_timeout: Duration,
) -> JobResult {
    let WriteJob { path, field, value } = job;
    let finish = |outcome, previous: Option<String>, new_value: Option<String>| JobResult {
        path: path.clone(),
        field,
        outcome,
        previous,
        new_value,
    };

    let current = match timeout(read_timeout, backend.read(&path)).await {
        Ok(Ok(values)) => values,
        Ok(Err(e)) => {
            let outcome = match e.class {
                ErrorClass::Protected | ErrorClass::Corrupted => JobOutcome::SkippedIneligible(e.health()),
                _ => JobOutcome::Failed(e.job_failure()),
            };
            return finish(outcome, None, None);
        }
        Err(_) => return finish(JobOutcome::Failed(JobFailure::Timeout), None, None),
    };

    let previous = current.get(field).to_string();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_value = match &value {
        JobValue::Computed { rule, input } => rule.apply(&previous, input, &file_name),
        JobValue::Literal(literal) => Some(literal.clone()),
    };
    let new_value = match new_value {
        Some(v) => v,
        None => return finish(JobOutcome::SkippedEmptyInput, Some(previous), None),
    };

    let outcome = match timeout(write_timeout, backend.write(&path, field, &new_value)).await {
        Ok(Ok(())) => {
            tracing::debug!("{} {}: {:?} → {:?}", path.display(), field, previous, new_value);
            JobOutcome::Written
        }
        Ok(Err(e)) => JobOutcome::Failed(e.job_failure()),
        Err(_) => JobOutcome::Failed(JobFailure::Timeout),
    };
    finish(outcome, Some(previous), Some(new_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use pdf_meta_common::FieldValues;
    use std::path::Path;

    fn values(title: &str) -> FieldValues {
        FieldValues {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_read_all_keeps_input_order() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("/a.pdf", values("A"));
        backend.insert("/b.pdf", values("B"));
        backend.set_delay("/a.pdf", Duration::from_millis(30));
        backend.insert("/p.pdf", values(""));
        backend.set_health("/p.pdf", FileHealth::Protected);

        let pool = WorkerPool::new(backend, 3);
        let paths = vec![PathBuf::from("/a.pdf"), PathBuf::from("/b.pdf"), PathBuf::from("/p.pdf")];
        let records = pool.read_all(&paths, None).await;

        assert_eq!(records[0].values.title, "A");
        assert_eq!(records[1].values.title, "B");
        assert_eq!(records[2].health, FileHealth::Protected);
    }

    #[tokio::test]
    async fn test_read_timeout_is_unreadable() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("/slow.pdf", values("x"));
        backend.set_delay("/slow.pdf", Duration::from_millis(200));

        let pool = WorkerPool::new(backend, 1).with_timeouts(Duration::from_millis(20), Duration::from_secs(1));
        let records = pool.read_all(&[PathBuf::from("/slow.pdf")], None).await;
        assert_eq!(records[0].health, FileHealth::Unreadable);
    }

    #[tokio::test]
    async fn test_write_captures_previous_value() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("/a.pdf", values("Old"));
        let pool = WorkerPool::new(Arc::clone(&backend), 2);

        let results = pool
            .write_all(
                vec![WriteJob {
                    path: PathBuf::from("/a.pdf"),
                    field: Field::Title,
                    value: JobValue::Computed {
                        rule: Rule::Replace,
                        input: "New".into(),
                    },
                }],
                None,
            )
            .await;

        assert_eq!(results[0].outcome, JobOutcome::Written);
        assert_eq!(results[0].previous.as_deref(), Some("Old"));
        assert_eq!(backend.value(Path::new("/a.pdf"), Field::Title).as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn test_empty_input_is_skipped_without_write() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("/a.pdf", values("Old"));
        let pool = WorkerPool::new(Arc::clone(&backend), 2);

        let results = pool
            .write_all(
                vec![WriteJob {
                    path: PathBuf::from("/a.pdf"),
                    field: Field::Title,
                    value: JobValue::Computed {
                        rule: Rule::Replace,
                        input: "  ".into(),
                    },
                }],
                None,
            )
            .await;

        assert_eq!(results[0].outcome, JobOutcome::SkippedEmptyInput);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_timeout_is_job_failure() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("/slow.pdf", values("x"));
        backend.insert("/fast.pdf", values("y"));
        backend.set_delay("/slow.pdf", Duration::from_millis(300));

        let pool = WorkerPool::new(Arc::clone(&backend), 2)
            .with_timeouts(Duration::from_secs(1), Duration::from_millis(50));
        let jobs = ["/slow.pdf", "/fast.pdf"]
            .iter()
            .map(|p| WriteJob {
                path: PathBuf::from(p),
                field: Field::Title,
                value: JobValue::Literal("z".into()),
            })
            .collect();
        let results = pool.write_all(jobs, None).await;

        assert_eq!(results[0].outcome, JobOutcome::Failed(JobFailure::Timeout));
        assert_eq!(results[1].outcome, JobOutcome::Written);
    }
}
