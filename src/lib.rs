//! PDF Meta
//!
//! PDFのTitle/Author/Subject/KeywordsをExifTool経由で一括編集する。
//! 値の計算・選択状態・確認要否は `pdf_meta_common`、I/Oとバッチ処理はこのクレート。

pub mod backend;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pool;
pub mod scanner;
pub mod session;
pub mod shell;

pub use backend::{ExifToolBackend, MemoryBackend, MetadataBackend};
pub use batch::{BatchOrchestrator, BatchReport, BatchState, Prepared};
pub use config::Config;
pub use error::{PdfMetaError, Result, ValidationError};
pub use pool::WorkerPool;
pub use session::{Invocation, Session};
