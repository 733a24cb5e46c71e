//! ログ初期化
//!
//! 標準エラー出力と、日次ローテーションのファイル（`pdf-meta.log`）に出す。
//! `RUST_LOG` があればそちらを優先する。

use crate::config::Config;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "pdf-meta.log";

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// ログを初期化する
///
/// 返り値のガードは main の終わりまで保持すること（破棄でファイルへの書き出しが止まる）。
pub fn init(config: &Config, verbose: bool) -> Option<WorkerGuard> {
    let log_dir = if config.log_to_file {
        Config::log_dir().ok()
    } else {
        None
    };
    init_with_dir(log_dir.as_deref(), verbose)
}

pub fn init_with_dir(log_dir: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // テストなどで二重に初期化された場合は無視する
    let _ = tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
