use anyhow::{bail, Context, Result};
use clap::Parser;
use pdf_meta_common::{canonicalize_keywords, ConfirmationPolicy, Decision, Field};
use pdf_meta_rust::batch::BatchOrchestrator;
use pdf_meta_rust::cli::{Cli, Commands};
use pdf_meta_rust::{logging, output, scanner, shell};
use pdf_meta_rust::{Config, ExifToolBackend, Invocation, PdfMetaError, Session, WorkerPool};
use std::sync::Arc;

fn build_orchestrator(config: &Config, workers: Option<usize>) -> Result<BatchOrchestrator<ExifToolBackend>> {
    let exiftool = config.resolve_exiftool()?;
    let backend = Arc::new(ExifToolBackend::new(exiftool));
    let pool = WorkerPool::new(backend, workers.unwrap_or_else(|| config.worker_count()))
        .with_timeouts(config.read_timeout(), config.write_timeout());
    let policy = ConfirmationPolicy::new(config.suppression_flags());
    let journal = Config::undo_path()?;
    Ok(BatchOrchestrator::new(pool, policy).with_journal_file(journal))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("設定ファイルの読み込みに失敗")?;
    let _log_guard = logging::init(&config, cli.verbose);

    match cli.command {
        Commands::Scan { folder, flat, long } => {
            println!("📄 pdf-meta - スキャン\n");
            let orchestrator = build_orchestrator(&config, cli.workers)?;
            let paths = scanner::find_pdfs(&folder, config.recursive && !flat)?;

            let pb = output::progress_bar(paths.len() as u64, "読み込み中");
            let records = scanner::load_records(orchestrator.pool(), Some(&folder), &paths, Some(&pb)).await;
            pb.finish_and_clear();

            output::print_records(&records, None, long);
            println!("\n✔ {}", scanner::ScanStats::from_records(&records));
        }

        Commands::Set { paths, field, action, value, yes, dry_run, flat } => {
            let orchestrator = build_orchestrator(&config, cli.workers)?;
            let mut session = Session::new(orchestrator);

            let pb = output::progress_bar(0, "読み込み中");
            let stats = match paths.as_slice() {
                [folder] if folder.is_dir() => {
                    let stats = session.load_folder(folder, config.recursive && !flat, Some(&pb)).await?;
                    if stats.total == 0 {
                        bail!(PdfMetaError::NoPdfsFound(folder.display().to_string()));
                    }
                    stats
                }
                files => {
                    pb.set_length(files.len() as u64);
                    session.load_paths(files, Some(&pb)).await
                }
            };
            pb.finish_and_clear();
            println!("✔ {}", stats);

            session.check_all();
            if action.is_dirty_gated() {
                session.set_input(field, value);
            }

            if dry_run {
                println!("\n変更内容（ドライラン）: {} {}", action, field);
                output::print_plan(&session.plan(field, action)?);
                return Ok(());
            }

            let pb = output::progress_bar(0, "書き込み中");
            let report = match session.invoke(field, action, Some(&pb)).await? {
                Invocation::Completed(report) => report,
                Invocation::NeedsConfirmation { prompt, .. } => {
                    pb.finish_and_clear();
                    let decision = if yes {
                        Decision::Accepted
                    } else {
                        shell::prompt_decision(&prompt)?
                    };
                    let pb = output::progress_bar(0, "書き込み中");
                    let report = session.resolve(decision, Some(&pb)).await;
                    pb.finish_and_clear();
                    report?
                }
            };
            pb.finish_and_clear();
            output::print_report(&report);
            if report.undo_recorded {
                println!("  `pdf-meta undo` で取り消せます");
            }
        }

        Commands::Undo { yes } => {
            let mut orchestrator = build_orchestrator(&config, cli.workers)?;
            let (description, count) = match orchestrator.journal().entry() {
                Some(entry) => (entry.description.clone(), entry.changes.len()),
                None => bail!(PdfMetaError::NothingToUndo),
            };

            let prompt = format!("{} ({}件) を取り消します。よろしいですか？", description, count);
            if !yes && !shell::prompt_decision(&prompt)?.proceeds() {
                println!("キャンセルしました");
                return Ok(());
            }

            let pb = output::progress_bar(count as u64, "取り消し中");
            let report = orchestrator.undo(None, Some(&pb)).await;
            pb.finish_and_clear();
            output::print_report(&report?);
        }

        Commands::Keywords { text } => {
            println!("{}", canonicalize_keywords(&text));
        }

        Commands::Shell { folder, flat } => {
            println!("📄 pdf-meta - 対話モード\n");
            let orchestrator = build_orchestrator(&config, cli.workers)?;
            let mut session = Session::new(orchestrator);
            let recursive = config.recursive && !flat;

            let pb = output::progress_bar(0, "読み込み中");
            let stats = session.load_folder(&folder, recursive, Some(&pb)).await;
            pb.finish_and_clear();
            let stats = stats?;
            if stats.total == 0 {
                bail!(PdfMetaError::NoPdfsFound(folder.display().to_string()));
            }
            println!("✔ {}\n", stats);

            shell::run(&mut session, recursive).await?;
        }

        Commands::Config { set_exiftool, set_workers, show } => {
            let mut config = config;

            if let Some(path) = set_exiftool {
                config.set_exiftool(path)?;
                println!("✔ ExifToolのパスを設定しました");
            }

            if let Some(workers) = set_workers {
                config.set_workers(workers)?;
                println!("✔ 並列数を {} に設定しました", workers);
            }

            if show {
                let exiftool = config
                    .resolve_exiftool()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|e| e.to_string());
                println!("設定: {}", Config::config_path()?.display());
                println!("  ExifTool: {}", exiftool);
                println!("  並列数: {}", config.workers);
                println!(
                    "  タイムアウト: 読み込み {}秒 / 書き込み {}秒",
                    config.read_timeout_seconds, config.write_timeout_seconds
                );
                println!("  サブフォルダ: {}", if config.recursive { "含める" } else { "含めない" });
                println!("  ログ出力: {}", if config.log_to_file { "有効" } else { "無効" });
                if !config.suppress_confirmations.is_empty() {
                    println!("  確認省略: {}", config.suppress_confirmations.join(", "));
                }
                println!("  フィールド: {}", Field::ALL.map(|f| f.key()).join(", "));
            }
        }
    }

    Ok(())
}
