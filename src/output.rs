//! 端末表示
//!
//! 一覧・集計・ドライラン結果の出力と進捗バー

use crate::batch::{BatchReport, PlanEntry};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_meta_common::{Field, FileHealth, FileRecord, JobOutcome, PanelValue};
use std::collections::BTreeMap;
use std::time::Duration;

/// 進捗バー
pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn health_mark(health: FileHealth) -> &'static str {
    match health {
        FileHealth::Ok => "  ",
        FileHealth::Protected => "🔒",
        FileHealth::Corrupted => "✗ ",
        FileHealth::Unreadable => "? ",
    }
}

fn display_path(record: &FileRecord) -> String {
    if record.in_subfolder {
        let parent = record
            .path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{}/{}", parent, record.file_name)
    } else {
        record.file_name.clone()
    }
}

/// ファイル一覧
///
/// `checked` は行ごとのチェック状態（なければ表示しない）
pub fn print_records(records: &[FileRecord], checked: Option<&dyn Fn(&FileRecord) -> bool>, long: bool) {
    for (i, record) in records.iter().enumerate() {
        let mark = match checked {
            Some(is_checked) if is_checked(record) => "[x]",
            Some(_) => "[ ]",
            None => "",
        };
        println!("{:>4} {} {} {}", i + 1, mark, health_mark(record.health), display_path(record));

        if !record.health.is_ok() {
            println!("          {}: {}", record.health, record.error_message);
            continue;
        }
        if let Some(warning) = &record.filename_warning {
            println!("          ⚠ {}", warning);
        }
        if long {
            for field in Field::ALL {
                let value = record.value(field);
                if !value.is_empty() {
                    println!("          {:<8} {}", field.tag(), value);
                }
            }
        }
    }
}

pub fn print_panel(values: &BTreeMap<Field, PanelValue>, dirty: impl Fn(Field) -> bool) {
    for (field, value) in values {
        let shown = match value {
            PanelValue::Uniform(v) => v.clone(),
            PanelValue::Mixed => "<複数の値>".to_string(),
        };
        let flag = if dirty(*field) { " *" } else { "" };
        println!("  {:<8} {}{}", field.tag(), shown, flag);
    }
}

pub fn print_report(report: &BatchReport) {
    println!("✔ {}", report);
    for result in &report.results {
        match &result.outcome {
            JobOutcome::Failed(failure) => {
                println!("  ✗ {}: {}", result.path.display(), failure);
            }
            JobOutcome::SkippedIneligible(health) => {
                println!("  - {}: スキップ ({})", result.path.display(), health);
            }
            _ => {}
        }
    }
}

pub fn print_plan(plan: &[PlanEntry]) {
    for entry in plan {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match &entry.new_value {
            Some(new_value) if *new_value == entry.previous => println!("  = {}: {:?}", name, new_value),
            Some(new_value) => println!("  ~ {}: {:?} → {:?}", name, entry.previous, new_value),
            None => println!("  - {}: 入力が空のため変更なし", name),
        }
    }
}
