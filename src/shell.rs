//! 対話モード
//!
//! 表・パネルの代わりにコマンドでチェック・クリック・入力・実行を行う。
//! 「今後確認しない」はこのセッションの間だけ有効。

use crate::backend::MetadataBackend;
use crate::error::{PdfMetaError, Result};
use crate::output;
use crate::session::{Invocation, Session};
use dialoguer::{Input, Select};
use pdf_meta_common::{Action, Decision, Field, FileRecord};
use std::path::PathBuf;

/// 対話コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List { long: bool },
    Check(Selector),
    Uncheck(Selector),
    Invert,
    /// `None` でクリック解除
    Click(Option<usize>),
    Input { field: Field, text: String },
    Reset(Field),
    Panel,
    Apply { field: Field, action: Action },
    Plan { field: Field, action: Action },
    Undo,
    Rescan,
    Help,
    Quit,
}

/// 行の指定（1始まり、範囲は両端を含む）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    All,
    Rows(Vec<(usize, usize)>),
}

const HELP: &str = "\
  ls [-l]                 一覧（-l で値も表示）
  check <n..|all>         チェック
  uncheck <n..|all>       チェック解除
  invert                  チェック反転
  click [n]               プレビュー対象（省略で解除）
  set <field> <text>      入力欄を変更
  reset <field>           入力欄を元に戻す
  panel                   パネル表示値
  apply <field> <action>  実行 (update/add/clear/copy-filename/folder-tag/sentinel-tag)
  plan <field> <action>   実行内容のプレビュー
  undo                    直前の一括変更を取り消す
  rescan                  再スキャン
  quit                    終了";

fn parse_rows(args: &[&str]) -> std::result::Result<Selector, String> {
    if args.len() == 1 && args[0].eq_ignore_ascii_case("all") {
        return Ok(Selector::All);
    }
    if args.is_empty() {
        return Err("行番号を指定してください".into());
    }
    let mut spans = Vec::new();
    for arg in args {
        let invalid = || format!("行番号が不正: {}", arg);
        // 範囲指定 (3-7)
        let span: (usize, usize) = match arg.split_once('-') {
            Some((start, end)) => (
                start.parse().map_err(|_| invalid())?,
                end.parse().map_err(|_| invalid())?,
            ),
            None => {
                let row = arg.parse().map_err(|_| invalid())?;
                (row, row)
            }
        };
        if span.0 == 0 {
            return Err("行番号は1から".into());
        }
        spans.push(span);
    }
    Ok(Selector::Rows(spans))
}

/// 行番号（1始まり）を一覧の添字に展開する。一覧の件数を超える分は捨てる
fn expand_rows(spans: &[(usize, usize)], len: usize) -> Vec<usize> {
    spans
        .iter()
        .flat_map(|&(start, end)| start..=end.min(len))
        .map(|row| row - 1)
        .collect()
}

/// 1行を解釈する
pub fn parse_command(line: &str) -> std::result::Result<ShellCommand, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let field_action = |args: &[&str]| -> std::result::Result<(Field, Action), String> {
        match args {
            [field, action] => Ok((
                field.parse().map_err(|e: pdf_meta_common::Error| e.to_string())?,
                action.parse().map_err(|e: pdf_meta_common::Error| e.to_string())?,
            )),
            _ => Err("<field> <action> を指定してください".into()),
        }
    };

    match head.to_lowercase().as_str() {
        "ls" | "list" => Ok(ShellCommand::List { long: args.contains(&"-l") }),
        "check" | "c" => parse_rows(&args).map(ShellCommand::Check),
        "uncheck" | "u" => parse_rows(&args).map(ShellCommand::Uncheck),
        "invert" => Ok(ShellCommand::Invert),
        "click" => match args.first() {
            None => Ok(ShellCommand::Click(None)),
            Some(n) => n
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(|n| ShellCommand::Click(Some(n)))
                .ok_or_else(|| format!("行番号が不正: {}", n)),
        },
        "set" | "input" => {
            let (field, text) = match rest.split_once(char::is_whitespace) {
                Some((field, text)) => (field, text.trim()),
                None => (rest, ""),
            };
            let field = field.parse().map_err(|e: pdf_meta_common::Error| e.to_string())?;
            Ok(ShellCommand::Input {
                field,
                text: text.to_string(),
            })
        }
        "reset" => args
            .first()
            .ok_or_else(|| "フィールドを指定してください".to_string())?
            .parse()
            .map(ShellCommand::Reset)
            .map_err(|e: pdf_meta_common::Error| e.to_string()),
        "panel" | "p" => Ok(ShellCommand::Panel),
        "apply" | "a" => field_action(&args).map(|(field, action)| ShellCommand::Apply { field, action }),
        "plan" => field_action(&args).map(|(field, action)| ShellCommand::Plan { field, action }),
        "undo" => Ok(ShellCommand::Undo),
        "rescan" => Ok(ShellCommand::Rescan),
        "help" | "?" | "h" => Ok(ShellCommand::Help),
        "quit" | "q" | "exit" => Ok(ShellCommand::Quit),
        "" => Err(String::new()),
        other => Err(format!("不明なコマンド: {} (help で一覧)", other)),
    }
}

/// 確認ダイアログ
pub fn prompt_decision(prompt: &str) -> Result<Decision> {
    let items = ["はい", "はい（今後このセッションでは確認しない）", "キャンセル"];
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| PdfMetaError::Config(e.to_string()))?;
    Ok(match choice {
        0 => Decision::Accepted,
        1 => Decision::SuppressFuture,
        _ => Decision::Declined,
    })
}

fn row_paths<B: MetadataBackend>(session: &Session<B>, selector: &Selector) -> Vec<PathBuf> {
    let records = session.selection().records();
    match selector {
        Selector::All => records.iter().map(|r| r.path.clone()).collect(),
        Selector::Rows(spans) => expand_rows(spans, records.len())
            .into_iter()
            .filter_map(|i| records.get(i))
            .map(|r| r.path.clone())
            .collect(),
    }
}

fn print_list<B: MetadataBackend>(session: &Session<B>, long: bool) {
    let selection = session.selection();
    let is_checked: &dyn Fn(&FileRecord) -> bool = &|r| selection.is_checked(&r.path);
    output::print_records(selection.records(), Some(is_checked), long);
    if let Some(clicked) = selection.clicked() {
        println!("  クリック中: {}", clicked.file_name);
    }
}

/// 対話ループ
pub async fn run<B: MetadataBackend>(session: &mut Session<B>, recursive: bool) -> Result<()> {
    println!("help でコマンド一覧、quit で終了\n");
    print_list(session, false);

    loop {
        let line: String = Input::new()
            .with_prompt("pdf-meta")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| PdfMetaError::Config(e.to_string()))?;

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{}", message);
                }
                continue;
            }
        };

        if let Err(e) = execute(session, command.clone(), recursive).await {
            println!("✗ {}", e);
        }
        if command == ShellCommand::Quit {
            break;
        }
    }
    Ok(())
}

async fn execute<B: MetadataBackend>(
    session: &mut Session<B>,
    command: ShellCommand,
    recursive: bool,
) -> Result<()> {
    match command {
        ShellCommand::List { long } => print_list(session, long),
        ShellCommand::Check(selector) => {
            let paths = row_paths(session, &selector);
            let refused = paths.iter().filter(|p| !session.check(p)).count();
            if refused > 0 {
                println!("  {}件は書き込みできないためチェックしません", refused);
            }
        }
        ShellCommand::Uncheck(Selector::All) => session.clear_checked(),
        ShellCommand::Uncheck(selector) => {
            for path in row_paths(session, &selector) {
                session.uncheck(&path);
            }
        }
        ShellCommand::Invert => session.invert_checked(),
        ShellCommand::Click(row) => {
            let path = row.and_then(|n| row_paths(session, &Selector::Rows(vec![(n, n)])).into_iter().next());
            session.click(path.as_deref());
            print_panel(session);
        }
        ShellCommand::Input { field, text } => {
            session.set_input(field, text);
            print_panel(session);
        }
        ShellCommand::Reset(field) => session.reset_input(field),
        ShellCommand::Panel => print_panel(session),
        ShellCommand::Apply { field, action } => {
            let pb = output::progress_bar(0, "書き込み中");
            let invocation = session.invoke(field, action, Some(&pb)).await;
            let report = match invocation {
                Ok(Invocation::Completed(report)) => Ok(report),
                Ok(Invocation::NeedsConfirmation { prompt, .. }) => {
                    pb.finish_and_clear();
                    let decision = prompt_decision(&prompt)?;
                    let pb = output::progress_bar(0, "書き込み中");
                    let report = session.resolve(decision, Some(&pb)).await;
                    pb.finish_and_clear();
                    report
                }
                Err(e) => Err(e),
            };
            pb.finish_and_clear();
            output::print_report(&report?);
        }
        ShellCommand::Plan { field, action } => output::print_plan(&session.plan(field, action)?),
        ShellCommand::Undo => {
            let pb = output::progress_bar(0, "取り消し中");
            let report = session.undo(Some(&pb)).await;
            pb.finish_and_clear();
            output::print_report(&report?);
        }
        ShellCommand::Rescan => {
            let pb = output::progress_bar(0, "読み込み中");
            let stats = session.rescan(recursive, Some(&pb)).await;
            pb.finish_and_clear();
            println!("✔ {}", stats?);
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => {}
    }
    Ok(())
}

fn print_panel<B: MetadataBackend>(session: &Session<B>) {
    let selection = session.selection();
    let targets = selection.target_set().len();
    println!("  対象: {}件{}", targets, if session.undo_available() { " (undo可)" } else { "" });
    output::print_panel(&session.panel_values(), |field| selection.is_dirty(field));
}
