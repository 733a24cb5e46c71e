use clap::{Parser, Subcommand};
use pdf_meta_common::{Action, Field};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-meta")]
#[command(about = "PDFメタデータ（Title/Author/Subject/Keywords）一括編集ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 並列数（省略時は設定ファイルの値）
    #[arg(short = 'j', long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// フォルダ内のPDFを読み込んで一覧表示
    Scan {
        /// PDFフォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 直下のみスキャン（サブフォルダを含めない）
        #[arg(long)]
        flat: bool,

        /// 各フィールドの値も表示
        #[arg(short, long)]
        long: bool,
    },

    /// 1フィールドを一括で書き換え
    Set {
        /// PDFフォルダ、またはPDFファイル（複数可）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// フィールド (title/author/subject/keywords)
        #[arg(short, long)]
        field: Field,

        /// 操作 (update/add/clear/copy-filename/folder-tag/sentinel-tag)
        #[arg(short, long, default_value = "update")]
        action: Action,

        /// 入力値（update/add のみ）
        #[arg(long, default_value = "")]
        value: String,

        /// 確認せずに実行
        #[arg(short, long)]
        yes: bool,

        /// 書き込まずに変更内容を表示
        #[arg(long)]
        dry_run: bool,

        /// 直下のみスキャン
        #[arg(long)]
        flat: bool,
    },

    /// 直前の一括変更を取り消す
    Undo {
        /// 確認せずに実行
        #[arg(short, long)]
        yes: bool,
    },

    /// Keywordsを正規化して表示
    Keywords {
        /// キーワード（`,` 区切り）
        #[arg(required = true)]
        text: String,
    },

    /// 対話モード
    Shell {
        /// PDFフォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 直下のみスキャン
        #[arg(long)]
        flat: bool,
    },

    /// 設定を表示/編集
    Config {
        /// ExifToolのパスを設定
        #[arg(long)]
        set_exiftool: Option<PathBuf>,

        /// 並列数を設定
        #[arg(long)]
        set_workers: Option<usize>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
