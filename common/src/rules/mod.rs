//! ルールエンジン
//!
//! (フィールド, 操作) ごとの値の計算。I/Oなしの純粋関数のみ。
//!
//! ## 対応表
//! | フィールド | Update | Add | Clear | その他 |
//! |---|---|---|---|---|
//! | Title | 置換 | - | 空 | CopyFilenameToTitle |
//! | Author / Subject | 置換 | トークンマージ | 空 | - |
//! | Keywords | 正規化して置換 | 正規化マージ | 空 | FolderTag / SentinelTag |

pub mod filename;
pub mod keywords;
pub mod natural;
pub mod tokens;

use crate::types::{Action, Field, PanelValue};
use std::path::Path;

/// 値の計算方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// 入力値（前後空白除去）で置換
    Replace,
    /// 入力値を正規化して置換
    ReplaceKeywords,
    /// `,;|` 区切りでマージ
    MergeTokens,
    /// 既存値と合わせて正規化
    MergeKeywords,
    /// 空文字にする
    Clear,
    /// ファイル名から拡張子を除いたもの
    FilenameStem,
}

const RULE_TABLE: &[(Field, Action, Rule)] = &[
    (Field::Title, Action::Update, Rule::Replace),
    (Field::Title, Action::Clear, Rule::Clear),
    (Field::Title, Action::CopyFilenameToTitle, Rule::FilenameStem),
    (Field::Author, Action::Update, Rule::Replace),
    (Field::Author, Action::Add, Rule::MergeTokens),
    (Field::Author, Action::Clear, Rule::Clear),
    (Field::Subject, Action::Update, Rule::Replace),
    (Field::Subject, Action::Add, Rule::MergeTokens),
    (Field::Subject, Action::Clear, Rule::Clear),
    (Field::Keywords, Action::Update, Rule::ReplaceKeywords),
    (Field::Keywords, Action::Add, Rule::MergeKeywords),
    (Field::Keywords, Action::Clear, Rule::Clear),
    (Field::Keywords, Action::FolderTag, Rule::MergeKeywords),
    (Field::Keywords, Action::SentinelTag, Rule::MergeKeywords),
];

/// (フィールド, 操作) に対応するルール。未対応の組み合わせは `None`
pub fn rule_for(field: Field, action: Action) -> Option<Rule> {
    RULE_TABLE
        .iter()
        .find(|(f, a, _)| *f == field && *a == action)
        .map(|(_, _, rule)| *rule)
}

impl Rule {
    /// 新しい値を計算する
    ///
    /// 入力が空（Update/Add）の場合は `None` を返し、何もしない。
    pub fn apply(self, current: &str, input: &str, file_name: &str) -> Option<String> {
        let input = input.trim();
        match self {
            Rule::Clear => Some(String::new()),
            Rule::FilenameStem => Some(
                Path::new(file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
            ),
            _ if input.is_empty() => None,
            Rule::Replace => Some(input.to_string()),
            Rule::ReplaceKeywords => {
                let canonical = keywords::canonicalize(input);
                // 区切り文字だけの入力は空入力扱い
                (!canonical.is_empty()).then_some(canonical)
            }
            Rule::MergeTokens => Some(tokens::merge(current, input)),
            Rule::MergeKeywords => Some(keywords::merge(current, input)),
        }
    }
}

/// 複数ファイルの値からパネル表示値を決める
///
/// すべて同じならその値、異なれば `Mixed`。対象がなければ空文字。
pub fn display_value<'a, I>(values: I) -> PanelValue
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = values.into_iter();
    let first = match iter.next() {
        Some(v) => v,
        None => return PanelValue::Uniform(String::new()),
    };
    if iter.all(|v| v == first) {
        PanelValue::Uniform(first.to_string())
    } else {
        PanelValue::Mixed
    }
}
