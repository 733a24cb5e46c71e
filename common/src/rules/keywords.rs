//! Keywordsの正規化
//!
//! 1. NFKC正規化
//! 2. `,` で分割、前後空白除去、空トークン除去
//! 3. 大文字小文字を無視して重複除去（先勝ち）
//! 4. 通常タグ → shib-タグ → shib-1234 の順に自然順で並べる
//! 5. `", "` で結合
//!
//! 出力を再度正規化しても同じ結果になる（冪等）。

use super::natural::natural_sort;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// 表示・書き込み時の区切り文字
pub const CANONICAL_DELIMITER: &str = ", ";

/// 予約プレフィックス
pub const RESERVED_PREFIX: &str = "shib-";

/// 常に末尾に置く予約タグ
pub const SENTINEL_TAG: &str = "shib-1234";

/// 予約プレフィックス付きタグか（大文字小文字無視）
pub fn is_reserved(token: &str) -> bool {
    token.to_lowercase().starts_with(RESERVED_PREFIX)
}

pub fn is_sentinel(token: &str) -> bool {
    token.to_lowercase() == SENTINEL_TAG
}

/// `,` で分割して空でないトークンを返す
pub fn split_keywords(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// 大文字小文字を無視して重複除去（最初の表記を残す）
pub(crate) fn dedup_case_insensitive<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Keywordsを正規化する
///
/// # Examples
/// ```
/// use pdf_meta_common::canonicalize_keywords;
///
/// let out = canonicalize_keywords("b, shib-2, shib-1234, a");
/// assert_eq!(out, "a, b, shib-2, shib-1234");
/// ```
pub fn canonicalize(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    let unique = dedup_case_insensitive(split_keywords(&normalized));

    let mut sentinel: Option<String> = None;
    let mut reserved = Vec::new();
    let mut plain = Vec::new();

    for token in unique {
        if is_sentinel(&token) {
            sentinel = Some(token);
        } else if is_reserved(&token) {
            reserved.push(token);
        } else {
            plain.push(token);
        }
    }

    natural_sort(&mut plain);
    natural_sort(&mut reserved);

    plain
        .into_iter()
        .chain(reserved)
        .chain(sentinel)
        .collect::<Vec<_>>()
        .join(CANONICAL_DELIMITER)
}

/// 既存値と入力値を合わせて正規化する（Keywords/Add）
pub fn merge(existing: &str, input: &str) -> String {
    if existing.trim().is_empty() {
        canonicalize(input)
    } else {
        canonicalize(&format!("{}{}{}", existing, CANONICAL_DELIMITER, input))
    }
}
