//! Author/Subject のトークンマージ
//!
//! `,` `;` `|` で分割し、既存の順序を保ったまま新しいトークンを末尾に追加する。

use super::keywords::{dedup_case_insensitive, CANONICAL_DELIMITER};

fn is_token_delimiter(c: char) -> bool {
    matches!(c, ',' | ';' | '|')
}

/// 区切り文字で分割して空でないトークンを返す
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split(is_token_delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// 既存値に入力値のトークンをマージする
pub fn merge(existing: &str, input: &str) -> String {
    let combined = split_tokens(existing)
        .into_iter()
        .chain(split_tokens(input));
    dedup_case_insensitive(combined).join(CANONICAL_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_appends_new_tokens() {
        assert_eq!(merge("Alice; Bob", "Carol | Dave"), "Alice, Bob, Carol, Dave");
    }

    #[test]
    fn test_merge_case_insensitive_first_wins() {
        assert_eq!(merge("Alice", "alice, Bob"), "Alice, Bob");
        assert_eq!(merge("", "X, x, Y"), "X, Y");
    }

    #[test]
    fn test_merge_preserves_existing_order() {
        // 既存トークンは並べ替えない
        assert_eq!(merge("zeta, alpha", "beta"), "zeta, alpha, beta");
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        assert_eq!(split_tokens(" a ;; | b ,"), vec!["a", "b"]);
        assert!(split_tokens("  ").is_empty());
    }
}
