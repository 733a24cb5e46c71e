//! 自然順ソート
//!
//! ASCII数字の連続は数値として、それ以外は小文字化して比較する。
//! "shib-9" < "shib-10" となる。

use std::cmp::Ordering;

/// ソートキーの1要素
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk<'a> {
    /// 先頭ゼロを除いた数字列
    Number(&'a str),
    Text(String),
}

impl Ord for Chunk<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // 桁数→辞書順で数値比較（桁あふれしない）
            (Chunk::Number(a), Chunk::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Chunk<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn natural_key(text: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(current) if current != is_digit => {
                chunks.push(make_chunk(&text[start..idx], current));
                start = idx;
                in_digits = Some(is_digit);
            }
            None => in_digits = Some(is_digit),
            _ => {}
        }
    }

    if let Some(current) = in_digits {
        chunks.push(make_chunk(&text[start..], current));
    }

    chunks
}

fn make_chunk(run: &str, is_digit: bool) -> Chunk<'_> {
    if is_digit {
        Chunk::Number(run.trim_start_matches('0'))
    } else {
        Chunk::Text(run.to_lowercase())
    }
}

/// 自然順で比較する
///
/// キーが等しい場合（"a01" と "a1" など）は元の文字列で比較し、
/// 入力順に依存しない全順序にする。
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a)
        .cmp(&natural_key(b))
        .then_with(|| a.cmp(b))
}

/// 自然順でソート
pub fn natural_sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
