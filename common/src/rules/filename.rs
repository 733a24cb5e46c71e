//! ファイル名規約チェックと shib タグ生成
//!
//! 規約: `YYYY-MMDD {…}[…] 本文.pdf`
//! - 年は1950以上かつ未来でない
//! - 月は00または01〜12、日は00または月内の有効日（月00なら日も00）
//! - 日付の直後（空白1文字の後）に `{…}` か `[…]` が1つ以上、その後に空白
//!
//! 警告は表示用で、書き込みは妨げない。

use chrono::{Datelike, Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::keywords::RESERVED_PREFIX;

lazy_static! {
    static ref DATE_PREFIX: Regex = Regex::new(r"^(\d{4})-(\d{2})(\d{2})").unwrap();
    static ref BRACKET_BLOCKS: Regex = Regex::new(r"^([\{\[].*?[\}\]])+\s+").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref DISALLOWED_TAG_CHARS: Regex = Regex::new(r"[^A-Za-z0-9.\-]+").unwrap();
    static ref HYPHEN_RUN: Regex = Regex::new(r"-{2,}").unwrap();
}

const MIN_YEAR: i32 = 1950;

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// 日付部分を検証する（`today` 基準）
///
/// 有効なら `None`、問題があれば警告メッセージを返す。
pub fn validate_date(year: i32, month: u32, day: u32, today: NaiveDate) -> Option<String> {
    let invalid = || Some(format!("日付 '{:04}-{:02}{:02}' は不正です", year, month, day));

    if year < MIN_YEAR {
        return Some("年が古すぎます（要確認）".to_string());
    }
    if year > today.year() {
        return Some("日付が未来です（要確認）".to_string());
    }

    // YYYY-0000: 日付不明
    if month == 0 {
        return if day == 0 { None } else { invalid() };
    }
    if !(1..=12).contains(&month) {
        return invalid();
    }
    // YYYY-MM00: 日不明
    if day == 0 {
        return None;
    }
    if day > days_in_month(year, month) {
        return invalid();
    }

    if year == today.year() {
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) if date > today => return Some("日付が未来です（要確認）".to_string()),
            Some(_) => {}
            None => return invalid(),
        }
    }

    None
}

/// ファイル名を規約に照らして検証する（`today` 基準）
pub fn validate_filename_at(file_name: &str, today: NaiveDate) -> Option<String> {
    let name_part = if file_name.to_lowercase().ends_with(".pdf") {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };

    let caps = match DATE_PREFIX.captures(name_part) {
        Some(c) => c,
        None => return Some("YYYY-MMDD形式の日付がありません".to_string()),
    };

    // \d{4}/\d{2} にマッチ済みなのでパースは失敗しない
    let year: i32 = caps[1].parse().unwrap_or_default();
    let month: u32 = caps[2].parse().unwrap_or_default();
    let day: u32 = caps[3].parse().unwrap_or_default();

    if let Some(warning) = validate_date(year, month, day, today) {
        return Some(warning);
    }

    let after_date = name_part.get(10..).unwrap_or("");
    if !BRACKET_BLOCKS.is_match(after_date) {
        return Some("日付の後に {…} または […] がありません".to_string());
    }

    None
}

/// ファイル名を今日の日付基準で検証する
pub fn validate_filename(file_name: &str) -> Option<String> {
    validate_filename_at(file_name, Local::now().date_naive())
}

/// フォルダ名から `shib-<folder>` タグを作る
///
/// 英数字・`.`・`-` のみ残し、空白は `-` に置き換える。
/// 有効な文字が残らなければ `None`。
pub fn folder_tag(folder_name: &str) -> Option<String> {
    let normalized: String = folder_name.nfkc().collect();
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }

    let hyphenated = WHITESPACE_RUN.replace_all(trimmed, "-");
    let kept = DISALLOWED_TAG_CHARS.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN.replace_all(&kept, "-");
    let body = collapsed.trim_matches(|c| c == '-' || c == '.');

    if body.is_empty() {
        None
    } else {
        Some(format!("{}{}", RESERVED_PREFIX, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_accepts_expected_shape() {
        assert_eq!(
            validate_filename_at("2024-0315 {AGM}[HSP] Meeting notes.pdf", today()),
            None
        );
        assert_eq!(
            validate_filename_at("2023-0000 {Unknown} Valid unknown date.pdf", today()),
            None
        );
        assert_eq!(validate_filename_at("2024-0300 [Draft] March.PDF", today()), None);
    }

    #[test]
    fn test_rejects_bad_date_or_shape() {
        assert_eq!(
            validate_filename_at("badformat.pdf", today()).as_deref(),
            Some("YYYY-MMDD形式の日付がありません")
        );
        assert_eq!(
            validate_filename_at("1949-0101 {Old} Too old.pdf", today()).as_deref(),
            Some("年が古すぎます（要確認）")
        );
        let leap = validate_filename_at("2023-0229 {Test} Invalid leap year.pdf", today());
        assert!(leap.unwrap().contains("不正"));
        assert_eq!(
            validate_filename_at("2024-0315    {AGM} Extra spaces.pdf", today()).as_deref(),
            Some("日付の後に {…} または […] がありません")
        );
    }

    #[test]
    fn test_leap_day_accepted_in_leap_year() {
        assert_eq!(validate_filename_at("2024-0229 {Leap} ok.pdf", today()), None);
    }

    #[test]
    fn test_future_and_partial_dates() {
        assert_eq!(
            validate_date(2026, 1, 1, today()).as_deref(),
            Some("日付が未来です（要確認）")
        );
        assert_eq!(
            validate_date(2025, 7, 1, today()).as_deref(),
            Some("日付が未来です（要確認）")
        );
        assert_eq!(validate_date(2025, 6, 15, today()), None);
        assert_eq!(validate_date(2024, 0, 0, today()), None);
        assert!(validate_date(2024, 0, 1, today()).unwrap().contains("不正"));
        assert!(validate_date(2024, 13, 1, today()).unwrap().contains("不正"));
        assert!(validate_date(2024, 4, 31, today()).unwrap().contains("不正"));
    }

    #[test]
    fn test_multibyte_after_date_does_not_panic() {
        let warning = validate_filename_at("2024-0315日本語.pdf", today());
        assert!(warning.is_some());
    }

    #[test]
    fn test_folder_tag_keeps_dotted_sequences() {
        assert_eq!(folder_tag(" A.4.3.12 ").as_deref(), Some("shib-A.4.3.12"));
        assert_eq!(folder_tag("reports 2024").as_deref(), Some("shib-reports-2024"));
        assert_eq!(folder_tag("a  --  b").as_deref(), Some("shib-a-b"));
        assert_eq!(folder_tag("  "), None);
        assert_eq!(folder_tag("日本語"), None);
    }
}
