//! ExifTool出力パーサー
//!
//! `exiftool -json -G1` の出力から4フィールドの値を取り出す。
//! 同じ意味のタグが複数のグループにある場合の優先順位はここで決める。

use crate::error::{Error, Result};
use crate::rules::keywords::CANONICAL_DELIMITER;
use crate::types::FieldValues;
use serde_json::{Map, Value};

/// 読み込み時に要求するタグ（グループ付き）
pub const EXIFTOOL_READ_TAGS: &[&str] = &[
    "PDF:Title",
    "XMP-dc:Title",
    "PDF:Author",
    "XMP-pdf:Author",
    "PDF:Subject",
    "XMP-dc:Subject",
    "PDF:Keywords",
    "XMP-pdf:Keywords",
];

/// タグ値を文字列にする（配列は `, ` で連結）
fn as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(CANONICAL_DELIMITER),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// 候補タグを順に見て、最初の空でない値を返す
fn pick(object: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| as_text(object.get(*key)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Subject の決定
///
/// 文書ネイティブのタグ（PDF:Subject）を優先し、なければ XMP-dc:Subject。
/// 両方あって食い違う場合はログに残す。
pub fn resolve_subject(native: &str, generic: &str) -> String {
    if !native.is_empty() && !generic.is_empty() && native != generic {
        tracing::info!(
            "Subjectが不一致: PDF={:?}, XMP-dc={:?}（PDF:Subjectを使用）",
            native,
            generic
        );
    }
    if native.is_empty() {
        generic.to_string()
    } else {
        native.to_string()
    }
}

/// `exiftool -json -G1` の標準出力をパースする
///
/// 出力は1ファイル分の配列を想定する。空配列はすべて空値。
///
/// # Examples
/// ```
/// use pdf_meta_common::parse_exiftool_json;
///
/// let json = r#"[{"PDF:Subject": "Foo", "XMP-dc:Subject": "Bar"}]"#;
/// let values = parse_exiftool_json(json).unwrap();
/// assert_eq!(values.subject, "Foo");
/// ```
pub fn parse_exiftool_json(stdout: &str) -> Result<FieldValues> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(FieldValues::default());
    }

    let parsed: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::Parse(format!("ExifTool JSONパースエラー: {}", e)))?;

    let object = match &parsed {
        Value::Array(items) => match items.first() {
            Some(Value::Object(obj)) => obj,
            Some(_) => return Err(Error::Parse("ExifTool出力の形式が不正です".into())),
            None => return Ok(FieldValues::default()),
        },
        Value::Object(obj) => obj,
        _ => return Err(Error::Parse("ExifTool出力の形式が不正です".into())),
    };

    let native_subject = pick(object, &["PDF:Subject"]);
    let generic_subject = pick(object, &["XMP-dc:Subject"]);
    let mut subject = resolve_subject(&native_subject, &generic_subject);
    if subject.is_empty() {
        subject = pick(object, &["Subject"]);
    }

    Ok(FieldValues {
        title: pick(object, &["PDF:Title", "XMP-dc:Title", "Title"]),
        author: pick(object, &["PDF:Author", "XMP-pdf:Author", "Author"]),
        subject,
        keywords: pick(object, &["PDF:Keywords", "XMP-pdf:Keywords", "Keywords"]),
    })
}

/// `exiftool -s3 -Encrypted` の出力が暗号化を示すか
pub fn is_encrypted_probe(stdout: &str) -> bool {
    stdout.trim().eq_ignore_ascii_case("yes")
}
