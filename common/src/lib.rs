//! PDF Meta Common Library
//!
//! CLIと対話シェルで共有される型と純粋ロジック（I/Oなし）

pub mod confirm;
pub mod error;
pub mod parser;
pub mod rules;
pub mod selection;
pub mod types;

pub use confirm::{ConfirmationKey, ConfirmationPolicy, Decision, SuppressionFlags};
pub use error::{Error, Result};
pub use parser::{is_encrypted_probe, parse_exiftool_json, resolve_subject, EXIFTOOL_READ_TAGS};
pub use rules::filename::{folder_tag, validate_filename};
pub use rules::keywords::canonicalize as canonicalize_keywords;
pub use rules::keywords::{CANONICAL_DELIMITER, RESERVED_PREFIX, SENTINEL_TAG};
pub use rules::natural::{natural_cmp, natural_sort};
pub use rules::{display_value, rule_for, Rule};
pub use selection::{FieldEdit, SelectionModel};
pub use types::{
    Action, BatchSummary, Field, FieldValues, FileHealth, FileRecord, JobFailure, JobOutcome,
    JobResult, PanelValue, UndoChange, UndoEntry,
};
