//! 確認ダイアログの要否判定
//!
//! (フィールド, 操作) ごとに確認が必要かを返す。
//! 「今後確認しない」を選んだキーはプロセス終了まで確認を省略する。
//! 抑制フラグは呼び出し側が所有し、構築時に渡す。

use crate::error::{Error, Result};
use crate::types::{Action, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 確認設定のキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationKey {
    pub field: Field,
    pub action: Action,
}

impl ConfirmationKey {
    pub fn new(field: Field, action: Action) -> Self {
        Self { field, action }
    }

    /// 設定ファイル用のキー（例: `clear_keywords`）
    pub fn settings_key(&self) -> String {
        format!("{}_{}", self.action.key(), self.field.key())
    }

    /// `clear_keywords` 形式から復元
    pub fn parse_settings_key(key: &str) -> Result<Self> {
        let key = key.trim().to_lowercase();
        let (action_part, field_part) = key
            .rsplit_once('_')
            .ok_or_else(|| Error::Parse(format!("Invalid confirmation key: {}", key)))?;
        Ok(Self {
            field: field_part.parse()?,
            action: action_part.parse()?,
        })
    }
}

impl fmt::Display for ConfirmationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.field)
    }
}

/// 確認ダイアログへのユーザーの回答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Declined,
    /// 承認して、今後このキーでは確認しない
    SuppressFuture,
}

impl Decision {
    pub fn proceeds(&self) -> bool {
        !matches!(self, Decision::Declined)
    }
}

/// 「今後確認しない」フラグの集合
#[derive(Debug, Clone, Default)]
pub struct SuppressionFlags {
    keys: HashSet<ConfirmationKey>,
}

impl SuppressionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定キーの一覧から作る。解釈できないキーは無視する
    pub fn from_settings_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Self::new();
        for key in keys {
            match ConfirmationKey::parse_settings_key(key.as_ref()) {
                Ok(parsed) => {
                    flags.keys.insert(parsed);
                }
                Err(e) => tracing::warn!("確認設定キーを無視: {}", e),
            }
        }
        flags
    }

    pub fn contains(&self, key: &ConfirmationKey) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&mut self, key: ConfirmationKey) {
        self.keys.insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// 確認要否の判定
#[derive(Debug, Clone, Default)]
pub struct ConfirmationPolicy {
    flags: SuppressionFlags,
}

impl ConfirmationPolicy {
    pub fn new(flags: SuppressionFlags) -> Self {
        Self { flags }
    }

    /// 確認が必要か
    ///
    /// - 抑制済みのキーは不要
    /// - Clear / FolderTag / SentinelTag は常に必要
    /// - Update / Add は対象が2件以上のとき必要
    /// - CopyFilenameToTitle は不要
    pub fn requires_confirmation(&self, field: Field, action: Action, target_count: usize) -> bool {
        if self.flags.contains(&ConfirmationKey::new(field, action)) {
            return false;
        }
        match action {
            Action::Clear | Action::FolderTag | Action::SentinelTag => true,
            Action::Update | Action::Add => target_count > 1,
            Action::CopyFilenameToTitle => false,
        }
    }

    /// 回答を反映し、続行するかを返す
    pub fn resolve(&mut self, key: ConfirmationKey, decision: Decision) -> bool {
        if decision == Decision::SuppressFuture {
            tracing::info!("確認を抑制: {}", key);
            self.flags.insert(key);
        }
        decision.proceeds()
    }

    pub fn is_suppressed(&self, key: &ConfirmationKey) -> bool {
        self.flags.contains(key)
    }

    pub fn flags(&self) -> &SuppressionFlags {
        &self.flags
    }
}
