//! 選択モデル
//!
//! - FileRecord の所有（スキャンごとに丸ごと置き換え、書き込み成功時に更新）
//! - チェック済み集合（バッチ対象）とクリック中のファイル（プレビュー）
//! - パネルの入力欄（FieldEdit）と dirty 判定
//!
//! チェック・クリック・健全性が変わるたびに、その場でパネル値を再計算する。

use crate::rules::display_value;
use crate::types::{Field, FileHealth, FileRecord, PanelValue};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// パネルの入力欄1つ分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field: Field,
    /// 読み込み時の表示値
    pub baseline: PanelValue,
    /// 入力中のテキスト
    pub text: String,
    dirty: bool,
}

impl FieldEdit {
    pub fn new(field: Field, baseline: PanelValue) -> Self {
        let text = baseline.editable_text().to_string();
        Self {
            field,
            baseline,
            text,
            dirty: false,
        }
    }

    /// 入力を反映して dirty を更新する
    ///
    /// 値がばらばら（Mixed）の場合は空でない入力なら dirty。
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.dirty = match &self.baseline {
            PanelValue::Mixed => !self.text.trim().is_empty(),
            PanelValue::Uniform(value) => self.text != *value,
        };
    }

    /// 表示値に戻す
    pub fn reset(&mut self) {
        self.text = self.baseline.editable_text().to_string();
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// ファイル一覧と選択状態
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    records: Vec<FileRecord>,
    index: HashMap<PathBuf, usize>,
    checked: HashSet<PathBuf>,
    clicked: Option<PathBuf>,
    edits: BTreeMap<Field, FieldEdit>,
}

impl SelectionModel {
    pub fn new() -> Self {
        let mut model = Self::default();
        model.recompute_panel();
        model
    }

    pub fn with_records(records: Vec<FileRecord>) -> Self {
        let mut model = Self::new();
        model.replace_records(records);
        model
    }

    /// 再スキャン結果で置き換える
    ///
    /// 消えたファイルや対象外になったファイルはチェック・クリックから外す。
    pub fn replace_records(&mut self, records: Vec<FileRecord>) {
        self.index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.path.clone(), i))
            .collect();
        self.records = records;

        let records = &self.records;
        let index = &self.index;
        self.checked
            .retain(|p| index.get(p).map(|&i| records[i].is_eligible()).unwrap_or(false));
        if let Some(clicked) = &self.clicked {
            if !index.contains_key(clicked) {
                self.clicked = None;
            }
        }
        self.recompute_panel();
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn record(&self, path: &Path) -> Option<&FileRecord> {
        self.index.get(path).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// チェックする。未知のファイルや対象外のファイルは `false`
    pub fn check(&mut self, path: &Path) -> bool {
        let eligible = self.record(path).map(|r| r.is_eligible()).unwrap_or(false);
        if eligible && self.checked.insert(path.to_path_buf()) {
            self.recompute_panel();
        }
        eligible
    }

    pub fn uncheck(&mut self, path: &Path) {
        if self.checked.remove(path) {
            self.recompute_panel();
        }
    }

    /// 対象になれるファイルをすべてチェック
    pub fn check_all(&mut self) -> usize {
        self.checked = self
            .records
            .iter()
            .filter(|r| r.is_eligible())
            .map(|r| r.path.clone())
            .collect();
        self.recompute_panel();
        self.checked.len()
    }

    pub fn clear_checked(&mut self) {
        self.checked.clear();
        self.recompute_panel();
    }

    /// チェックを反転（対象外ファイルはチェックしない）
    pub fn invert_checked(&mut self) {
        self.checked = self
            .records
            .iter()
            .filter(|r| r.is_eligible() && !self.checked.contains(&r.path))
            .map(|r| r.path.clone())
            .collect();
        self.recompute_panel();
    }

    pub fn is_checked(&self, path: &Path) -> bool {
        self.checked.contains(path)
    }

    /// チェック済みファイル（一覧順）
    pub fn checked_records(&self) -> Vec<&FileRecord> {
        self.records
            .iter()
            .filter(|r| self.checked.contains(&r.path))
            .collect()
    }

    /// クリック中のファイルを変更する（`None` で解除）
    pub fn click(&mut self, path: Option<&Path>) {
        let next = path
            .filter(|p| self.index.contains_key(*p))
            .map(Path::to_path_buf);
        if next != self.clicked {
            self.clicked = next;
            self.recompute_panel();
        }
    }

    pub fn clicked(&self) -> Option<&FileRecord> {
        self.clicked.as_deref().and_then(|p| self.record(p))
    }

    /// 現在の対象集合
    ///
    /// チェック済みがあればそれ、なければクリック中の1件、どちらもなければ空。
    pub fn target_set(&self) -> Vec<&FileRecord> {
        let checked = self.checked_records();
        if !checked.is_empty() {
            return checked;
        }
        self.clicked().into_iter().collect()
    }

    /// 入力欄の変更
    pub fn set_input(&mut self, field: Field, text: impl Into<String>) {
        if let Some(edit) = self.edits.get_mut(&field) {
            edit.set_text(text);
        }
    }

    /// 入力欄を表示値に戻す
    pub fn reset_input(&mut self, field: Field) {
        if let Some(edit) = self.edits.get_mut(&field) {
            edit.reset();
        }
    }

    pub fn edit(&self, field: Field) -> Option<&FieldEdit> {
        self.edits.get(&field)
    }

    pub fn is_dirty(&self, field: Field) -> bool {
        self.edits.get(&field).map(FieldEdit::is_dirty).unwrap_or(false)
    }

    pub fn input_text(&self, field: Field) -> &str {
        self.edits.get(&field).map(|e| e.text.as_str()).unwrap_or("")
    }

    /// パネル表示値（フィールド → 値またはMixed）
    pub fn panel_values(&self) -> BTreeMap<Field, PanelValue> {
        self.edits
            .iter()
            .map(|(field, edit)| (*field, edit.baseline.clone()))
            .collect()
    }

    /// 書き込み成功した値を反映する（パスで特定する）
    pub fn apply_written(&mut self, path: &Path, field: Field, value: &str) -> bool {
        match self.index.get(path) {
            Some(&i) => {
                self.records[i].values.set(field, value);
                true
            }
            None => false,
        }
    }

    /// 健全性を更新する。対象外になったらチェックから外す
    pub fn set_health(&mut self, path: &Path, health: FileHealth, message: impl Into<String>) {
        if let Some(&i) = self.index.get(path) {
            let record = &mut self.records[i];
            record.health = health;
            record.error_message = message.into();
            if !health.is_ok() {
                self.checked.remove(path);
            }
            self.recompute_panel();
        }
    }

    /// 値の変更後にパネルを再計算する（入力欄は表示値に戻る）
    pub fn refresh_panel(&mut self) {
        self.recompute_panel();
    }

    fn recompute_panel(&mut self) {
        let targets = self.target_set();
        let edits: BTreeMap<Field, FieldEdit> = Field::ALL
            .iter()
            .map(|&field| {
                let baseline = display_value(targets.iter().map(|r| r.value(field)));
                (field, FieldEdit::new(field, baseline))
            })
            .collect();
        self.edits = edits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, title: &str) -> FileRecord {
        let mut r = FileRecord::new(format!("/docs/{}", name));
        r.values.title = title.to_string();
        r
    }

    fn protected(name: &str) -> FileRecord {
        let mut r = record(name, "");
        r.health = FileHealth::Protected;
        r
    }

    #[test]
    fn test_target_set_prefers_checked() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), record("b.pdf", "B")]);
        assert!(model.target_set().is_empty());

        model.click(Some(Path::new("/docs/b.pdf")));
        let targets: Vec<_> = model.target_set().iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(targets, vec!["b.pdf"]);

        model.check(Path::new("/docs/a.pdf"));
        let targets: Vec<_> = model.target_set().iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(targets, vec!["a.pdf"]);
    }

    #[test]
    fn test_mixed_display_for_differing_values() {
        let mut model = SelectionModel::with_records(vec![
            record("a.pdf", "A"),
            record("b.pdf", "B"),
            record("c.pdf", "A"),
        ]);
        model.check(Path::new("/docs/a.pdf"));
        model.check(Path::new("/docs/b.pdf"));
        assert_eq!(model.panel_values()[&Field::Title], PanelValue::Mixed);

        model.uncheck(Path::new("/docs/b.pdf"));
        model.check(Path::new("/docs/c.pdf"));
        assert_eq!(model.panel_values()[&Field::Title], PanelValue::Uniform("A".into()));
    }

    #[test]
    fn test_protected_file_cannot_be_checked() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), protected("p.pdf")]);
        assert!(!model.check(Path::new("/docs/p.pdf")));
        assert_eq!(model.check_all(), 1);
        assert!(!model.is_checked(Path::new("/docs/p.pdf")));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "Same")]);
        model.check(Path::new("/docs/a.pdf"));
        assert!(!model.is_dirty(Field::Title));

        model.set_input(Field::Title, "Same");
        assert!(!model.is_dirty(Field::Title));
        model.set_input(Field::Title, "Other");
        assert!(model.is_dirty(Field::Title));

        model.reset_input(Field::Title);
        assert!(!model.is_dirty(Field::Title));
        assert_eq!(model.input_text(Field::Title), "Same");
    }

    #[test]
    fn test_mixed_placeholder_any_nonempty_is_dirty() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), record("b.pdf", "B")]);
        model.check_all();
        model.set_input(Field::Title, "   ");
        assert!(!model.is_dirty(Field::Title));
        model.set_input(Field::Title, "A");
        assert!(model.is_dirty(Field::Title));
    }

    #[test]
    fn test_selection_change_resets_edits() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), record("b.pdf", "B")]);
        model.check(Path::new("/docs/a.pdf"));
        model.set_input(Field::Title, "typed");
        model.check(Path::new("/docs/b.pdf"));
        assert!(!model.is_dirty(Field::Title));
        assert_eq!(model.input_text(Field::Title), "");
    }

    #[test]
    fn test_rescan_drops_ineligible_checks() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), record("b.pdf", "B")]);
        model.check_all();
        model.click(Some(Path::new("/docs/b.pdf")));

        model.replace_records(vec![protected("a.pdf")]);
        assert!(model.checked_records().is_empty());
        assert!(model.clicked().is_none());
    }

    #[test]
    fn test_apply_written_by_path() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A"), record("b.pdf", "B")]);
        assert!(model.apply_written(Path::new("/docs/b.pdf"), Field::Title, "New"));
        assert_eq!(model.record(Path::new("/docs/b.pdf")).unwrap().values.title, "New");
        assert_eq!(model.record(Path::new("/docs/a.pdf")).unwrap().values.title, "A");
        assert!(!model.apply_written(Path::new("/docs/zzz.pdf"), Field::Title, "x"));
    }

    #[test]
    fn test_set_health_unchecks() {
        let mut model = SelectionModel::with_records(vec![record("a.pdf", "A")]);
        model.check_all();
        model.set_health(Path::new("/docs/a.pdf"), FileHealth::Protected, "Password protected");
        assert!(model.checked_records().is_empty());
        assert!(!model.check(Path::new("/docs/a.pdf")));
    }

    #[test]
    fn test_invert_checked() {
        let mut model = SelectionModel::with_records(vec![
            record("a.pdf", ""),
            record("b.pdf", ""),
            protected("p.pdf"),
        ]);
        model.check(Path::new("/docs/a.pdf"));
        model.invert_checked();
        let names: Vec<_> = model.checked_records().iter().map(|r| r.file_name.clone()).collect();
        assert_eq!(names, vec!["b.pdf"]);
    }
}
