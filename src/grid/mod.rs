//! 表格状态模块
//!
//! 表格侧的行缓存与协调状态机，对应 UI 中的数据表格。
//! 所有状态集中在 [`GridState`] 中，由调用方显式持有，可以脱离真实 UI 单独测试。
//!
//! # 操作
//!
//! - **replace**: 用文档推送的内容重建整个缓存
//! - **add**: 追加新行（键重复时拒绝）
//! - **delete**: 删除当前选中的行
//! - **edit**: 修改单元格（值未变化时不回写）
//!
//! 每个会修改缓存的操作都返回一条回写消息 [`InboundMessage::Update`]，
//! 由适配层发送给文档侧，表格不等待确认。
//!
//! ```rust,ignore
//! let mut grid = GridState::new(true);
//! grid.replace(&text)?;
//! if let Some(sync) = grid.edit(0, Column::Value, "Hello")? {
//!     transport.post(sync);
//! }
//! ```

pub mod sort;

use std::str::FromStr;

use crate::protocol::{InboundMessage, OutboundMessage};
use crate::resource::{ResourceSet, RowRecord};
use crate::utils::{validate_key, ResxError};

pub use sort::{SortDirection, SortOverlay, SortState};

/// 表格列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Key,
    Value,
    Comment,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Key, Column::Value, Column::Comment];

    /// 读取行中该列的值
    pub fn get(self, row: &RowRecord) -> &str {
        match self {
            Column::Key => &row.key,
            Column::Value => &row.value,
            Column::Comment => &row.comment,
        }
    }

    fn get_mut(self, row: &mut RowRecord) -> &mut String {
        match self {
            Column::Key => &mut row.key,
            Column::Value => &mut row.value,
            Column::Comment => &mut row.comment,
        }
    }

    /// 表头标题
    pub fn title(self) -> &'static str {
        match self {
            Column::Key => "Key",
            Column::Value => "Value",
            Column::Comment => "Comment",
        }
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "key" => Ok(Column::Key),
            "value" => Ok(Column::Value),
            "comment" => Ok(Column::Comment),
            other => Err(format!("unknown column '{}', expected key, value or comment", other)),
        }
    }
}

/// `replace` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// 缓存已按新内容重建
    Rebuilt,
    /// 内容与最近一次同步的内容一致，缓存保持不变
    Unchanged,
}

/// 表格状态机
#[derive(Debug, Clone, Default)]
pub struct GridState {
    /// 行缓存（插入顺序）
    rows: Vec<RowRecord>,
    /// 选中行在缓存中的下标
    selected: Option<usize>,
    /// 显示排序
    sort: SortOverlay,
    /// 最近一次渲染或回写的传输 JSON
    last_synced: Option<String>,
}

impl GridState {
    /// 创建空表格
    pub fn new(enable_sorting: bool) -> Self {
        Self {
            sort: SortOverlay::new(enable_sorting),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn sort(&self) -> &SortOverlay {
        &self.sort
    }

    /// 处理文档侧发来的消息
    ///
    /// # 返回
    /// 需要回写时返回回写消息
    pub fn handle(&mut self, message: OutboundMessage) -> Result<Option<InboundMessage>, ResxError> {
        match message {
            OutboundMessage::Update { text } => {
                self.replace(&text)?;
                Ok(None)
            }
            OutboundMessage::Add { key, value, comment } => self.add(key, value, comment).map(Some),
            OutboundMessage::Delete => self.delete().map(Some),
            OutboundMessage::Config { enable_column_sorting } => {
                self.sort.set_enabled(enable_column_sorting);
                Ok(None)
            }
        }
    }

    /// 用文档推送的传输 JSON 重建行缓存
    ///
    /// 与最近一次同步的内容相同时视为回声，保留当前缓存、选中与排序。
    /// 否则丢弃所有未同步的本地状态。
    pub fn replace(&mut self, text: &str) -> Result<ReplaceOutcome, ResxError> {
        if self.last_synced.as_deref() == Some(text) {
            tracing::debug!("grid update matches last synchronized state, skipping rebuild");
            return Ok(ReplaceOutcome::Unchanged);
        }

        let set = ResourceSet::from_transport_json(text)?;
        self.rows = set.to_rows();
        self.selected = None;
        self.last_synced = Some(text.to_string());

        tracing::debug!(rows = self.rows.len(), "grid rebuilt from document");
        Ok(ReplaceOutcome::Rebuilt)
    }

    /// 选中行（缓存下标），`None` 取消选中
    pub fn select(&mut self, row: Option<usize>) -> Result<(), ResxError> {
        if let Some(index) = row {
            if index >= self.rows.len() {
                return Err(ResxError::RowOutOfRange(index));
            }
        }
        self.selected = row;
        Ok(())
    }

    /// 按显示位置选中行（考虑排序）
    pub fn select_displayed(&mut self, position: usize) -> Result<(), ResxError> {
        let row = self
            .display_order()
            .get(position)
            .copied()
            .ok_or(ResxError::RowOutOfRange(position))?;
        self.select(Some(row))
    }

    /// 追加新行
    ///
    /// # 返回
    /// 键已存在时返回 `DuplicateKey` 且不修改缓存
    pub fn add(&mut self, key: String, value: String, comment: String) -> Result<InboundMessage, ResxError> {
        validate_key(&key)?;

        if self.rows.iter().any(|row| row.key == key) {
            return Err(ResxError::DuplicateKey(key));
        }

        self.rows.push(RowRecord::new(key, value, comment));
        self.synchronize()
    }

    /// 删除当前选中的行
    ///
    /// # 返回
    /// 没有选中行时返回 `NothingSelected` 且不修改缓存
    pub fn delete(&mut self) -> Result<InboundMessage, ResxError> {
        let index = self.selected.ok_or(ResxError::NothingSelected)?;

        if index >= self.rows.len() {
            self.selected = None;
            return Err(ResxError::RowOutOfRange(index));
        }

        self.rows.remove(index);
        self.selected = None;
        self.synchronize()
    }

    /// 修改单元格
    ///
    /// # 返回
    /// - 值未变化：`Ok(None)`，不回写
    /// - 值已修改：`Ok(Some(回写消息))`
    /// - 修改键时，新键为空或与其它行重复会被拒绝
    pub fn edit(&mut self, row: usize, column: Column, new_value: &str) -> Result<Option<InboundMessage>, ResxError> {
        let current = self.rows.get(row).ok_or(ResxError::RowOutOfRange(row))?;

        if column.get(current) == new_value {
            return Ok(None);
        }

        if column == Column::Key {
            validate_key(new_value)?;
            let taken = self
                .rows
                .iter()
                .enumerate()
                .any(|(i, other)| i != row && other.key == new_value);
            if taken {
                return Err(ResxError::DuplicateKey(new_value.to_string()));
            }
        }

        *column.get_mut(&mut self.rows[row]) = new_value.to_string();
        self.synchronize().map(Some)
    }

    /// 表头点击（排序禁用时忽略）
    pub fn click_header(&mut self, column: Column) -> Option<SortState> {
        self.sort.click(column)
    }

    /// 当前显示顺序（缓存下标）
    pub fn display_order(&self) -> Vec<usize> {
        self.sort.order(&self.rows)
    }

    /// 按显示顺序排列的行
    pub fn displayed_rows(&self) -> Vec<&RowRecord> {
        self.display_order().into_iter().map(|i| &self.rows[i]).collect()
    }

    /// 将行缓存投影为资源集合
    pub fn to_resource_set(&self) -> Result<ResourceSet, ResxError> {
        ResourceSet::from_rows(&self.rows)
    }

    /// 生成回写消息，并记录为最近一次同步的内容
    pub fn synchronize(&mut self) -> Result<InboundMessage, ResxError> {
        let json = self.to_resource_set()?.to_transport_json()?;
        self.last_synced = Some(json.clone());
        Ok(InboundMessage::Update { json })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceEntry;

    const GREETING: &str = r#"{"Greeting":{"value":"Hi"}}"#;

    fn greeting_grid() -> GridState {
        let mut grid = GridState::new(true);
        grid.replace(GREETING).unwrap();
        grid
    }

    fn sync_json(message: InboundMessage) -> String {
        match message {
            InboundMessage::Update { json } => json,
        }
    }

    #[test]
    fn test_replace_builds_rows() {
        let grid = greeting_grid();
        assert_eq!(grid.rows(), &[RowRecord::new("Greeting", "Hi", "")]);
        assert_eq!(grid.selected(), None);
    }

    #[test]
    fn test_replace_same_text_is_idempotent() {
        let mut grid = greeting_grid();
        grid.select(Some(0)).unwrap();

        assert_eq!(grid.replace(GREETING).unwrap(), ReplaceOutcome::Unchanged);
        assert_eq!(grid.selected(), Some(0));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_replace_discards_local_state() {
        let mut grid = greeting_grid();
        grid.select(Some(0)).unwrap();

        let outcome = grid.replace(r#"{"Other":{"value":"x","comment":"c"}}"#).unwrap();
        assert_eq!(outcome, ReplaceOutcome::Rebuilt);
        assert_eq!(grid.rows(), &[RowRecord::new("Other", "x", "c")]);
        assert_eq!(grid.selected(), None);
    }

    #[test]
    fn test_replace_invalid_json_keeps_rows() {
        let mut grid = greeting_grid();
        assert!(grid.replace("not json").is_err());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut grid = greeting_grid();
        let before = grid.rows().to_vec();

        let result = grid.add("Greeting".into(), "Hi".into(), String::new());
        assert!(matches!(result, Err(ResxError::DuplicateKey(_))));
        assert_eq!(grid.rows(), before.as_slice());
    }

    #[test]
    fn test_add_synchronizes_all_rows() {
        let mut grid = greeting_grid();

        let message = grid.add("Farewell".into(), "Bye".into(), "parting words".into()).unwrap();
        let set = ResourceSet::from_transport_json(&sync_json(message)).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("Greeting").unwrap(), &ResourceEntry::new("Greeting", "Hi", ""));
        assert_eq!(
            set.get("Farewell").unwrap(),
            &ResourceEntry::new("Farewell", "Bye", "parting words")
        );
    }

    #[test]
    fn test_delete_without_selection() {
        let mut grid = greeting_grid();

        assert!(matches!(grid.delete(), Err(ResxError::NothingSelected)));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_delete_selected_row() {
        let mut grid = greeting_grid();
        grid.add("Farewell".into(), "Bye".into(), String::new()).unwrap();
        grid.select(Some(0)).unwrap();

        let json = sync_json(grid.delete().unwrap());
        assert_eq!(json, r#"{"Farewell":{"value":"Bye"}}"#);
        assert_eq!(grid.selected(), None);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut grid = greeting_grid();
        assert!(matches!(grid.select(Some(5)), Err(ResxError::RowOutOfRange(5))));
        assert_eq!(grid.selected(), None);
    }

    #[test]
    fn test_noop_edit_does_not_synchronize() {
        let mut grid = greeting_grid();

        assert_eq!(grid.edit(0, Column::Value, "Hi").unwrap(), None);
        assert_eq!(grid.edit(0, Column::Comment, "").unwrap(), None);
    }

    #[test]
    fn test_edit_updates_in_place() {
        let mut grid = greeting_grid();

        let json = sync_json(grid.edit(0, Column::Comment, "salutation").unwrap().unwrap());
        assert_eq!(json, r#"{"Greeting":{"value":"Hi","comment":"salutation"}}"#);
        assert_eq!(grid.rows()[0].comment, "salutation");

        // 回写后的回声不会重建缓存
        assert_eq!(grid.replace(&json).unwrap(), ReplaceOutcome::Unchanged);
    }

    #[test]
    fn test_edit_key_rejects_duplicate_and_empty() {
        let mut grid = greeting_grid();
        grid.add("Farewell".into(), "Bye".into(), String::new()).unwrap();

        assert!(matches!(grid.edit(1, Column::Key, "Greeting"), Err(ResxError::DuplicateKey(_))));
        assert!(matches!(grid.edit(1, Column::Key, ""), Err(ResxError::InvalidKey(_))));
        assert_eq!(grid.rows()[1].key, "Farewell");

        assert!(grid.edit(1, Column::Key, "Goodbye").unwrap().is_some());
        assert_eq!(grid.rows()[1].key, "Goodbye");
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut grid = greeting_grid();
        assert!(matches!(grid.edit(3, Column::Value, "x"), Err(ResxError::RowOutOfRange(3))));
    }

    #[test]
    fn test_sort_does_not_change_projection() {
        let mut grid = GridState::new(true);
        grid.replace(r#"{"B":{"value":"z"},"A":{"value":"a"}}"#).unwrap();
        let before = grid.to_resource_set().unwrap();

        grid.click_header(Column::Value);
        let ascending: Vec<_> = grid.displayed_rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(ascending, vec!["A", "B"]);
        assert_eq!(grid.to_resource_set().unwrap(), before);

        grid.click_header(Column::Value);
        let descending: Vec<_> = grid.displayed_rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(descending, vec!["B", "A"]);
        assert_eq!(grid.to_resource_set().unwrap(), before);
    }

    #[test]
    fn test_select_displayed_maps_through_sort() {
        let mut grid = GridState::new(true);
        grid.replace(r#"{"B":{"value":"z"},"A":{"value":"a"}}"#).unwrap();
        grid.click_header(Column::Key);

        grid.select_displayed(0).unwrap();
        assert_eq!(grid.selected(), Some(1));

        let json = sync_json(grid.delete().unwrap());
        assert_eq!(json, r#"{"B":{"value":"z"}}"#);
    }

    #[test]
    fn test_config_message_disables_sorting() {
        let mut grid = GridState::new(true);
        grid.replace(r#"{"B":{"value":"z"},"A":{"value":"a"}}"#).unwrap();
        grid.click_header(Column::Key);

        let reply = grid.handle(OutboundMessage::Config { enable_column_sorting: false }).unwrap();
        assert!(reply.is_none());
        assert!(!grid.sort().is_enabled());
        assert_eq!(grid.display_order(), vec![0, 1]);
        assert_eq!(grid.click_header(Column::Key), None);
    }

    #[test]
    fn test_handle_dispatch() {
        let mut grid = GridState::new(true);

        let reply = grid.handle(OutboundMessage::Update { text: GREETING.to_string() }).unwrap();
        assert!(reply.is_none());

        let reply = grid
            .handle(OutboundMessage::Add { key: "New".into(), value: "v".into(), comment: String::new() })
            .unwrap();
        assert!(reply.is_some());

        assert!(matches!(grid.handle(OutboundMessage::Delete), Err(ResxError::NothingSelected)));
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!("Value".parse::<Column>().unwrap(), Column::Value);
        assert_eq!("key".parse::<Column>().unwrap(), Column::Key);
        assert!("size".parse::<Column>().is_err());
    }
}
