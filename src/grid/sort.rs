//! 排序覆盖层
//!
//! 纯显示层的排序：只决定渲染顺序，永远不修改行缓存，也不会触发回写。

use std::cmp::Ordering;

use crate::resource::RowRecord;

use super::Column;

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// 表头上显示的指示符
    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// 当前生效的排序列与方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub direction: SortDirection,
}

/// 点击表头后的状态转换
///
/// 点击当前排序列时翻转方向，否则切换到该列并使用升序。
pub fn next_state(current: Option<SortState>, clicked: Column) -> SortState {
    match current {
        Some(state) if state.column == clicked => SortState {
            column: clicked,
            direction: state.direction.flipped(),
        },
        _ => SortState {
            column: clicked,
            direction: SortDirection::Ascending,
        },
    }
}

/// 不区分大小写的字典序比较
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// 计算排序后的显示顺序（返回行缓存中的下标）
///
/// 使用稳定排序，相等的行保持插入顺序。
pub fn display_order(rows: &[RowRecord], state: Option<SortState>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();

    if let Some(state) = state {
        order.sort_by(|&a, &b| {
            let ordering = compare_text(state.column.get(&rows[a]), state.column.get(&rows[b]));
            match state.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    order
}

/// 排序覆盖层状态
///
/// 禁用时不提供任何表头交互，且清除当前排序，恢复插入顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOverlay {
    enabled: bool,
    active: Option<SortState>,
}

impl Default for SortOverlay {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SortOverlay {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            active: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active(&self) -> Option<SortState> {
        self.active
    }

    /// 启用或禁用排序；禁用会清除当前排序
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.active = None;
        }
    }

    /// 处理表头点击
    ///
    /// # 返回
    /// 排序被禁用时返回 `None`，状态保持不变
    pub fn click(&mut self, column: Column) -> Option<SortState> {
        if !self.enabled {
            return None;
        }
        let state = next_state(self.active, column);
        self.active = Some(state);
        Some(state)
    }

    /// 清除排序，恢复插入顺序
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// 指定列的表头指示符（禁用或非当前列时为 `None`）
    pub fn indicator(&self, column: Column) -> Option<&'static str> {
        match self.active {
            Some(state) if self.enabled && state.column == column => Some(state.direction.indicator()),
            _ => None,
        }
    }

    /// 计算显示顺序
    pub fn order(&self, rows: &[RowRecord]) -> Vec<usize> {
        display_order(rows, if self.enabled { self.active } else { None })
    }
}
