//! 资源模型模块
//!
//! 定义编辑器在内存中使用的资源表示：
//! - **ResourceEntry**: 单个字符串资源（键、值、可选注释）
//! - **ResourceSet**: 按插入顺序排列、键唯一的资源集合
//! - **RowRecord**: 表格侧使用的扁平行记录
//! - **OpaqueNode**: 非字符串资源，原样保留

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::{validate_key, ResxError};

/// 单个字符串资源
///
/// `comment` 为空字符串表示没有注释，下游永远不会看到 `None`。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceEntry {
    pub key: String,
    pub value: String,
    pub comment: String,
}

impl ResourceEntry {
    /// 创建新的资源条目
    pub fn new(key: impl Into<String>, value: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: comment.into(),
        }
    }

    /// 是否带有非空注释
    pub fn has_comment(&self) -> bool {
        !self.comment.is_empty()
    }
}

/// 原样保留的节点
///
/// `assembly`、`metadata`、带 type/mimetype 的 `data`，以及无法作为字符串资源
/// 使用的 `data`（格式错误或重复的键）。不在表格中显示，序列化时按原始文本
/// 写在 `after` 指向的字符串资源之后。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueNode {
    /// 元素名称（如 "data"、"assembly"）
    pub element: String,
    /// `name` 属性（如果有）
    pub name: Option<String>,
    /// 元素的原始 XML 文本
    pub xml: String,
    /// 文档中位于该节点之前的最后一个字符串资源的键；`None` 表示在所有字符串资源之前
    pub after: Option<String>,
}

/// 表格行记录（传输到 UI 的显示投影）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RowRecord {
    pub key: String,
    pub value: String,
    pub comment: String,
}

impl RowRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: comment.into(),
        }
    }
}

impl From<&ResourceEntry> for RowRecord {
    fn from(entry: &ResourceEntry) -> Self {
        RowRecord::new(entry.key.clone(), entry.value.clone(), entry.comment.clone())
    }
}

impl From<&RowRecord> for ResourceEntry {
    fn from(row: &RowRecord) -> Self {
        ResourceEntry::new(row.key.clone(), row.value.clone(), row.comment.clone())
    }
}

/// 传输格式中的单个条目：`{"value": "...", "comment": "..."}`
#[derive(Serialize)]
struct TransportEntryRef<'a> {
    value: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    comment: &'a str,
}

fn is_blank(text: &&str) -> bool {
    text.is_empty()
}

#[derive(Deserialize)]
struct TransportEntry {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

/// 有序资源集合
///
/// # 不变量
/// - 键唯一，重复添加返回 `ResxError::DuplicateKey`，不会静默覆盖
/// - 迭代顺序为插入顺序（解析时即文档顺序）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceSet {
    entries: IndexMap<String, ResourceEntry>,
    opaque: Vec<OpaqueNode>,
}

impl ResourceSet {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 资源数量（不含非字符串节点）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ResourceEntry> {
        self.entries.get(key)
    }

    /// 按插入顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 追加新资源
    ///
    /// # 返回
    /// 键已存在时返回 `DuplicateKey`，集合保持不变
    pub fn insert(&mut self, entry: ResourceEntry) -> Result<(), ResxError> {
        validate_key(&entry.key)?;

        if self.entries.contains_key(&entry.key) {
            return Err(ResxError::DuplicateKey(entry.key));
        }

        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// 更新已有资源的值
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<(), ResxError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| ResxError::KeyNotFound(key.to_string()))?;
        entry.value = value.into();
        Ok(())
    }

    /// 更新已有资源的注释（空字符串即删除注释）
    pub fn set_comment(&mut self, key: &str, comment: impl Into<String>) -> Result<(), ResxError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| ResxError::KeyNotFound(key.to_string()))?;
        entry.comment = comment.into();
        Ok(())
    }

    /// 删除资源，保持其余条目的相对顺序
    pub fn remove(&mut self, key: &str) -> Option<ResourceEntry> {
        self.entries.shift_remove(key)
    }

    /// 非字符串节点
    pub fn opaque(&self) -> &[OpaqueNode] {
        &self.opaque
    }

    pub fn push_opaque(&mut self, node: OpaqueNode) {
        self.opaque.push(node);
    }

    /// 最后一个字符串资源的键
    pub fn last_key(&self) -> Option<&str> {
        self.entries.last().map(|(key, _)| key.as_str())
    }

    /// 紧跟在 `key` 之后的原样节点（`None` 为位于所有字符串资源之前的节点）
    pub fn opaque_after<'a>(&'a self, key: Option<&'a str>) -> impl Iterator<Item = &'a OpaqueNode> + 'a {
        self.opaque.iter().filter(move |node| node.after.as_deref() == key)
    }

    /// 锚点不在本集合中的原样节点
    pub fn orphaned_opaque(&self) -> impl Iterator<Item = &OpaqueNode> {
        self.opaque
            .iter()
            .filter(|node| matches!(&node.after, Some(key) if !self.entries.contains_key(key)))
    }

    /// 用另一集合（通常是当前文档）的原样节点替换本集合的节点
    ///
    /// 锚点键仍存在时保持不变；锚点已被删除或改名时，改挂到 `other` 中
    /// 它之前最近的、本集合仍包含的键，使节点留在原来的位置附近。
    pub fn adopt_opaque(&mut self, other: &ResourceSet) {
        let opaque = other
            .opaque
            .iter()
            .map(|node| OpaqueNode {
                after: other.reanchor(node.after.as_deref(), self),
                ..node.clone()
            })
            .collect();
        self.opaque = opaque;
    }

    fn reanchor(&self, anchor: Option<&str>, target: &ResourceSet) -> Option<String> {
        let anchor = anchor?;
        if target.contains_key(anchor) {
            return Some(anchor.to_string());
        }

        let index = self.entries.get_index_of(anchor)?;
        self.entries
            .keys()
            .take(index)
            .rev()
            .find(|key| target.contains_key(key.as_str()))
            .cloned()
    }

    /// 从表格行重建资源集合
    pub fn from_rows(rows: &[RowRecord]) -> Result<Self, ResxError> {
        let mut set = ResourceSet::new();
        for row in rows {
            set.insert(ResourceEntry::from(row))?;
        }
        Ok(set)
    }

    /// 投影为表格行
    pub fn to_rows(&self) -> Vec<RowRecord> {
        self.entries.values().map(RowRecord::from).collect()
    }

    /// 序列化为传输 JSON：`{"Key": {"value": "...", "comment": "..."}}`
    ///
    /// 空注释不输出，保证表格与文档两侧生成的文本一致。
    pub fn to_transport_json(&self) -> Result<String, ResxError> {
        let map: IndexMap<&str, TransportEntryRef<'_>> = self
            .entries
            .values()
            .map(|e| {
                (
                    e.key.as_str(),
                    TransportEntryRef {
                        value: &e.value,
                        comment: &e.comment,
                    },
                )
            })
            .collect();

        Ok(serde_json::to_string(&map)?)
    }

    /// 从传输 JSON 解析
    pub fn from_transport_json(json: &str) -> Result<Self, ResxError> {
        let map: IndexMap<String, TransportEntry> = serde_json::from_str(json)
            .map_err(|e| ResxError::InvalidTransport(e.to_string()))?;

        let mut set = ResourceSet::new();
        for (key, entry) in map {
            let entry = ResourceEntry::new(
                key,
                entry.value.unwrap_or_default(),
                entry.comment.unwrap_or_default(),
            );
            set.insert(entry)
                .map_err(|e| ResxError::InvalidTransport(e.to_string()))?;
        }

        Ok(set)
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a ResourceEntry;
    type IntoIter = indexmap::map::Values<'a, String, ResourceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ResourceSet {
        let mut set = ResourceSet::new();
        set.insert(ResourceEntry::new("Greeting", "Hi", "")).unwrap();
        set.insert(ResourceEntry::new("Farewell", "Bye", "parting words")).unwrap();
        set
    }

    fn raw_node(name: &str, after: Option<&str>) -> OpaqueNode {
        OpaqueNode {
            element: "data".to_string(),
            name: Some(name.to_string()),
            xml: format!("<data name=\"{}\" type=\"T\" />", name),
            after: after.map(str::to_string),
        }
    }

    #[test]
    fn test_adopt_opaque_keeps_position() {
        let mut document = ResourceSet::new();
        for key in ["A", "B", "C"] {
            document.insert(ResourceEntry::new(key, "v", "")).unwrap();
        }
        document.push_opaque(raw_node("Top", None));
        document.push_opaque(raw_node("AfterB", Some("B")));
        document.push_opaque(raw_node("AfterC", Some("C")));

        // 表格删除了 B、改名了 C
        let mut edited = ResourceSet::new();
        edited.insert(ResourceEntry::new("A", "v", "")).unwrap();
        edited.insert(ResourceEntry::new("Z", "v", "")).unwrap();
        edited.adopt_opaque(&document);

        let anchors: Vec<_> = edited.opaque().iter().map(|n| n.after.as_deref()).collect();
        assert_eq!(anchors, vec![None, Some("A"), Some("A")]);
        assert_eq!(edited.opaque_after(Some("A")).count(), 2);
        assert_eq!(edited.orphaned_opaque().count(), 0);
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut set = sample_set();
        let before = set.clone();

        let result = set.insert(ResourceEntry::new("Greeting", "Hello", ""));
        assert!(matches!(result, Err(ResxError::DuplicateKey(ref k)) if k == "Greeting"));
        assert_eq!(set, before);
    }

    #[test]
    fn test_insert_rejects_empty_key() {
        let mut set = ResourceSet::new();
        assert!(matches!(
            set.insert(ResourceEntry::new("", "x", "")),
            Err(ResxError::InvalidKey(_))
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = sample_set();
        set.insert(ResourceEntry::new("Third", "3", "")).unwrap();

        assert!(set.remove("Farewell").is_some());
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["Greeting", "Third"]);
        assert!(set.remove("Farewell").is_none());
    }

    #[test]
    fn test_set_value_missing_key() {
        let mut set = sample_set();
        assert!(set.set_value("Greeting", "Hello").is_ok());
        assert_eq!(set.get("Greeting").unwrap().value, "Hello");
        assert!(matches!(set.set_value("Nope", "x"), Err(ResxError::KeyNotFound(_))));
    }

    #[test]
    fn test_transport_json_omits_empty_comment() {
        let set = sample_set();
        let json = set.to_transport_json().unwrap();
        assert_eq!(
            json,
            r#"{"Greeting":{"value":"Hi"},"Farewell":{"value":"Bye","comment":"parting words"}}"#
        );

        let parsed = ResourceSet::from_transport_json(&json).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn test_transport_json_tolerates_missing_fields() {
        let set = ResourceSet::from_transport_json(r#"{"A":{},"B":{"value":null,"comment":null}}"#).unwrap();
        assert_eq!(set.get("A").unwrap(), &ResourceEntry::new("A", "", ""));
        assert_eq!(set.get("B").unwrap(), &ResourceEntry::new("B", "", ""));
    }

    #[test]
    fn test_transport_json_invalid() {
        assert!(matches!(
            ResourceSet::from_transport_json("[1, 2]"),
            Err(ResxError::InvalidTransport(_))
        ));
        assert!(matches!(
            ResourceSet::from_transport_json(r#"{"":{"value":"x"}}"#),
            Err(ResxError::InvalidTransport(_))
        ));
    }

    #[test]
    fn test_rows_round_trip() {
        let set = sample_set();
        let rows = set.to_rows();
        assert_eq!(rows[1], RowRecord::new("Farewell", "Bye", "parting words"));
        assert_eq!(ResourceSet::from_rows(&rows).unwrap(), set);
    }

    #[test]
    fn test_row_record_serde_names() {
        let row = RowRecord::new("K", "V", "C");
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Key":"K","Value":"V","Comment":"C"}"#);
    }
}
