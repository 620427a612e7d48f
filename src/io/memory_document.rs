//! 内存文档实现
//!
//! 用于测试和不落盘的宿主集成，可以模拟宿主拒绝编辑。

use std::path::{Path, PathBuf};

use super::traits::{DocumentId, TextDocument};
use crate::utils::ResxError;

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    id: DocumentId,
    text: String,
    path: Option<PathBuf>,
    /// 为 true 时 `apply_edit` 返回 false
    reject_edits: bool,
    /// 成功应用的编辑次数
    edit_count: usize,
}

impl MemoryDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            text: text.into(),
            path: None,
            reject_edits: false,
            edit_count: 0,
        }
    }

    /// 关联磁盘路径（仅用于生成 Designer 文件）
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn set_reject_edits(&mut self, reject: bool) {
        self.reject_edits = reject;
    }

    /// 模拟外部修改（不计入编辑次数）
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn edit_count(&self) -> usize {
        self.edit_count
    }
}

impl TextDocument for MemoryDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn get_text(&self) -> Result<String, ResxError> {
        Ok(self.text.clone())
    }

    fn apply_edit(&mut self, text: &str) -> Result<bool, ResxError> {
        if self.reject_edits {
            return Ok(false);
        }
        self.text = text.to_string();
        self.edit_count += 1;
        Ok(true)
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_document_edits() {
        let mut doc = MemoryDocument::new("mem://a", "old");
        assert!(doc.apply_edit("new").unwrap());
        assert_eq!(doc.get_text().unwrap(), "new");
        assert_eq!(doc.edit_count(), 1);

        doc.set_reject_edits(true);
        assert!(!doc.apply_edit("newer").unwrap());
        assert_eq!(doc.text(), "new");
        assert_eq!(doc.edit_count(), 1);
    }
}
