//! IO 抽象层 - trait 定义
//!
//! 权威文档的抽象接口，支持依赖注入和测试 mock。
//! 编辑器只通过该接口读写文档，不关心文档存放在文件系统还是宿主 IDE 的缓冲区中。

use std::fmt;
use std::path::Path;

use crate::utils::ResxError;

/// 文档标识（通常为 URI 或文件路径）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 由文件路径生成标识
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 权威文档 trait
///
/// # 职责
/// - 提供文档的完整文本
/// - 以整篇替换的方式应用编辑
///
/// # 实现示例
/// ```rust,ignore
/// pub struct HostDocument { id: DocumentId, buffer: HostBuffer }
/// impl TextDocument for HostDocument {
///     fn id(&self) -> &DocumentId { &self.id }
///     fn get_text(&self) -> Result<String, ResxError> { Ok(self.buffer.text()) }
///     fn apply_edit(&mut self, text: &str) -> Result<bool, ResxError> {
///         Ok(self.buffer.replace_all(text))
///     }
/// }
/// ```
pub trait TextDocument {
    /// 文档标识，用于过滤变更通知
    fn id(&self) -> &DocumentId;

    /// 读取文档的完整文本
    fn get_text(&self) -> Result<String, ResxError>;

    /// 用新文本替换整篇文档
    ///
    /// # 返回
    /// 宿主拒绝编辑时返回 `Ok(false)`；只有在写入完成后才返回
    fn apply_edit(&mut self, text: &str) -> Result<bool, ResxError>;

    /// 文档在磁盘上的路径（用于生成 Designer 文件）
    fn path(&self) -> Option<&Path> {
        None
    }
}
