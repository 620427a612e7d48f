/// IO 抽象层模块
///
/// 该模块提供了权威文档读写的抽象接口，遵循依赖倒置原则。
/// 支持依赖注入、测试 mock 和替换 IO 实现（如宿主 IDE 缓冲区）。
///
/// # 架构设计
///
/// - **traits**: 定义 TextDocument trait 接口
/// - **file_document**: 基于文件系统的默认实现
/// - **memory_document**: 内存实现
///
/// # 使用示例
///
/// ```rust,ignore
/// use resx_editor::io::{FileDocument, TextDocument};
///
/// let doc = FileDocument::new("Strings.resx");
/// let text = doc.get_text()?;
/// ```
pub mod traits;
pub mod file_document;
pub mod memory_document;

// === 导出 trait 定义 ===
pub use traits::{DocumentId, TextDocument};

// === 导出默认实现 ===
pub use file_document::{decode_bytes, FileDocument};
pub use memory_document::MemoryDocument;
