/// 编辑器层模块
///
/// 文档侧的变更通知桥：把表格的回写应用到权威文档，再把文档的变更推送回表格。
///
/// # 架构设计
///
/// - **resx_editor**: 单个文档的桥接器，负责解析、序列化、写入与错误边界
/// - **session**: 管理所有打开的编辑器，按文档标识分发变更通知，关闭时释放
///
/// # 使用示例
///
/// ```rust,ignore
/// use resx_editor::editor::ResxEditor;
/// use resx_editor::io::FileDocument;
///
/// let mut editor = ResxEditor::new(FileDocument::new("Strings.resx"), config);
/// for message in editor.open().messages {
///     transport.post(message);
/// }
///
/// // 表格回写
/// let output = editor.handle_message(inbound);
/// ```
pub mod resx_editor;
pub mod session;

// === 导出公共接口 ===
pub use resx_editor::{EditorOutput, ResxEditor};
pub use session::Session;
