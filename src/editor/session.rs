//! 编辑会话
//!
//! 管理所有打开的编辑器，把宿主的文档变更通知分发给对应的编辑器，
//! 并在编辑器关闭时释放它（之后该文档的通知不再被处理）。
//!
//! 消息按到达顺序逐条处理。写入成功后，回声通知在 `apply_edit` 返回之后才发出，
//! 因此表格收到的刷新总是反映已完成的写入。

use std::collections::HashMap;

use super::resx_editor::{EditorOutput, ResxEditor};
use crate::io::{DocumentId, TextDocument};
use crate::protocol::InboundMessage;

pub struct Session<D: TextDocument> {
    editors: HashMap<DocumentId, ResxEditor<D>>,
}

impl<D: TextDocument> Default for Session<D> {
    fn default() -> Self {
        Self {
            editors: HashMap::new(),
        }
    }
}

impl<D: TextDocument> Session<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册并打开编辑器
    ///
    /// 同一文档只保留一个编辑器，重复打开时替换旧的。
    pub fn open(&mut self, mut editor: ResxEditor<D>) -> EditorOutput {
        let id = editor.id().clone();
        let output = editor.open();

        if self.editors.insert(id.clone(), editor).is_some() {
            tracing::warn!(document = %id, "replacing an editor that was already open");
        }
        output
    }

    /// 关闭编辑器并释放其订阅
    pub fn close(&mut self, id: &DocumentId) -> Option<ResxEditor<D>> {
        let editor = self.editors.remove(id);
        if editor.is_some() {
            tracing::info!(document = %id, "closed resource editor");
        }
        editor
    }

    pub fn get(&self, id: &DocumentId) -> Option<&ResxEditor<D>> {
        self.editors.get(id)
    }

    pub fn get_mut(&mut self, id: &DocumentId) -> Option<&mut ResxEditor<D>> {
        self.editors.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// 处理某个编辑器的表格消息
    ///
    /// 文档被写入时，紧接着附加该写入的回声刷新。
    pub fn handle_message(&mut self, id: &DocumentId, message: InboundMessage) -> EditorOutput {
        let Some(editor) = self.editors.get_mut(id) else {
            tracing::warn!(document = %id, "message for a document with no open editor, ignoring");
            return EditorOutput::default();
        };

        let mut output = editor.handle_message(message);
        if output.document_written {
            for (_, echo) in self.document_changed(id) {
                output.extend(echo);
            }
        }
        output
    }

    /// 宿主的文档变更通知
    ///
    /// # 返回
    /// 每个受影响编辑器的输出；没有编辑器打开该文档时为空
    pub fn document_changed(&mut self, id: &DocumentId) -> Vec<(DocumentId, EditorOutput)> {
        self.editors
            .iter_mut()
            .map(|(editor_id, editor)| (editor_id.clone(), editor.on_document_changed(id)))
            .filter(|(_, output)| !output.is_empty())
            .collect()
    }
}
