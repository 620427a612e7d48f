//! 资源编辑器（文档侧桥接器）
//!
//! 持有一个权威文档，处理两类输入：
//! - 表格发来的回写消息（[`InboundMessage`]）
//! - 宿主发来的文档变更通知（按文档标识过滤）
//!
//! 所有错误都在 [`ResxEditor::handle_message`] 等入口处被捕获、记录日志并转换为
//! [`Notification`]，不会向调用方传播。

use crate::config::EditorConfig;
use crate::designer::{AccessorEmitter, DesignerFileEmitter};
use crate::io::{DocumentId, TextDocument};
use crate::protocol::{InboundMessage, Notification, OutboundMessage};
use crate::resource::ResourceSet;
use crate::resx::{self, WriteOptions};
use crate::utils::{validate_key, ResxError};

/// 空资源集合的传输 JSON（文档无法解析时推送给表格）
const EMPTY_TRANSPORT: &str = "{}";

/// 一次处理的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorOutput {
    /// 发往表格的消息（按顺序）
    pub messages: Vec<OutboundMessage>,
    /// 面向用户的通知
    pub notifications: Vec<Notification>,
    /// 权威文档是否被写入
    pub document_written: bool,
}

impl EditorOutput {
    fn message(message: OutboundMessage) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    fn notify(notification: Notification) -> Self {
        Self {
            notifications: vec![notification],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.notifications.is_empty() && !self.document_written
    }

    /// 追加另一次处理的结果
    pub fn extend(&mut self, other: EditorOutput) {
        self.messages.extend(other.messages);
        self.notifications.extend(other.notifications);
        self.document_written |= other.document_written;
    }
}

/// 资源编辑器
///
/// # 核心特性
/// - **整篇替换**: 每次回写都重新序列化完整文档
/// - **无抖动**: 序列化结果与当前文档一致时不调用 `apply_edit`
/// - **保留原样节点**: 回写时从当前文档重新读取 assembly / metadata / 类型化 data 与格式错误的条目，写回原位置
/// - **先写后生成**: Designer 文件只在文档写入成功之后生成
pub struct ResxEditor<D: TextDocument> {
    document: D,
    config: EditorConfig,
    /// 显式指定的访问类生成器；未指定时按文档路径使用 [`DesignerFileEmitter`]
    emitter: Option<Box<dyn AccessorEmitter>>,
}

impl<D: TextDocument> ResxEditor<D> {
    pub fn new(document: D, config: EditorConfig) -> Self {
        Self {
            document,
            config,
            emitter: None,
        }
    }

    /// 使用自定义的访问类生成器
    pub fn with_emitter(mut self, emitter: Box<dyn AccessorEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn id(&self) -> &DocumentId {
        self.document.id()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// 打开编辑器：先推送配置，再推送文档内容
    pub fn open(&mut self) -> EditorOutput {
        tracing::info!(document = %self.document.id(), "opening resource editor");

        let mut output = EditorOutput::message(OutboundMessage::Config {
            enable_column_sorting: self.config.enable_column_sorting,
        });
        output.extend(self.refresh());
        output
    }

    /// 读取并解析文档，向表格推送完整替换
    ///
    /// 文档无法解析时推送空表格并发出一条通知。
    pub fn refresh(&mut self) -> EditorOutput {
        match self.load() {
            Ok(set) => match set.to_transport_json() {
                Ok(text) => EditorOutput::message(OutboundMessage::Update { text }),
                Err(e) => self.fail(e),
            },
            Err(e) => {
                let mut output = self.fail(e);
                output.messages.push(OutboundMessage::Update {
                    text: EMPTY_TRANSPORT.to_string(),
                });
                output
            }
        }
    }

    /// 宿主的文档变更通知
    ///
    /// 只处理属于本编辑器的文档；包括本编辑器自身写入产生的回声。
    pub fn on_document_changed(&mut self, changed: &DocumentId) -> EditorOutput {
        if changed != self.document.id() {
            return EditorOutput::default();
        }

        tracing::debug!(document = %changed, "document changed, refreshing grid");
        self.refresh()
    }

    /// 处理表格发来的消息
    pub fn handle_message(&mut self, message: InboundMessage) -> EditorOutput {
        match message {
            InboundMessage::Update { json } => match self.apply_update(&json) {
                Ok(Some(set)) => {
                    let mut output = EditorOutput {
                        document_written: true,
                        ..EditorOutput::default()
                    };
                    if self.config.generate_code {
                        output.extend(self.emit_accessors(&set));
                    }
                    output
                }
                Ok(None) => EditorOutput::default(),
                Err(e) => self.fail(e),
            },
        }
    }

    /// 将回写内容应用到权威文档
    ///
    /// # 返回
    /// - `Ok(Some(集合))`: 文档已写入
    /// - `Ok(None)`: 序列化结果与当前文档一致，未写入
    /// - `Err(WriteFailed)`: 宿主拒绝编辑
    /// - `Err(Unparsable)`: 当前文档无法解析，拒绝覆盖
    pub fn apply_update(&mut self, json: &str) -> Result<Option<ResourceSet>, ResxError> {
        let mut set = ResourceSet::from_transport_json(json)?;

        let current = self.document.get_text()?;
        let existing = resx::parse(&current)?;
        set.adopt_opaque(&existing);

        let text = resx::write(&set, &WriteOptions::detect(&current));
        if text == current {
            tracing::debug!(document = %self.document.id(), "serialized text unchanged, skipping edit");
            return Ok(None);
        }

        if !self.document.apply_edit(&text)? {
            return Err(ResxError::WriteFailed);
        }

        tracing::info!(
            document = %self.document.id(),
            resources = set.len(),
            "applied grid changes to document"
        );
        Ok(Some(set))
    }

    /// 新增资源命令
    ///
    /// 先对照权威文档检查键，通过后才把 `add` 消息发给表格（表格还会对照自身缓存再检查一次）。
    pub fn request_add(&mut self, key: &str, value: &str, comment: &str) -> EditorOutput {
        let checked = validate_key(key).and_then(|_| {
            let set = self.load()?;
            if set.contains_key(key) {
                return Err(ResxError::DuplicateKey(key.to_string()));
            }
            Ok(())
        });

        match checked {
            Ok(()) => EditorOutput::message(OutboundMessage::Add {
                key: key.to_string(),
                value: value.to_string(),
                comment: comment.to_string(),
            }),
            Err(e) => self.fail(e),
        }
    }

    /// 删除资源命令（表格删除其选中行）
    pub fn request_delete(&mut self) -> EditorOutput {
        EditorOutput::message(OutboundMessage::Delete)
    }

    /// 更新配置并通知表格
    pub fn update_config(&mut self, config: EditorConfig) -> EditorOutput {
        self.config = config;
        EditorOutput::message(OutboundMessage::Config {
            enable_column_sorting: self.config.enable_column_sorting,
        })
    }

    fn load(&self) -> Result<ResourceSet, ResxError> {
        let text = self.document.get_text()?;
        resx::parse(&text)
    }

    /// 文档写入成功之后生成访问类
    fn emit_accessors(&self, set: &ResourceSet) -> EditorOutput {
        let result = match (&self.emitter, self.document.path()) {
            (Some(emitter), _) => emitter.emit(set),
            (None, Some(path)) => DesignerFileEmitter::new(path).emit(set),
            (None, None) => {
                tracing::warn!(document = %self.document.id(), "document has no path, skipping Designer generation");
                return EditorOutput::default();
            }
        };

        match result {
            Ok(path) => {
                tracing::info!("Generated Designer file at {}", path.display());
                EditorOutput::default()
            }
            Err(e) => {
                tracing::error!(document = %self.document.id(), "Designer generation failed: {}", e);
                EditorOutput::notify(Notification::error("Failed to generate the Designer file."))
            }
        }
    }

    /// 错误边界：记录日志并转换为通知
    fn fail(&self, err: ResxError) -> EditorOutput {
        match &err {
            ResxError::NothingSelected | ResxError::DuplicateKey(_) | ResxError::InvalidKey(_) => {
                tracing::warn!(document = %self.document.id(), "{}", err)
            }
            _ => tracing::error!(document = %self.document.id(), "{}", err),
        }
        EditorOutput::notify(Notification::from_error(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryDocument;
    use crate::protocol::NotificationLevel;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    const GREETING_DOC: &str = "<root>\n  <data name=\"Greeting\" xml:space=\"preserve\">\n    <value>Hi</value>\n  </data>\n</root>";

    fn editor(text: &str) -> ResxEditor<MemoryDocument> {
        ResxEditor::new(MemoryDocument::new("mem://Strings.resx", text), EditorConfig::default())
    }

    /// 记录调用的生成器
    struct RecordingEmitter {
        calls: Rc<RefCell<Vec<usize>>>,
        fail: bool,
    }

    impl AccessorEmitter for RecordingEmitter {
        fn emit(&self, resources: &ResourceSet) -> Result<PathBuf, ResxError> {
            if self.fail {
                return Err(ResxError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.calls.borrow_mut().push(resources.len());
            Ok(PathBuf::from("Strings.Designer.cs"))
        }
    }

    #[test]
    fn test_open_sends_config_then_update() {
        let mut editor = editor(GREETING_DOC);
        let output = editor.open();

        assert_eq!(
            output.messages,
            vec![
                OutboundMessage::Config { enable_column_sorting: true },
                OutboundMessage::Update { text: r#"{"Greeting":{"value":"Hi"}}"#.to_string() },
            ]
        );
        assert!(output.notifications.is_empty());
    }

    #[test]
    fn test_unparsable_document_shows_empty_grid() {
        let mut editor = editor("<root><data name=\"A\"><value>x</value></root>");
        let output = editor.refresh();

        assert_eq!(output.messages, vec![OutboundMessage::Update { text: "{}".to_string() }]);
        assert_eq!(output.notifications, vec![Notification::error("Could not parse resource content.")]);
    }

    #[test]
    fn test_apply_update_writes_document() {
        let mut editor = editor("");
        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Farewell":{"value":"Bye","comment":"parting words"}}"#.to_string(),
        });

        assert!(output.document_written);
        let text = editor.document().text();
        assert!(text.contains("<data name=\"Farewell\" xml:space=\"preserve\">"));
        assert!(text.contains("<comment>parting words</comment>"));
        assert_eq!(editor.document().edit_count(), 1);
    }

    #[test]
    fn test_unchanged_update_skips_edit() {
        let canonical = resx::write_default(&resx::parse(GREETING_DOC).unwrap());
        let mut editor = editor(&canonical);

        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Greeting":{"value":"Hi"}}"#.to_string(),
        });

        assert!(output.is_empty());
        assert_eq!(editor.document().edit_count(), 0);
    }

    #[test]
    fn test_write_failure_notifies() {
        let mut editor = editor(GREETING_DOC);
        editor.document_mut().set_reject_edits(true);

        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Greeting":{"value":"Hello"}}"#.to_string(),
        });

        assert!(!output.document_written);
        assert_eq!(output.notifications, vec![Notification::error("Failed to save changes to the document.")]);
        assert_eq!(editor.document().text(), GREETING_DOC);
    }

    #[test]
    fn test_refuses_to_overwrite_unparsable_document() {
        let broken = "<root><data name=\"A\"><value>x</value></root>";
        let mut editor = editor(broken);

        let output = editor.handle_message(InboundMessage::Update { json: "{}".to_string() });

        assert!(!output.document_written);
        assert_eq!(output.notifications.len(), 1);
        assert_eq!(editor.document().text(), broken);
    }

    #[test]
    fn test_invalid_transport_is_generic_error() {
        let mut editor = editor(GREETING_DOC);
        let output = editor.handle_message(InboundMessage::Update { json: "not json".to_string() });

        assert_eq!(output.notifications.len(), 1);
        assert_eq!(output.notifications[0].level, NotificationLevel::Error);
        assert!(!output.notifications[0].message.contains("not json"));
    }

    #[test]
    fn test_opaque_resources_survive_update() {
        let doc = "<root>\n  <assembly alias=\"System.Drawing\" name=\"System.Drawing\" />\n  <data name=\"Greeting\" xml:space=\"preserve\">\n    <value>Hi</value>\n  </data>\n  <data name=\"Icon\" type=\"System.Drawing.Icon, System.Drawing\" mimetype=\"application/x-microsoft.net.object.bytearray.base64\">\n    <value>AAAA</value>\n  </data>\n</root>";
        let mut editor = editor(doc);

        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Greeting":{"value":"Hello"}}"#.to_string(),
        });

        assert!(output.document_written);
        let text = editor.document().text();
        assert!(text.contains("<value>Hello</value>"));
        assert!(text.contains("<assembly alias=\"System.Drawing\" name=\"System.Drawing\" />"));
        assert!(text.contains("<data name=\"Icon\" type=\"System.Drawing.Icon, System.Drawing\""));
        assert!(text.contains("<value>AAAA</value>"));
    }

    #[test]
    fn test_malformed_entry_survives_unrelated_edit() {
        let doc = "<root>\n  <data name=\"Good\" xml:space=\"preserve\">\n    <value>kept</value>\n  </data>\n  <data name=\"Html\" xml:space=\"preserve\">\n    <value>before <b>bold</b> after</value>\n  </data>\n</root>";
        let mut editor = editor(doc);

        let opened = editor.open();
        assert_eq!(
            opened.messages[1],
            OutboundMessage::Update { text: r#"{"Good":{"value":"kept"}}"#.to_string() }
        );

        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Good":{"value":"changed"}}"#.to_string(),
        });

        assert!(output.document_written);
        assert!(output.notifications.is_empty());
        let text = editor.document().text();
        assert!(text.contains("<value>changed</value>"));
        assert!(text.contains("<data name=\"Html\" xml:space=\"preserve\">\n    <value>before <b>bold</b> after</value>\n  </data>"));
    }

    #[test]
    fn test_request_add_checks_document() {
        let mut editor = editor(GREETING_DOC);

        let duplicate = editor.request_add("Greeting", "Hi", "");
        assert!(duplicate.messages.is_empty());
        assert_eq!(duplicate.notifications.len(), 1);
        assert!(duplicate.notifications[0].message.contains("Greeting"));

        let empty = editor.request_add("", "x", "");
        assert!(empty.messages.is_empty());
        assert_eq!(empty.notifications.len(), 1);

        let ok = editor.request_add("Farewell", "Bye", "parting words");
        assert_eq!(
            ok.messages,
            vec![OutboundMessage::Add {
                key: "Farewell".into(),
                value: "Bye".into(),
                comment: "parting words".into()
            }]
        );
        // 命令本身不写入文档
        assert_eq!(editor.document().edit_count(), 0);
    }

    #[test]
    fn test_request_delete_and_config() {
        let mut editor = editor(GREETING_DOC);
        assert_eq!(editor.request_delete().messages, vec![OutboundMessage::Delete]);

        let config = EditorConfig {
            enable_column_sorting: false,
            ..EditorConfig::default()
        };
        let output = editor.update_config(config);
        assert_eq!(output.messages, vec![OutboundMessage::Config { enable_column_sorting: false }]);
        assert!(!editor.config().enable_column_sorting);
    }

    #[test]
    fn test_document_changed_filters_by_identity() {
        let mut editor = editor(GREETING_DOC);

        assert!(editor.on_document_changed(&DocumentId::new("mem://Other.resx")).is_empty());

        let output = editor.on_document_changed(&DocumentId::new("mem://Strings.resx"));
        assert_eq!(output.messages.len(), 1);
    }

    #[test]
    fn test_designer_emitted_only_after_write() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let config = EditorConfig {
            generate_code: true,
            ..EditorConfig::default()
        };
        let mut editor = ResxEditor::new(MemoryDocument::new("mem://Strings.resx", GREETING_DOC), config)
            .with_emitter(Box::new(RecordingEmitter { calls: Rc::clone(&calls), fail: false }));

        editor.document_mut().set_reject_edits(true);
        editor.handle_message(InboundMessage::Update { json: r#"{"Greeting":{"value":"Hello"}}"#.to_string() });
        assert!(calls.borrow().is_empty());

        editor.document_mut().set_reject_edits(false);
        let output = editor.handle_message(InboundMessage::Update {
            json: r#"{"Greeting":{"value":"Hello"},"Farewell":{"value":"Bye"}}"#.to_string(),
        });
        assert!(output.document_written);
        assert_eq!(*calls.borrow(), vec![2]);
    }

    #[test]
    fn test_designer_failure_keeps_write() {
        let config = EditorConfig {
            generate_code: true,
            ..EditorConfig::default()
        };
        let mut editor = ResxEditor::new(MemoryDocument::new("mem://Strings.resx", GREETING_DOC), config)
            .with_emitter(Box::new(RecordingEmitter { calls: Rc::default(), fail: true }));

        let output = editor.handle_message(InboundMessage::Update { json: r#"{"Greeting":{"value":"Hello"}}"#.to_string() });
        assert!(output.document_written);
        assert_eq!(output.notifications, vec![Notification::error("Failed to generate the Designer file.")]);
    }
}
