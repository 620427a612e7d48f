use quick_xml::escape::partial_escape;

use crate::resource::{OpaqueNode, ResourceEntry, ResourceSet};

use super::template::{DECLARATION, PREAMBLE, RESHEADERS};

/// 换行风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// 序列化选项
///
/// 通过 [`WriteOptions::detect`] 从现有文档中推断，使重写后的文件
/// 保持原有的换行风格与结尾换行。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub line_ending: LineEnding,
    pub trailing_newline: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            trailing_newline: true,
        }
    }
}

impl WriteOptions {
    /// 从现有文档文本推断序列化选项
    ///
    /// 空文档使用默认选项。
    pub fn detect(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }

        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        Self {
            line_ending,
            trailing_newline: text.ends_with('\n'),
        }
    }
}

/// 属性值转义：在文本转义基础上额外处理双引号
fn escape_attribute(value: &str) -> String {
    partial_escape(value).replace('"', "&quot;")
}

/// 逐行构建输出文档
struct DocumentBuilder<'a> {
    out: String,
    newline: &'a str,
}

impl<'a> DocumentBuilder<'a> {
    fn new(options: &'a WriteOptions) -> Self {
        Self {
            out: String::new(),
            newline: options.line_ending.as_str(),
        }
    }

    /// 写入一行（行首不换行，行间插入换行符）
    fn line(&mut self, text: &str) {
        if !self.out.is_empty() {
            self.out.push_str(self.newline);
        }
        self.out.push_str(text);
    }

    /// 写入模板块，`\n` 替换为目标换行符
    fn block(&mut self, text: &str) {
        for line in text.split('\n') {
            self.line(line);
        }
    }

    /// 原样写入非字符串节点（内部换行保持原文）
    fn opaque(&mut self, node: &OpaqueNode) {
        self.line("  ");
        self.out.push_str(&node.xml);
    }

    fn resheader(&mut self, name: &str, value: &str) {
        self.line(&format!("  <resheader name=\"{}\">", escape_attribute(name)));
        self.line(&format!("    <value>{}</value>", partial_escape(value)));
        self.line("  </resheader>");
    }

    fn entry(&mut self, entry: &ResourceEntry) {
        self.line(&format!(
            "  <data name=\"{}\" xml:space=\"preserve\">",
            escape_attribute(&entry.key)
        ));

        if entry.value.is_empty() {
            self.line("    <value />");
        } else {
            self.line(&format!("    <value>{}</value>", partial_escape(&entry.value)));
        }

        // 空注释不输出 <comment> 节点，减少 diff 噪音
        if entry.has_comment() {
            self.line(&format!("    <comment>{}</comment>", partial_escape(&entry.comment)));
        }

        self.line("  </data>");
    }

    fn finish(mut self, trailing_newline: bool) -> String {
        if trailing_newline {
            self.out.push_str(self.newline);
        }
        self.out
    }
}

/// 将资源集合序列化为完整的 ResX 文档
///
/// # 输出顺序
/// 1. XML 声明、`<root>`、固定说明注释与 schema
/// 2. 四个必需的 resheader
/// 3. 位于所有字符串资源之前的原样节点
/// 4. 字符串资源（按集合顺序），原样节点紧跟在其锚点资源之后
/// 5. 锚点已不存在的原样节点
///
/// 自闭合元素统一写为 `<tag />`（斜杠前一个空格）。
pub fn write(set: &ResourceSet, options: &WriteOptions) -> String {
    let mut builder = DocumentBuilder::new(options);

    builder.line(DECLARATION);
    builder.line("<root>");
    builder.block(PREAMBLE);

    for (name, value) in RESHEADERS {
        builder.resheader(name, value);
    }

    for node in set.opaque_after(None) {
        builder.opaque(node);
    }

    for entry in set.iter() {
        builder.entry(entry);
        for node in set.opaque_after(Some(&entry.key)) {
            builder.opaque(node);
        }
    }

    for node in set.orphaned_opaque() {
        builder.opaque(node);
    }

    builder.line("</root>");
    builder.finish(options.trailing_newline)
}

/// 使用默认选项序列化（LF，结尾换行）
pub fn write_default(set: &ResourceSet) -> String {
    write(set, &WriteOptions::default())
}
