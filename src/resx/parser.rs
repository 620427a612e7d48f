use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::resource::{OpaqueNode, ResourceEntry, ResourceSet};
use crate::utils::ResxError;

/// `data` 元素的解析结果
enum DataOutcome {
    /// 字符串资源
    Entry(ResourceEntry),
    /// 带 type/mimetype 的资源，原样保留
    Typed,
    /// 格式错误的条目（附带原因）
    Skipped(String),
}

/// 子元素文本的读取结果
struct ChildText {
    text: String,
    /// 文本中出现了嵌套元素或无法解码的实体
    malformed: Option<String>,
}

fn unparsable(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> ResxError {
    ResxError::Unparsable(format!("{} (at byte {})", err, reader.buffer_position()))
}

fn read_event<'i>(reader: &mut Reader<&'i [u8]>) -> Result<Event<'i>, ResxError> {
    reader.read_event().map_err(|e| unparsable(reader, e))
}

/// 读取属性值（已解码实体）
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// 跳过当前元素的剩余内容，返回元素结束后的字节位置
fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<usize, ResxError> {
    reader
        .read_to_end(start.name())
        .map_err(|e| unparsable(reader, e))?;
    Ok(reader.buffer_position() as usize)
}

/// 读取 `<value>` / `<comment>` 的文本内容，直到对应的结束标签
fn read_child_text(reader: &mut Reader<&[u8]>) -> Result<ChildText, ResxError> {
    let mut text = String::new();
    let mut malformed = None;
    let mut depth = 0usize;

    loop {
        match read_event(reader)? {
            Event::Text(t) => {
                if depth == 0 {
                    match t.unescape() {
                        Ok(decoded) => text.push_str(&decoded),
                        Err(e) => malformed = Some(e.to_string()),
                    }
                }
            }
            Event::CData(c) => {
                if depth == 0 {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Start(_) => {
                depth += 1;
                malformed = Some("unexpected markup inside text node".to_string());
            }
            Event::Empty(_) => {
                malformed = Some("unexpected markup inside text node".to_string());
            }
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(unparsable(reader, "unexpected end of document")),
            _ => {}
        }
    }

    Ok(ChildText { text, malformed })
}

/// 解析一个 `data` 元素
///
/// # 参数
/// * `start` - `data` 的开始标签
/// * `is_empty` - 是否为自闭合标签 `<data ... />`
///
/// 返回时元素已被完整读取，调用方可用 `buffer_position` 截取原始文本。
fn read_data(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    is_empty: bool,
) -> Result<DataOutcome, ResxError> {
    let header = (|| {
        let name = attribute(start, b"name")?;
        let typed = attribute(start, b"type")?.is_some() || attribute(start, b"mimetype")?.is_some();
        Ok::<_, String>((name, typed))
    })();

    let (name, typed) = match header {
        Ok(header) => header,
        Err(reason) => {
            if !is_empty {
                skip_element(reader, start)?;
            }
            return Ok(DataOutcome::Skipped(reason));
        }
    };

    if typed {
        if !is_empty {
            skip_element(reader, start)?;
        }
        return Ok(DataOutcome::Typed);
    }

    let mut value = None;
    let mut comment = None;
    let mut problem = None;

    if !is_empty {
        loop {
            match read_event(reader)? {
                Event::Start(child) => {
                    let content = read_child_text(reader)?;
                    if let Some(reason) = content.malformed {
                        problem = Some(reason);
                    }
                    match child.name().as_ref() {
                        b"value" => value = Some(content.text),
                        b"comment" => comment = Some(content.text),
                        _ => {}
                    }
                }
                Event::Empty(child) => match child.name().as_ref() {
                    b"value" => value = Some(String::new()),
                    b"comment" => comment = Some(String::new()),
                    _ => {}
                },
                Event::End(_) => break,
                Event::Eof => return Err(unparsable(reader, "unexpected end of document")),
                _ => {}
            }
        }
    }

    let name = match name {
        Some(name) if !name.is_empty() => name,
        Some(_) => return Ok(DataOutcome::Skipped("empty name attribute".to_string())),
        None => return Ok(DataOutcome::Skipped("missing name attribute".to_string())),
    };

    if let Some(reason) = problem {
        return Ok(DataOutcome::Skipped(format!("'{}': {}", name, reason)));
    }

    Ok(DataOutcome::Entry(ResourceEntry::new(
        name,
        value.unwrap_or_default(),
        comment.unwrap_or_default(),
    )))
}

/// 将 ResX 文本解析为资源集合
///
/// # 行为
/// - 空白文档返回空集合
/// - 单个格式错误的条目不进入集合（记录警告），其原始文本原样保留，不影响其它条目
/// - 重复的键保留第一次出现的条目，后续出现的原样保留
/// - 带 type/mimetype 的 `data`、`metadata` 与 `assembly` 作为非字符串节点原样保留在原位置
/// - 值文本保持原样（不裁剪空白），仅解码 XML 实体
///
/// # 返回
/// 整个文档无法解析（XML 语法错误、根元素不是 `root`）时返回 `ResxError::Unparsable`
pub fn parse(text: &str) -> Result<ResourceSet, ResxError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut set = ResourceSet::new();

    if text.trim().is_empty() {
        return Ok(set);
    }

    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = read_event(&mut reader)?;

        match event {
            Event::Start(element) if depth == 0 => {
                if element.name().as_ref() != b"root" || seen_root {
                    return Err(ResxError::Unparsable(format!(
                        "unexpected top-level element <{}>",
                        String::from_utf8_lossy(element.name().as_ref())
                    )));
                }
                seen_root = true;
                depth = 1;
            }
            Event::Empty(element) if depth == 0 => {
                if element.name().as_ref() != b"root" || seen_root {
                    return Err(ResxError::Unparsable(format!(
                        "unexpected top-level element <{}>",
                        String::from_utf8_lossy(element.name().as_ref())
                    )));
                }
                seen_root = true;
            }
            Event::Start(element) if depth == 1 => {
                collect_child(&mut reader, &mut set, &element, false, text, offset)?;
            }
            Event::Empty(element) if depth == 1 => {
                collect_child(&mut reader, &mut set, &element, true, text, offset)?;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ResxError::Unparsable("missing <root> element".to_string()));
    }

    tracing::debug!(entries = set.len(), opaque = set.opaque().len(), "parsed resx document");
    Ok(set)
}

/// 处理 `root` 的直接子元素
///
/// 无法作为字符串资源使用的 `data`（格式错误、重复的键）与非字符串节点一样
/// 按原始文本保留，记录其前一个字符串资源，重新序列化时写回原位。
fn collect_child(
    reader: &mut Reader<&[u8]>,
    set: &mut ResourceSet,
    element: &BytesStart<'_>,
    is_empty: bool,
    source: &str,
    offset: usize,
) -> Result<(), ResxError> {
    let name = element.name();
    let kind = match name.as_ref() {
        b"data" => "data",
        b"assembly" => "assembly",
        b"metadata" => "metadata",
        // resheader 与 schema 由序列化器统一重新生成
        _ => {
            if !is_empty {
                skip_element(reader, element)?;
            }
            return Ok(());
        }
    };

    let outcome = if kind == "data" {
        Some(read_data(reader, element, is_empty)?)
    } else {
        if !is_empty {
            skip_element(reader, element)?;
        }
        None
    };

    let after = set.last_key().map(str::to_string);
    let raw = |set: &mut ResourceSet, reader: &Reader<&[u8]>| {
        let end = reader.buffer_position() as usize;
        set.push_opaque(OpaqueNode {
            element: kind.to_string(),
            name: attribute(element, b"name").ok().flatten(),
            xml: source[offset..end].to_string(),
            after: after.clone(),
        });
    };

    match outcome {
        Some(DataOutcome::Entry(entry)) => {
            let key = entry.key.clone();
            if let Err(e) = set.insert(entry) {
                tracing::warn!(key = %key, "keeping resource as raw XML: {}", e);
                raw(set, reader);
            }
        }
        Some(DataOutcome::Skipped(reason)) => {
            tracing::warn!("keeping malformed data element as raw XML: {}", reason);
            raw(set, reader);
        }
        Some(DataOutcome::Typed) | None => {
            tracing::debug!(element = kind, "keeping non-string resource as-is");
            raw(set, reader);
        }
    }

    Ok(())
}
