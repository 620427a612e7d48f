//! 基于文件系统的文档实现

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use super::traits::{DocumentId, TextDocument};
use crate::utils::ResxError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 将文件字节解码为文本
///
/// 按 BOM 识别编码（UTF-8 / UTF-16LE / UTF-16BE），没有 BOM 时按 UTF-8 解码。
pub fn decode_bytes(bytes: &[u8]) -> String {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);

    if had_errors {
        tracing::warn!(encoding = encoding.name(), "document contains invalid byte sequences");
    }

    text.into_owned()
}

/// 文件文档
///
/// 写入时以 UTF-8 输出；原文件带 BOM 时保留 BOM。
#[derive(Debug, Clone)]
pub struct FileDocument {
    id: DocumentId,
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: DocumentId::from_path(&path),
            path,
        }
    }

    fn has_bom(&self) -> bool {
        fs::read(&self.path)
            .map(|bytes| Encoding::for_bom(&bytes).is_some())
            .unwrap_or(false)
    }
}

impl TextDocument for FileDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn get_text(&self) -> Result<String, ResxError> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        let bytes = fs::read(&self.path)?;
        Ok(decode_bytes(&bytes))
    }

    fn apply_edit(&mut self, text: &str) -> Result<bool, ResxError> {
        // 确保父目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if self.has_bom() {
            bytes.extend_from_slice(UTF8_BOM);
        }
        bytes.extend_from_slice(text.as_bytes());

        fs::write(&self.path, bytes)?;
        Ok(true)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
