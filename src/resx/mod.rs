//! ResX 格式编解码模块
//!
//! - **parser**: 文本 → [`ResourceSet`](crate::resource::ResourceSet)
//! - **writer**: [`ResourceSet`](crate::resource::ResourceSet) → 文本，保证未修改条目逐字节稳定
//! - **template**: 固定的说明注释、schema 与 resheader

mod parser;
mod template;
mod writer;


pub use parser::parse;
pub use template::RESHEADERS;
pub use writer::{write, write_default, LineEnding, WriteOptions};

/// 解析后立即按原文的换行风格重新序列化
///
/// 用于格式化文件以及检查文档是否已是规范形式。
pub fn normalize(text: &str) -> Result<String, crate::utils::ResxError> {
    let set = parse(text)?;
    Ok(write(&set, &WriteOptions::detect(text)))
}

/// 文档是否已是规范形式（重新序列化后内容不变）
pub fn is_canonical(text: &str) -> bool {
    matches!(normalize(text), Ok(normalized) if normalized == text)
}
