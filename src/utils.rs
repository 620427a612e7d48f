use thiserror::Error;
use std::path::Path;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum ResxError {
    #[error("Could not parse resource content: {0}")]
    Unparsable(String),

    #[error("A resource with the key '{0}' already exists")]
    DuplicateKey(String),

    #[error("No resource with the key '{0}'")]
    KeyNotFound(String),

    #[error("Invalid resource key: {0}")]
    InvalidKey(String),

    #[error("No resource selected")]
    NothingSelected,

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Failed to apply the edit to the document")]
    WriteFailed,

    #[error("Invalid transport payload: {0}")]
    InvalidTransport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 资源键验证：非空且不包含控制字符
pub fn validate_key(key: &str) -> Result<(), ResxError> {
    if key.is_empty() {
        return Err(ResxError::InvalidKey("key must not be empty".to_string()));
    }

    if key.chars().any(|c| c.is_control()) {
        return Err(ResxError::InvalidKey(format!(
            "'{}' contains control characters",
            key.escape_debug()
        )));
    }

    Ok(())
}

/// 检查是否为合法的 C# 标识符
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// 将资源键转换为合法的 C# 标识符（仅用于属性名）
pub fn to_identifier(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| if c == '_' || c.is_alphanumeric() { c } else { '_' })
        .collect();

    if out.is_empty() || out.starts_with(|c: char| c.is_numeric()) {
        out.insert(0, '_');
    }

    out
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<std::path::PathBuf, ResxError> {
    if !file_path.exists() {
        return Err(ResxError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(ResxError::IoError)?;

    Ok(backup_path)
}
