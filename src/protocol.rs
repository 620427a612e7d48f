//! 传输协议模块
//!
//! 文档侧与表格侧之间交换的 JSON 消息，按 `type` 字段区分。
//! 新增消息类型时由编译器检查所有 `match` 是否覆盖完整。

use serde::{Deserialize, Serialize};

use crate::utils::ResxError;

/// 表格 → 文档 的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    /// 回写：整个行缓存的传输 JSON
    Update { json: String },
}

/// 文档 → 表格 的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// 完整替换：文档当前内容的传输 JSON
    Update { text: String },
    /// 追加新资源
    Add {
        key: String,
        value: String,
        #[serde(default)]
        comment: String,
    },
    /// 删除当前选中的行
    Delete,
    /// 配置变更
    Config {
        #[serde(rename = "enableColumnSorting")]
        enable_column_sorting: bool,
    },
}

impl InboundMessage {
    pub fn from_json(json: &str) -> Result<Self, ResxError> {
        serde_json::from_str(json).map_err(|e| ResxError::InvalidTransport(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ResxError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl OutboundMessage {
    pub fn from_json(json: &str) -> Result<Self, ResxError> {
        serde_json::from_str(json).map_err(|e| ResxError::InvalidTransport(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ResxError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// 面向用户的通知
///
/// 所有内部错误在到达用户之前都转换为通知，原始错误只写入日志。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// 将内部错误转换为用户可见的通知
    pub fn from_error(err: &ResxError) -> Self {
        match err {
            ResxError::Unparsable(_) => Notification::error("Could not parse resource content."),
            ResxError::DuplicateKey(key) => {
                Notification::error(format!("A resource with the key '{}' already exists.", key))
            }
            ResxError::KeyNotFound(key) => {
                Notification::error(format!("No resource with the key '{}' exists.", key))
            }
            ResxError::InvalidKey(reason) => {
                Notification::error(format!("Invalid resource key: {}.", reason))
            }
            ResxError::NothingSelected => {
                Notification::info("No resource selected. Select a row to delete it.")
            }
            ResxError::RowOutOfRange(_) => {
                Notification::error("The edited row no longer exists.")
            }
            ResxError::WriteFailed => Notification::error("Failed to save changes to the document."),
            ResxError::InvalidConfig(reason) => {
                Notification::error(format!("Invalid configuration: {}.", reason))
            }
            ResxError::InvalidTransport(_)
            | ResxError::IoError(_)
            | ResxError::JsonError(_) => {
                Notification::error("An unexpected error occurred. See the output log for details.")
            }
        }
    }
}

impl From<&ResxError> for Notification {
    fn from(err: &ResxError) -> Self {
        Notification::from_error(err)
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            NotificationLevel::Info => write!(f, "[info] {}", self.message),
            NotificationLevel::Error => write!(f, "[error] {}", self.message),
        }
    }
}
