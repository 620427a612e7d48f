//! 编辑器配置
//!
//! 对应宿主设置中的 `resx-editor.*` 选项，从 JSON 文件加载。
//! 既接受 `enableColumnSorting` 这样的普通键，也接受 settings.json 风格的
//! `resx-editor.enableColumnSorting` 前缀键。

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::ResxError;

const SETTINGS_PREFIX: &str = "resx-editor.";

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
}

impl LogLevel {
    /// 对应的 tracing 过滤指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Verbose => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "verbose" | "debug" | "trace" => Ok(LogLevel::Verbose),
            other => Err(format!("unknown logging level '{}'", other)),
        }
    }
}

/// 编辑器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// 是否允许点击表头排序
    pub enable_column_sorting: bool,
    /// 保存后是否生成 Designer.cs
    pub generate_code: bool,
    /// 日志级别
    pub logging_level: LogLevel,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            enable_column_sorting: true,
            generate_code: false,
            logging_level: LogLevel::Info,
        }
    }
}

impl EditorConfig {
    /// 从 JSON 文本解析配置，未知键被忽略
    pub fn from_json(text: &str) -> Result<Self, ResxError> {
        let value: Value = serde_json::from_str(text)?;

        let Value::Object(map) = value else {
            return Err(ResxError::InvalidConfig(
                "configuration must be a JSON object".to_string(),
            ));
        };

        let normalized: Map<String, Value> = map
            .into_iter()
            .map(|(key, value)| match key.strip_prefix(SETTINGS_PREFIX) {
                Some(stripped) => (stripped.to_string(), value),
                None => (key, value),
            })
            .collect();

        Ok(serde_json::from_value(Value::Object(normalized))?)
    }

    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self, ResxError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// 文件存在时加载，否则使用默认配置
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ResxError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert!(config.enable_column_sorting);
        assert!(!config.generate_code);
    }

    #[test]
    fn test_plain_keys() {
        let config = EditorConfig::from_json(
            r#"{"enableColumnSorting": false, "generateCode": true, "loggingLevel": "verbose"}"#,
        )
        .unwrap();
        assert!(!config.enable_column_sorting);
        assert!(config.generate_code);
        assert_eq!(config.logging_level, LogLevel::Verbose);
    }

    #[test]
    fn test_prefixed_keys_and_unknown_keys() {
        let config = EditorConfig::from_json(
            r#"{"resx-editor.generateCode": true, "editor.fontSize": 14}"#,
        )
        .unwrap();
        assert!(config.generate_code);
        assert!(config.enable_column_sorting);
    }

    #[test]
    fn test_invalid_config() {
        assert!(EditorConfig::from_json("[]").is_err());
        assert!(EditorConfig::from_json(r#"{"loggingLevel": "loud"}"#).is_err());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("verbose".parse::<LogLevel>().unwrap().as_filter(), "trace");
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_load_or_default_missing() {
        let config = EditorConfig::load_or_default(Some(Path::new("no/such/settings.json"))).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
