//! 日志初始化
//!
//! 日志输出到 stderr（stdout 在 `--serve` 模式下用于传输消息）。
//! `RUST_LOG` 环境变量优先于配置中的日志级别：
//! - `RUST_LOG=debug` - 所有调试日志
//! - `RUST_LOG=resx_editor::grid=trace` - 模块级过滤

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogLevel;

/// 初始化 tracing 订阅者
///
/// 重复调用时保持第一次的设置。
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    if tracing_subscriber::registry().with(console_layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
