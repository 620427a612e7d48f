pub mod config;
pub mod designer;
pub mod editor;
pub mod grid;
pub mod io;
pub mod logging;
pub mod protocol;
pub mod resource;
pub mod resx;
pub mod utils;

// 重新导出主要结构
pub use config::{EditorConfig, LogLevel};
pub use editor::{EditorOutput, ResxEditor, Session};
pub use grid::{Column, GridState, SortDirection, SortOverlay, SortState};
pub use io::{DocumentId, FileDocument, MemoryDocument, TextDocument};
pub use protocol::{InboundMessage, Notification, NotificationLevel, OutboundMessage};
pub use resource::{OpaqueNode, ResourceEntry, ResourceSet, RowRecord};
pub use utils::ResxError;

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["resx"];
