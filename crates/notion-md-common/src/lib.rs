//! Notion API model, client and configuration shared by the renderer and
//! the `notion-md` binary.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod telemetry;

pub use crate::client::NotionClient;
pub use crate::config::{Config, ShortcodeTarget};
pub use crate::error::{ConfigError, NotionError};
pub use crate::source::{BlockSource, DocumentSource, Paginated, SelectFilter};
