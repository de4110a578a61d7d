//! Error types shared by the client and the configuration loader.

use miette::Diagnostic;

/// Failure talking to the Notion API.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum NotionError {
    /// Transport-level failure: DNS, TLS, connection reset, body read.
    #[error("request to notion failed")]
    #[diagnostic(code(notion_md::notion::http))]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("notion api returned {status} ({code}): {message}")]
    #[diagnostic(
        code(notion_md::notion::api),
        help("check that the integration token is valid and the database is shared with it")
    )]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response shape from notion")]
    #[diagnostic(code(notion_md::notion::json))]
    Json(#[from] serde_json::Error),
}

/// Failure loading the KDL configuration file.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    #[diagnostic(
        code(notion_md::config::io),
        help("run `notion-md init` to write a default config")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kdl(#[from] kdl::KdlError),

    #[error("`{key}` has the wrong type, expected {expected}")]
    #[diagnostic(code(notion_md::config::value))]
    Value { key: String, expected: &'static str },

    #[error("missing required setting `{0}`")]
    #[diagnostic(
        code(notion_md::config::missing),
        help("set it in the config file, via its flag, or via the environment")
    )]
    Missing(&'static str),

    #[error("unknown shortcode syntax `{0}`")]
    #[diagnostic(
        code(notion_md::config::shortcode),
        help("expected one of: hugo, hexo, vuepress")
    )]
    UnknownShortcode(String),
}
