//! KDL configuration file.
//!
//! ```kdl
//! notion {
//!     filter-prop "Status"
//!     filter-value "Finished" "Published"
//!     published-value "Published"
//! }
//! markdown {
//!     shortcode-syntax "hugo"
//!     post-save-path "content/posts"
//! }
//! ```
//!
//! The API token never lives in this file. It comes from `NOTION_SECRET`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kdl::{KdlDocument, KdlNode};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "notion-md.kdl";

/// Written by `notion-md init`.
pub const DEFAULT_CONFIG: &str = r#"// notion-md configuration.
// NOTION_SECRET and DATABASE_ID are read from the environment.
notion {
    // database-id "0123456789abcdef0123456789abcdef"
    filter-prop "Status"
    filter-value "Finished" "Published"
    published-value "Published"
}

markdown {
    // hugo, hexo or vuepress. Remove to render plain markdown only.
    shortcode-syntax "hugo"
    post-save-path "content/posts"
    image-save-path "static/images/notion"
    image-public-link "/images/notion"
    date-prefix #false
    // template "templates/post.md.hbs"
    page-name-prefix ""
    title-property "Name"
    description-property "Description"
    tags-property "Tags"
    categories-property "Categories"
    include-all-properties #false
}
"#;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub notion: NotionConfig,
    pub markdown: MarkdownConfig,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotionConfig {
    pub database_id: Option<String>,
    /// Select property the database query filters on.
    pub filter_prop: Option<String>,
    pub filter_values: Vec<String>,
    /// Value `filter_prop` is set to once a page has been generated.
    pub published_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownConfig {
    pub shortcode_syntax: Option<ShortcodeTarget>,
    pub post_save_path: PathBuf,
    pub image_save_path: PathBuf,
    pub image_public_link: String,
    pub date_prefix: bool,
    pub template: Option<PathBuf>,
    pub page_name_prefix: String,
    pub title_property: Option<String>,
    pub description_property: Option<String>,
    pub tags_property: Option<String>,
    pub categories_property: Option<String>,
    pub include_all_properties: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            shortcode_syntax: None,
            post_save_path: PathBuf::from("content/posts"),
            image_save_path: PathBuf::from("static/images/notion"),
            image_public_link: "/images/notion".to_owned(),
            date_prefix: false,
            template: None,
            page_name_prefix: String::new(),
            title_property: None,
            description_property: None,
            tags_property: None,
            categories_property: None,
            include_all_properties: false,
        }
    }
}

/// Static site generator whose shortcode dialect extended blocks render in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcodeTarget {
    Hugo,
    Hexo,
    Vuepress,
}

impl FromStr for ShortcodeTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hugo" => Ok(ShortcodeTarget::Hugo),
            "hexo" => Ok(ShortcodeTarget::Hexo),
            "vuepress" => Ok(ShortcodeTarget::Vuepress),
            _ => Err(ConfigError::UnknownShortcode(s.to_owned())),
        }
    }
}

impl fmt::Display for ShortcodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShortcodeTarget::Hugo => "hugo",
            ShortcodeTarget::Hexo => "hexo",
            ShortcodeTarget::Vuepress => "vuepress",
        })
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Write [`DEFAULT_CONFIG`] to `path`. An existing file is left alone and
    /// reported as an error.
    pub fn write_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        use std::io::Write;

        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(DEFAULT_CONFIG.as_bytes()).map_err(io_err)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let doc: KdlDocument = text.parse()?;
        let mut config = Config::default();

        if let Some(notion) = section(&doc, "notion") {
            config.notion = NotionConfig {
                database_id: string(notion, "database-id")?,
                filter_prop: string(notion, "filter-prop")?,
                filter_values: strings(notion, "filter-value")?,
                published_value: string(notion, "published-value")?,
            };
        }

        if let Some(md) = section(&doc, "markdown") {
            let defaults = MarkdownConfig::default();
            config.markdown = MarkdownConfig {
                shortcode_syntax: string(md, "shortcode-syntax")?
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse())
                    .transpose()?,
                post_save_path: string(md, "post-save-path")?
                    .map(PathBuf::from)
                    .unwrap_or(defaults.post_save_path),
                image_save_path: string(md, "image-save-path")?
                    .map(PathBuf::from)
                    .unwrap_or(defaults.image_save_path),
                image_public_link: string(md, "image-public-link")?
                    .unwrap_or(defaults.image_public_link),
                date_prefix: boolean(md, "date-prefix")?.unwrap_or(false),
                template: string(md, "template")?.map(PathBuf::from),
                page_name_prefix: string(md, "page-name-prefix")?.unwrap_or_default(),
                title_property: string(md, "title-property")?,
                description_property: string(md, "description-property")?,
                tags_property: string(md, "tags-property")?,
                categories_property: string(md, "categories-property")?,
                include_all_properties: boolean(md, "include-all-properties")?
                    .unwrap_or(false),
            };
        }

        Ok(config)
    }
}

fn section<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlDocument> {
    doc.get(name).and_then(KdlNode::children)
}

fn string(doc: &KdlDocument, key: &str) -> Result<Option<String>, ConfigError> {
    let Some(entry) = doc.get(key).and_then(|node| node.entries().first()) else {
        return Ok(None);
    };
    entry
        .value()
        .as_string()
        .map(|s| Some(s.to_owned()))
        .ok_or_else(|| ConfigError::Value {
            key: key.to_owned(),
            expected: "a string",
        })
}

fn strings(doc: &KdlDocument, key: &str) -> Result<Vec<String>, ConfigError> {
    let Some(node) = doc.get(key) else {
        return Ok(Vec::new());
    };
    node.entries()
        .iter()
        .map(|entry| {
            entry
                .value()
                .as_string()
                .map(str::to_owned)
                .ok_or_else(|| ConfigError::Value {
                    key: key.to_owned(),
                    expected: "a list of strings",
                })
        })
        .collect()
}

fn boolean(doc: &KdlDocument, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(entry) = doc.get(key).and_then(|node| node.entries().first()) else {
        return Ok(None);
    };
    entry
        .value()
        .as_bool()
        .map(Some)
        .ok_or_else(|| ConfigError::Value {
            key: key.to_owned(),
            expected: "#true or #false",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config: Config = DEFAULT_CONFIG.parse().unwrap();
        assert_eq!(config.notion.database_id, None);
        assert_eq!(config.notion.filter_prop.as_deref(), Some("Status"));
        assert_eq!(config.notion.filter_values, vec!["Finished", "Published"]);
        assert_eq!(config.notion.published_value.as_deref(), Some("Published"));
        assert_eq!(
            config.markdown.shortcode_syntax,
            Some(ShortcodeTarget::Hugo)
        );
        assert_eq!(config.markdown.title_property.as_deref(), Some("Name"));
        assert!(!config.markdown.date_prefix);
        assert_eq!(config.markdown.template, None);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn shortcode_syntax_is_case_insensitive() {
        let config: Config = r#"markdown { shortcode-syntax "VuePress"; }"#.parse().unwrap();
        assert_eq!(
            config.markdown.shortcode_syntax,
            Some(ShortcodeTarget::Vuepress)
        );
    }

    #[test]
    fn unknown_shortcode_syntax_is_rejected() {
        let err = r#"markdown { shortcode-syntax "jekyll"; }"#
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownShortcode(s) if s == "jekyll"));
    }

    #[test]
    fn booleans_use_kdl_keywords() {
        let config: Config = "markdown {\n    date-prefix #true\n    include-all-properties #true\n}"
            .parse()
            .unwrap();
        assert!(config.markdown.date_prefix);
        assert!(config.markdown.include_all_properties);
    }

    #[test]
    fn parse_errors_carry_a_diagnostic() {
        use miette::Diagnostic;

        let err = "notion {".parse::<Config>().unwrap_err();
        assert!(err.labels().is_some() || err.related().is_some());
    }

    #[test]
    fn wrong_value_type_is_reported() {
        let err = r#"markdown { date-prefix "yes"; }"#.parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Value { key, .. } if key == "date-prefix"));
    }

    #[test]
    fn invalid_kdl_is_a_parse_error() {
        let err = "notion {".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Kdl(_)));
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_PATH);
        Config::write_default(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        let err = Config::write_default(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.markdown.post_save_path, PathBuf::from("content/posts"));
    }
}
