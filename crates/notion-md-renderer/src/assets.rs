//! Remote asset download and link preview metadata.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use miette::Diagnostic;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use url::Url;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AssetError {
    #[error("invalid asset url `{url}`")]
    #[diagnostic(code(notion_md::asset::url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("asset url `{0}` has no file name")]
    #[diagnostic(code(notion_md::asset::filename))]
    NoFilename(String),

    #[error("fetching `{url}` failed")]
    #[diagnostic(code(notion_md::asset::http))]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching `{url}` returned status {status}")]
    #[diagnostic(code(notion_md::asset::status))]
    Status { url: String, status: u16 },

    #[error("writing asset to {}", path.display())]
    #[diagnostic(code(notion_md::asset::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bookmark metadata scraped from a page's `<head>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
}

/// Side channel the renderer uses for images, covers and bookmarks.
pub trait AssetResolver {
    /// Download `url` and return the path to reference it by in the output.
    fn resolve(&self, url: &str) -> Result<String, AssetError>;

    fn link_preview(&self, url: &str) -> Result<LinkPreview, AssetError>;
}

/// Downloads into `save_dir`, referencing files as `{public_prefix}/{name}`.
pub struct HttpAssetResolver {
    client: Client,
    save_dir: PathBuf,
    public_prefix: String,
}

impl HttpAssetResolver {
    pub fn new(client: Client, save_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            client,
            save_dir: save_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, AssetError> {
        let response = self.client.get(url).send().map_err(|source| AssetError::Http {
            url: url.to_owned(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl AssetResolver for HttpAssetResolver {
    fn resolve(&self, url: &str) -> Result<String, AssetError> {
        let parsed = parse_url(url)?;
        let filename = derive_filename(&parsed)?;

        let body = self
            .get(url)?
            .bytes()
            .map_err(|source| AssetError::Http {
                url: url.to_owned(),
                source,
            })?;

        std::fs::create_dir_all(&self.save_dir).map_err(|source| AssetError::Io {
            path: self.save_dir.clone(),
            source,
        })?;
        let dest = self.save_dir.join(&filename);
        std::fs::write(&dest, &body).map_err(|source| AssetError::Io { path: dest.clone(), source })?;

        tracing::debug!(url, path = %dest.display(), bytes = body.len(), "downloaded asset");
        Ok(public_path(&self.public_prefix, &filename))
    }

    fn link_preview(&self, url: &str) -> Result<LinkPreview, AssetError> {
        let base = parse_url(url)?;
        let html = self.get(url)?.text().map_err(|source| AssetError::Http {
            url: url.to_owned(),
            source,
        })?;
        Ok(parse_link_preview(&html, &base))
    }
}

fn parse_url(url: &str) -> Result<Url, AssetError> {
    Url::parse(url).map_err(|source| AssetError::InvalidUrl {
        url: url.to_owned(),
        source,
    })
}

/// Escapes one URL path segment.
pub(crate) const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `{prefix}/{segment}` with `segment` percent-encoded. The prefix is taken
/// as already encoded.
pub fn public_path(prefix: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        utf8_percent_encode(segment, PATH_SEGMENT)
    )
}

/// Local file name for a remote asset: `{host}_{last path segment}`.
///
/// Notion names pasted images `Untitled.png` under a per-upload directory, so
/// for those the parent segment stands in for the name and only the
/// extension is kept.
pub fn derive_filename(url: &Url) -> Result<String, AssetError> {
    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let Some(last) = segments.last() else {
        return Err(AssetError::NoFilename(url.to_string()));
    };

    let name = match segments.len().checked_sub(2).map(|i| &segments[i]) {
        Some(parent) if last.starts_with("Untitled.") => {
            match Path::new(last).extension().and_then(|ext| ext.to_str()) {
                Some(ext) => format!("{parent}.{ext}"),
                None => parent.clone(),
            }
        }
        _ => last.clone(),
    };

    Ok(format!("{}_{}", url.host_str().unwrap_or_default(), name))
}

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[content]").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// Pull Open Graph fields out of an HTML document, falling back to
/// `<title>` and `<meta name="description">`. Missing fields stay empty.
pub fn parse_link_preview(html: &str, base: &Url) -> LinkPreview {
    let document = Html::parse_document(html);
    let mut og_title = None;
    let mut og_description = None;
    let mut og_image = None;
    let mut description = None;

    for meta in document.select(&META) {
        let element = meta.value();
        let Some(key) = element.attr("property").or_else(|| element.attr("name")) else {
            continue;
        };
        let content = element.attr("content").unwrap_or_default().trim().to_owned();
        match key.to_ascii_lowercase().as_str() {
            "og:title" => og_title = og_title.or(Some(content)),
            "og:description" => og_description = og_description.or(Some(content)),
            "og:image" | "og:image:url" if !content.is_empty() => {
                og_image = og_image.or(Some(content))
            }
            "description" => description = description.or(Some(content)),
            _ => {}
        }
    }

    let title = og_title
        .or_else(|| {
            document
                .select(&TITLE)
                .next()
                .map(|title| title.text().collect::<String>().trim().to_owned())
        })
        .unwrap_or_default();

    let image = og_image
        .map(|image| match base.join(&image) {
            Ok(absolute) => absolute.to_string(),
            Err(_) => image,
        })
        .unwrap_or_default();

    LinkPreview {
        url: base.to_string(),
        title,
        description: og_description.or(description).unwrap_or_default(),
        image,
    }
}
