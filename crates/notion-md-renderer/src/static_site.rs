//! Static site generation
//!
//! Queries a database, renders every matching page into the content
//! directory of a Hugo, Hexo or VuePress site, and optionally marks the pages
//! it wrote as published. Documents are processed one at a time; a document
//! that fails is logged and skipped.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use miette::{IntoDiagnostic, WrapErr};
use notion_md_common::model::Page;
use notion_md_common::{BlockSource, Config, DocumentSource, SelectFilter, ShortcodeTarget};

use crate::assets::{AssetResolver, HttpAssetResolver, public_path};
use crate::fetch::fetch_tree_with_progress;
use crate::frontmatter::{FieldMap, page_title};
use crate::template::OutputTemplate;
use crate::{RenderOptions, render_document};

/// Stripped from titles before they become filenames.
pub const AVOID_URL_CHARS: &[char] = &[
    '!', '#', '$', '&', '\'', '(', ')', '*', '+', ',', ';', '=', ':', '@', '%', '[', ']', '?', '/',
    '~', '|', '{', '}', '^', '`', '\\', '"', '<', '>',
];

#[derive(Debug, Clone, PartialEq)]
pub struct SiteOptions {
    pub database_id: String,
    pub filter: Option<SelectFilter>,
    /// Value the filter property is set to after a page is generated.
    pub published_value: Option<String>,
    pub content_dir: PathBuf,
    pub image_dir: PathBuf,
    pub image_public_link: String,
    pub page_name_prefix: String,
    pub date_prefix: bool,
    pub fields: FieldMap,
    pub shortcodes: Option<ShortcodeTarget>,
    pub template: Option<PathBuf>,
}

impl SiteOptions {
    pub fn from_config(config: &Config, database_id: impl Into<String>) -> Self {
        let notion = &config.notion;
        let markdown = &config.markdown;
        Self {
            database_id: database_id.into(),
            filter: SelectFilter::new(notion.filter_prop.as_deref(), &notion.filter_values),
            published_value: notion.published_value.clone().filter(|v| !v.is_empty()),
            content_dir: markdown.post_save_path.clone(),
            image_dir: markdown.image_save_path.clone(),
            image_public_link: markdown.image_public_link.clone(),
            page_name_prefix: markdown.page_name_prefix.clone(),
            date_prefix: markdown.date_prefix,
            fields: FieldMap {
                title: markdown.title_property.clone(),
                description: markdown.description_property.clone(),
                tags: markdown.tags_property.clone(),
                categories: markdown.categories_property.clone(),
                include_all_properties: markdown.include_all_properties,
            },
            shortcodes: markdown.shortcode_syntax,
            template: markdown.template.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteSummary {
    pub total: usize,
    pub generated: usize,
    pub failed: usize,
    pub published: usize,
}

type ResolverFactory = Box<dyn Fn(PathBuf, String) -> Box<dyn AssetResolver>>;

pub struct SiteGenerator<C> {
    source: C,
    options: SiteOptions,
    resolvers: ResolverFactory,
}

impl<C> SiteGenerator<C>
where
    C: BlockSource + DocumentSource,
{
    /// Assets are downloaded with `http` into a directory per page.
    pub fn new(source: C, options: SiteOptions, http: reqwest::blocking::Client) -> Self {
        Self {
            source,
            options,
            resolvers: Box::new(move |dir: PathBuf, prefix: String| {
                Box::new(HttpAssetResolver::new(http.clone(), dir, prefix)) as Box<dyn AssetResolver>
            }),
        }
    }

    /// Replace how per-page asset resolvers are built. Receives the page's
    /// image directory and public path prefix.
    pub fn with_resolvers(
        mut self,
        factory: impl Fn(PathBuf, String) -> Box<dyn AssetResolver> + 'static,
    ) -> Self {
        self.resolvers = Box::new(factory);
        self
    }

    pub fn options(&self) -> &SiteOptions {
        &self.options
    }

    pub fn run(&self) -> miette::Result<SiteSummary> {
        let options = &self.options;
        std::fs::create_dir_all(&options.content_dir)
            .into_diagnostic()
            .wrap_err_with(|| {
                format!("could not create content directory {}", options.content_dir.display())
            })?;

        let pages = self
            .source
            .query_documents(&options.database_id, options.filter.as_ref())
            .wrap_err("could not query the database")?;
        tracing::info!(count = pages.len(), "found documents");

        let mut summary = SiteSummary {
            total: pages.len(),
            ..Default::default()
        };
        for page in &pages {
            match self.generate(page) {
                Ok(path) => {
                    summary.generated += 1;
                    tracing::info!(page = %page.id, path = %path.display(), "generated");
                }
                Err(report) => {
                    summary.failed += 1;
                    tracing::error!(page = %page.id, error = ?report, "document failed, skipping");
                    continue;
                }
            }
            if self.publish(page) {
                summary.published += 1;
            }
        }

        tracing::info!(
            total = summary.total,
            generated = summary.generated,
            failed = summary.failed,
            published = summary.published,
            "done"
        );
        Ok(summary)
    }

    /// Fetch, render and write one page. Returns the written path.
    fn generate(&self, page: &Page) -> miette::Result<PathBuf> {
        let options = &self.options;
        let blocks = fetch_tree_with_progress(&self.source, &page.id, &mut |progress| {
            tracing::debug!(
                parent = progress.parent_id,
                pages = progress.pages,
                blocks = progress.blocks,
                "fetched children"
            );
        })
        .wrap_err("could not fetch the block tree")?;

        let title = page_title(page, options.fields.title.as_deref());
        let asset_dir = page_slug(&format!("{}{}", options.page_name_prefix, title));
        let resolver = (self.resolvers)(
            options.image_dir.join(&asset_dir),
            public_path(&options.image_public_link, &asset_dir),
        );

        let template = options
            .template
            .as_deref()
            .map(OutputTemplate::from_file)
            .transpose()?;
        let rendered = render_document(
            page,
            &blocks,
            &RenderOptions {
                fields: &options.fields,
                shortcodes: options.shortcodes,
                template: template.as_ref(),
            },
            resolver.as_ref(),
        )?;
        if !rendered.report.is_clean() {
            tracing::info!(
                page = %page.id,
                unsupported = rendered.report.unsupported,
                unimplemented = ?rendered.report.unimplemented,
                asset_failures = rendered.report.asset_failures,
                "rendered with omissions"
            );
        }

        let path = options
            .content_dir
            .join(document_filename(&title, &page.created_time, options.date_prefix));
        write_document(&path, &rendered.to_markdown())?;
        Ok(path)
    }

    /// Set the filter property to the published value. Returns whether the
    /// page was changed.
    fn publish(&self, page: &Page) -> bool {
        let (Some(filter), Some(value)) = (&self.options.filter, &self.options.published_value)
        else {
            return false;
        };
        let current = page.property(&filter.property).and_then(|p| p.select_name());
        if current == Some(value.as_str()) {
            return false;
        }
        match self.source.update_select(&page.id, &filter.property, value) {
            Ok(()) => {
                tracing::info!(page = %page.id, property = %filter.property, %value, "published");
                true
            }
            Err(err) => {
                tracing::warn!(page = %page.id, error = %err, "could not update publish status");
                false
            }
        }
    }
}

fn write_document(path: &Path, contents: &str) -> miette::Result<()> {
    std::fs::write(path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not write {}", path.display()))
}

/// Lower-cased title with whitespace turned into `-` and URL-hostile or
/// control characters removed.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_whitespace() {
            normalized.push('-');
        } else if c.is_control() || AVOID_URL_CHARS.contains(&c) {
            continue;
        } else {
            normalized.extend(c.to_lowercase());
        }
    }
    normalized
}

/// [`normalize_title`] made safe as a single path component: no leading
/// dots, never empty.
pub fn page_slug(title: &str) -> String {
    let slug = normalize_title(title);
    match slug.trim_start_matches('.') {
        "" => "untitled".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

pub fn document_filename(title: &str, created: &DateTime<Utc>, date_prefix: bool) -> String {
    let name = page_slug(title);
    if date_prefix {
        format!("{}-{name}.md", created.format("%Y-%m-%d"))
    } else {
        format!("{name}.md")
    }
}

#[cfg(test)]
mod tests;
