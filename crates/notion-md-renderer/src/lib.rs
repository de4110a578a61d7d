//! notion-md renderer
//!
//! Turns a Notion page and its block tree into a Markdown document with a
//! YAML front matter preamble, and drives that over a whole database in
//! [`static_site`].

use miette::Diagnostic;
use notion_md_common::ShortcodeTarget;
use notion_md_common::model::{Block, Page};

pub mod assets;
pub mod fetch;
pub mod frontmatter;
pub mod markdown;
pub mod rich_text;
pub mod static_site;
pub mod template;

pub use assets::{AssetError, AssetResolver, HttpAssetResolver, LinkPreview};
pub use fetch::{FetchProgress, fetch_tree, fetch_tree_with_progress};
pub use frontmatter::{FieldMap, FrontMatter, FrontMatterError, FrontMatterValue, extract_front_matter};
pub use markdown::{MarkdownRenderer, RenderReport};
pub use rich_text::render_rich_text;
pub use static_site::{SiteGenerator, SiteOptions, SiteSummary};
pub use template::{OutputTemplate, TemplateError};

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum RenderError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub fields: &'a FieldMap,
    pub shortcodes: Option<ShortcodeTarget>,
    pub template: Option<&'a OutputTemplate>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub front_matter: FrontMatter,
    /// The serialized preamble, empty when there is no front matter.
    pub preamble: String,
    /// Rendered blocks, or the template output when one is configured.
    pub body: String,
    pub report: RenderReport,
}

impl RenderedDocument {
    pub fn to_markdown(&self) -> String {
        format!("{}{}", self.preamble, self.body)
    }
}

/// Render one page. Asset and preview failures degrade the output and are
/// counted in the report; only serialization and templating fail the call.
pub fn render_document(
    page: &Page,
    blocks: &[Block],
    options: &RenderOptions<'_>,
    resolver: &dyn AssetResolver,
) -> Result<RenderedDocument, RenderError> {
    let front_matter = extract_front_matter(page, options.fields, Some(resolver));
    let preamble = front_matter.to_yaml_block()?;

    let mut renderer = MarkdownRenderer::new(resolver).with_shortcodes(options.shortcodes);
    let content = renderer.render(blocks);
    let body = match options.template {
        Some(template) => template.render(&front_matter, &content)?,
        None => content,
    };

    Ok(RenderedDocument {
        front_matter,
        preamble,
        body,
        report: renderer.into_report(),
    })
}
