//! User-supplied output templates.
//!
//! A template receives the rendered body as `content`, each front matter key
//! at the top level, and the whole front matter again as `frontmatter`.
//! Nothing is HTML-escaped: the output is Markdown.

use std::path::{Path, PathBuf};

use handlebars::{Handlebars, handlebars_helper, no_escape};
use miette::Diagnostic;
use serde_json::Value;

use crate::frontmatter::FrontMatter;

const TEMPLATE_NAME: &str = "document";

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum TemplateError {
    #[error("could not read template {}", path.display())]
    #[diagnostic(code(notion_md::template::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid output template")]
    #[diagnostic(
        code(notion_md::template::parse),
        help("templates use handlebars syntax, e.g. {{{{title}}}} and {{{{content}}}}")
    )]
    Parse(#[from] handlebars::TemplateError),

    #[error("output template failed to render")]
    #[diagnostic(code(notion_md::template::render))]
    Render(#[from] handlebars::RenderError),
}

/// Upper bound on `{{repeat}}` counts.
const MAX_REPEAT: u64 = 1024;

handlebars_helper!(add: |a: i64, b: i64| a.saturating_add(b));
handlebars_helper!(sub: |a: i64, b: i64| a.saturating_sub(b));
handlebars_helper!(mul: |a: i64, b: i64| a.saturating_mul(b));
handlebars_helper!(div: |a: i64, b: i64| if b == 0 { 0 } else { a.saturating_div(b) });
handlebars_helper!(repeat: |s: str, n: u64| s.repeat(n.min(MAX_REPEAT) as usize));

pub struct OutputTemplate {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for OutputTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTemplate").finish_non_exhaustive()
    }
}

impl OutputTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.register_helper("add", Box::new(add));
        registry.register_helper("sub", Box::new(sub));
        registry.register_helper("mul", Box::new(mul));
        registry.register_helper("div", Box::new(div));
        registry.register_helper("repeat", Box::new(repeat));
        registry.register_template_string(TEMPLATE_NAME, source)?;
        Ok(Self { registry })
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn render(&self, front_matter: &FrontMatter, content: &str) -> Result<String, TemplateError> {
        let mut data = front_matter.to_json();
        data.insert("frontmatter".into(), Value::Object(front_matter.to_json()));
        data.insert("content".into(), Value::String(content.to_owned()));
        Ok(self.registry.render(TEMPLATE_NAME, &Value::Object(data))?)
    }
}
