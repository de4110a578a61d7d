//! Block tree to Markdown.
//!
//! One rule per block type. Every emitted line carries the prefixes pushed by
//! enclosing quotes and list items; blank lines carry the same prefix with
//! trailing whitespace removed so a quote is not broken by them.

mod shortcode;
mod state;

use std::collections::BTreeMap;

use notion_md_common::ShortcodeTarget;
use notion_md_common::model::{
    Block, BlockKind, Bookmark, Callout, Code, Image, RichText, Table, TableRow, ToDo, plain_text,
};

pub use self::shortcode::Shortcodes;
pub use self::state::{ListKind, RenderState};
use crate::assets::{AssetResolver, LinkPreview};
use crate::rich_text::render_rich_text;

const LIST_INDENT: &str = "    ";
const QUOTE_PREFIX: &str = "> ";

/// What the renderer skipped or degraded on, for the per-document log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Blocks the API itself reports as unsupported.
    pub unsupported: usize,
    /// Known block types without a rendering rule, by type tag.
    pub unimplemented: BTreeMap<String, usize>,
    /// Images and bookmarks whose asset or preview could not be fetched.
    pub asset_failures: usize,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.unsupported == 0 && self.unimplemented.is_empty() && self.asset_failures == 0
    }
}

pub struct MarkdownRenderer<'a, R: AssetResolver + ?Sized> {
    resolver: &'a R,
    shortcodes: Option<ShortcodeTarget>,
    report: RenderReport,
}

impl<'a, R: AssetResolver + ?Sized> MarkdownRenderer<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            shortcodes: None,
            report: RenderReport::default(),
        }
    }

    /// Render callouts and bookmarks as shortcodes of `target`. `None` keeps
    /// their plain Markdown fallback.
    pub fn with_shortcodes(mut self, target: Option<ShortcodeTarget>) -> Self {
        self.shortcodes = target;
        self
    }

    pub fn report(&self) -> &RenderReport {
        &self.report
    }

    pub fn into_report(self) -> RenderReport {
        self.report
    }

    pub fn render(&mut self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut state = RenderState::new(self.shortcodes);
        self.render_blocks(&mut out, blocks, &mut state);
        out
    }

    /// Render one sibling list, tracking list runs across it.
    pub fn render_blocks(&mut self, out: &mut String, blocks: &[Block], state: &mut RenderState) {
        for block in blocks {
            if renders_nothing(block) {
                self.render_one(out, block, state);
                continue;
            }
            if state.advance(block.block_type()) {
                blank(out, state);
            }
            self.render_one(out, block, state);
        }
    }

    pub fn render_one(&mut self, out: &mut String, block: &Block, state: &RenderState) {
        match &block.kind {
            BlockKind::Paragraph(p) => {
                line(out, state, &render_rich_text(&p.rich_text));
                blank(out, state);
                self.render_children(out, block, state, None);
            }
            BlockKind::Heading1(h) => heading(out, state, "#", &h.rich_text),
            BlockKind::Heading2(h) => heading(out, state, "##", &h.rich_text),
            BlockKind::Heading3(h) => heading(out, state, "###", &h.rich_text),
            BlockKind::Quote(q) => {
                let inner = state.child(Some(QUOTE_PREFIX));
                line(out, &inner, &render_rich_text(&q.rich_text));
                if !block.children().is_empty() {
                    blank(out, &inner);
                    self.render_nested(out, block.children(), inner);
                }
                blank(out, state);
            }
            BlockKind::BulletedListItem(item) => {
                line(out, state, &format!("- {}", render_rich_text(&item.rich_text)));
                self.render_children(out, block, state, Some(LIST_INDENT));
            }
            BlockKind::NumberedListItem(item) => {
                let marker = state.run() + 1;
                line(out, state, &format!("{marker}. {}", render_rich_text(&item.rich_text)));
                self.render_children(out, block, state, Some(LIST_INDENT));
            }
            BlockKind::ToDo(todo) => self.to_do(out, block, todo, state),
            BlockKind::Toggle(t) | BlockKind::Template(t) => {
                line(out, state, &render_rich_text(&t.rich_text));
                blank(out, state);
                self.render_children(out, block, state, None);
            }
            BlockKind::Code(code) => self.code(out, block, code, state),
            BlockKind::Image(image) => self.image(out, image, state),
            BlockKind::Bookmark(bookmark) => self.bookmark(out, bookmark, state),
            BlockKind::Callout(callout) => self.callout(out, block, callout, state),
            BlockKind::Table(table) => self.table(out, block, table, state),
            BlockKind::TableRow(_) => {
                tracing::debug!(block = %block.id, "table row outside of a table, skipping");
            }
            BlockKind::Divider => {
                line(out, state, "---");
                blank(out, state);
            }
            BlockKind::ColumnList | BlockKind::Column | BlockKind::SyncedBlock => {
                self.render_children(out, block, state, None);
            }
            BlockKind::Unsupported => {
                tracing::info!(block = %block.id, "unsupported block, skipping");
                self.report.unsupported += 1;
            }
            BlockKind::Unimplemented(tag) => {
                tracing::info!(block = %block.id, kind = %tag, "unimplemented block, skipping");
                *self.report.unimplemented.entry(tag.clone()).or_default() += 1;
            }
        }
    }

    /// Children one level deeper. Without a pushed prefix they sit at the
    /// parent's indentation, so a list they end on is closed here.
    fn render_children(
        &mut self,
        out: &mut String,
        block: &Block,
        state: &RenderState,
        prefix: Option<&'static str>,
    ) {
        if block.children().is_empty() {
            return;
        }
        let mut child = state.child(prefix);
        match prefix {
            Some(_) => self.render_blocks(out, block.children(), &mut child),
            None => self.render_nested(out, block.children(), child),
        }
    }

    fn render_nested(&mut self, out: &mut String, blocks: &[Block], mut state: RenderState) {
        self.render_blocks(out, blocks, &mut state);
        if state.list_kind() != ListKind::None {
            blank(out, &state);
        }
    }

    fn to_do(&mut self, out: &mut String, block: &Block, todo: &ToDo, state: &RenderState) {
        let mark = if todo.checked { 'x' } else { ' ' };
        line(out, state, &format!("- [{mark}] {}", render_rich_text(&todo.rich_text)));
        self.render_children(out, block, state, Some(LIST_INDENT));
    }

    fn code(&mut self, out: &mut String, block: &Block, code: &Code, state: &RenderState) {
        let language = match code.language.as_str() {
            "plain text" => "",
            other => other,
        };
        line(out, state, &format!("```{language}"));
        let source = plain_text(&code.rich_text);
        if !source.is_empty() {
            line(out, state, &source);
        }
        line(out, state, "```");
        blank(out, state);
        self.render_children(out, block, state, None);
    }

    fn image(&mut self, out: &mut String, image: &Image, state: &RenderState) {
        let url = image.source.url();
        let path = match self.resolver.resolve(url) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(url, error = %err, "image unavailable, leaving an empty reference");
                self.report.asset_failures += 1;
                String::new()
            }
        };
        line(out, state, &format!("![{}]({path})", render_rich_text(&image.caption)));
        blank(out, state);
    }

    fn bookmark(&mut self, out: &mut String, bookmark: &Bookmark, state: &RenderState) {
        let Some(target) = state.shortcodes() else {
            let text = match render_rich_text(&bookmark.caption) {
                caption if caption.is_empty() => bookmark.url.clone(),
                caption => caption,
            };
            line(out, state, &format!("[{text}]({})", bookmark.url));
            blank(out, state);
            return;
        };

        let preview = match self.resolver.link_preview(&bookmark.url) {
            Ok(preview) => preview,
            Err(err) => {
                tracing::warn!(url = %bookmark.url, error = %err, "link preview unavailable");
                self.report.asset_failures += 1;
                LinkPreview {
                    url: bookmark.url.clone(),
                    ..Default::default()
                }
            }
        };
        line(out, state, &target.bookmark_open(&preview));
        if !preview.description.is_empty() {
            line(out, state, &preview.description);
        }
        line(out, state, target.bookmark_close());
        blank(out, state);
    }

    fn callout(&mut self, out: &mut String, block: &Block, callout: &Callout, state: &RenderState) {
        let text = render_rich_text(&callout.rich_text);
        let Some(target) = state.shortcodes() else {
            line(out, state, &text);
            blank(out, state);
            self.render_children(out, block, state, None);
            return;
        };

        line(out, state, &target.callout_open(callout.icon.as_ref()));
        line(out, state, &text);
        if !block.children().is_empty() {
            blank(out, state);
            self.render_children(out, block, state, None);
        }
        line(out, state, target.callout_close());
        blank(out, state);
    }

    /// GFM table from the `table_row` children. The first row is the header.
    fn table(&mut self, out: &mut String, block: &Block, table: &Table, state: &RenderState) {
        let rows: Vec<&TableRow> = block
            .children()
            .iter()
            .filter_map(|child| match &child.kind {
                BlockKind::TableRow(row) => Some(row),
                _ => None,
            })
            .collect();
        let Some((header, body)) = rows.split_first() else {
            tracing::debug!(block = %block.id, "table without rows, skipping");
            return;
        };

        let width = rows
            .iter()
            .map(|row| row.cells.len())
            .max()
            .unwrap_or(0)
            .max(table.table_width);
        line(out, state, &table_row(header, width));
        line(out, state, &format!("|{}", " --- |".repeat(width)));
        for row in body {
            line(out, state, &table_row(row, width));
        }
        blank(out, state);
    }
}

/// Skipped blocks leave list numbering and spacing untouched.
fn renders_nothing(block: &Block) -> bool {
    match &block.kind {
        BlockKind::Unsupported | BlockKind::Unimplemented(_) | BlockKind::TableRow(_) => true,
        BlockKind::Table(_) => !block
            .children()
            .iter()
            .any(|child| matches!(child.kind, BlockKind::TableRow(_))),
        _ => false,
    }
}

fn table_row(row: &TableRow, width: usize) -> String {
    let mut rendered = String::from("|");
    for i in 0..width {
        let cell = row
            .cells
            .get(i)
            .map(|spans| {
                render_rich_text(spans)
                    .replace('|', "\\|")
                    .replace('\n', "<br>")
            })
            .unwrap_or_default();
        rendered.push(' ');
        rendered.push_str(&cell);
        rendered.push_str(" |");
    }
    rendered
}

fn heading(out: &mut String, state: &RenderState, marker: &str, text: &[RichText]) {
    line(out, state, &format!("{marker} {}", render_rich_text(text)));
    blank(out, state);
}

/// Write `text` with the current prefix on every line.
fn line(out: &mut String, state: &RenderState, text: &str) {
    let prefix = state.prefix();
    for part in text.split('\n') {
        if part.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(&prefix);
            out.push_str(part);
        }
        out.push('\n');
    }
}

fn blank(out: &mut String, state: &RenderState) {
    out.push_str(state.prefix().trim_end());
    out.push('\n');
}
