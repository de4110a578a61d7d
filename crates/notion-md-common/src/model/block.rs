use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rich_text::RichText;

/// A node of a document's content tree.
///
/// `children` is only ever populated by the tree fetcher, and only for
/// [container](BlockType::is_container) types. A block deserialized straight
/// from the API has an empty child list even when `has_children` is set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    pub id: String,
    pub has_children: bool,
    pub kind: BlockKind,
    children: Vec<Block>,
}

/// Type-specific payload of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph(TextBlock),
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    ToDo(ToDo),
    Quote(TextBlock),
    Toggle(TextBlock),
    Template(TextBlock),
    Callout(Callout),
    Bookmark(Bookmark),
    Image(Image),
    Code(Code),
    Table(Table),
    TableRow(TableRow),
    Divider,
    Column,
    ColumnList,
    SyncedBlock,
    /// The API itself reports the block as unsupported.
    Unsupported,
    /// A block type the API knows about that this crate does not render.
    /// Carries the raw type tag.
    Unimplemented(String),
}

/// Type tag of a block, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Quote,
    Toggle,
    Template,
    Callout,
    Bookmark,
    Image,
    Code,
    Table,
    TableRow,
    Divider,
    Column,
    ColumnList,
    SyncedBlock,
    Unsupported,
    Unimplemented,
}

impl BlockType {
    /// Types whose children are fetched and rendered.
    ///
    /// Anything not listed keeps an empty child list even when the API says
    /// it has children: headings, images, bookmarks and dividers have no
    /// child content that maps onto Markdown.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            BlockType::Paragraph
                | BlockType::Callout
                | BlockType::Quote
                | BlockType::BulletedListItem
                | BlockType::NumberedListItem
                | BlockType::ToDo
                | BlockType::Table
                | BlockType::Toggle
                | BlockType::Column
                | BlockType::ColumnList
                | BlockType::SyncedBlock
                | BlockType::Template
                | BlockType::Code
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading1 => "heading_1",
            BlockType::Heading2 => "heading_2",
            BlockType::Heading3 => "heading_3",
            BlockType::BulletedListItem => "bulleted_list_item",
            BlockType::NumberedListItem => "numbered_list_item",
            BlockType::ToDo => "to_do",
            BlockType::Quote => "quote",
            BlockType::Toggle => "toggle",
            BlockType::Template => "template",
            BlockType::Callout => "callout",
            BlockType::Bookmark => "bookmark",
            BlockType::Image => "image",
            BlockType::Code => "code",
            BlockType::Table => "table",
            BlockType::TableRow => "table_row",
            BlockType::Divider => "divider",
            BlockType::Column => "column",
            BlockType::ColumnList => "column_list",
            BlockType::SyncedBlock => "synced_block",
            BlockType::Unsupported => "unsupported",
            BlockType::Unimplemented => "unimplemented",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BlockKind {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Paragraph(_) => BlockType::Paragraph,
            BlockKind::Heading1(_) => BlockType::Heading1,
            BlockKind::Heading2(_) => BlockType::Heading2,
            BlockKind::Heading3(_) => BlockType::Heading3,
            BlockKind::BulletedListItem(_) => BlockType::BulletedListItem,
            BlockKind::NumberedListItem(_) => BlockType::NumberedListItem,
            BlockKind::ToDo(_) => BlockType::ToDo,
            BlockKind::Quote(_) => BlockType::Quote,
            BlockKind::Toggle(_) => BlockType::Toggle,
            BlockKind::Template(_) => BlockType::Template,
            BlockKind::Callout(_) => BlockType::Callout,
            BlockKind::Bookmark(_) => BlockType::Bookmark,
            BlockKind::Image(_) => BlockType::Image,
            BlockKind::Code(_) => BlockType::Code,
            BlockKind::Table(_) => BlockType::Table,
            BlockKind::TableRow(_) => BlockType::TableRow,
            BlockKind::Divider => BlockType::Divider,
            BlockKind::Column => BlockType::Column,
            BlockKind::ColumnList => BlockType::ColumnList,
            BlockKind::SyncedBlock => BlockType::SyncedBlock,
            BlockKind::Unsupported => BlockType::Unsupported,
            BlockKind::Unimplemented(_) => BlockType::Unimplemented,
        }
    }
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            has_children: false,
            kind,
            children: Vec::new(),
        }
    }

    /// Attach a fully fetched child list, producing the finished node.
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children |= !children.is_empty();
        self.children = children;
        self
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    /// Whether the fetcher should descend into this block.
    pub fn needs_children(&self) -> bool {
        self.has_children && self.block_type().is_container()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    pub rich_text: Vec<RichText>,
    pub color: Option<String>,
}

impl TextBlock {
    pub fn new(rich_text: Vec<RichText>) -> Self {
        Self {
            rich_text,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToDo {
    pub rich_text: Vec<RichText>,
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Callout {
    pub rich_text: Vec<RichText>,
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    External { external: FileUrl },
    File { file: FileUrl },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bookmark {
    pub url: String,
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(flatten)]
    pub source: FileSource,
}

/// Where a file-like payload lives: an external URL or a Notion-hosted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSource {
    External { external: FileUrl },
    File { file: FileUrl },
}

impl FileSource {
    pub fn external(url: impl Into<String>) -> Self {
        FileSource::External {
            external: FileUrl {
                url: url.into(),
                expiry_time: None,
            },
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FileSource::External { external } => &external.url,
            FileSource::File { file } => &file.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Code {
    pub rich_text: Vec<RichText>,
    pub language: String,
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    pub table_width: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRow {
    pub cells: Vec<Vec<RichText>>,
}

/// Wire shape of a block: the payload sits under a key named after `type`.
#[derive(Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payloads: Map<String, Value>,
}

impl RawBlock {
    fn payload<T: DeserializeOwned>(&mut self) -> Result<T, serde_json::Error> {
        let value = self
            .payloads
            .remove(&self.block_type)
            .unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(value)
    }
}

impl TryFrom<RawBlock> for Block {
    type Error = serde_json::Error;

    fn try_from(mut raw: RawBlock) -> Result<Self, Self::Error> {
        let kind = match raw.block_type.as_str() {
            "paragraph" => BlockKind::Paragraph(raw.payload()?),
            "heading_1" => BlockKind::Heading1(raw.payload()?),
            "heading_2" => BlockKind::Heading2(raw.payload()?),
            "heading_3" => BlockKind::Heading3(raw.payload()?),
            "bulleted_list_item" => BlockKind::BulletedListItem(raw.payload()?),
            "numbered_list_item" => BlockKind::NumberedListItem(raw.payload()?),
            "to_do" => BlockKind::ToDo(raw.payload()?),
            "quote" => BlockKind::Quote(raw.payload()?),
            "toggle" => BlockKind::Toggle(raw.payload()?),
            "template" => BlockKind::Template(raw.payload()?),
            "callout" => BlockKind::Callout(raw.payload()?),
            "bookmark" => BlockKind::Bookmark(raw.payload()?),
            "image" => BlockKind::Image(raw.payload()?),
            "code" => BlockKind::Code(raw.payload()?),
            "table" => BlockKind::Table(raw.payload()?),
            "table_row" => BlockKind::TableRow(raw.payload()?),
            "divider" => BlockKind::Divider,
            "column" => BlockKind::Column,
            "column_list" => BlockKind::ColumnList,
            "synced_block" => BlockKind::SyncedBlock,
            "unsupported" => BlockKind::Unsupported,
            other => BlockKind::Unimplemented(other.to_owned()),
        };

        Ok(Block {
            id: raw.id,
            has_children: raw.has_children,
            kind,
            children: Vec::new(),
        })
    }
}
