use serde::{Deserialize, Serialize};

/// One annotated span of a rich text array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default)]
    pub kind: RichTextKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RichTextKind {
    #[default]
    Text,
    Equation,
    Mention,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl RichText {
    /// Plain, unannotated text span.
    pub fn plain(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            kind: RichTextKind::Text,
            plain_text: content.clone(),
            text: Some(TextContent {
                content,
                link: None,
            }),
            ..Default::default()
        }
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if let Some(text) = self.text.as_mut() {
            text.link = Some(Link { url: url.clone() });
        }
        self.href = Some(url);
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Text content of a `text` span, `None` for equations and mentions.
    pub fn content(&self) -> Option<&str> {
        match self.kind {
            RichTextKind::Text => self.text.as_ref().map(|t| t.content.as_str()),
            _ => None,
        }
    }

    pub fn link_url(&self) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(|t| t.link.as_ref())
            .map(|l| l.url.as_str())
    }
}

/// Concatenated raw content of the spans, no markup.
pub fn plain_text(spans: &[RichText]) -> String {
    spans
        .iter()
        .filter_map(|span| span.content())
        .collect::<Vec<_>>()
        .concat()
}
