use std::fmt::Write;

use notion_md_common::model::{Annotations, RichText};

/// Emphasis markers around one span, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Code,
    BoldItalic,
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Emphasis::Code => "`",
            Emphasis::BoldItalic => "***",
            Emphasis::Bold => "**",
            Emphasis::Italic => "*",
            Emphasis::Underline => "__",
            Emphasis::Strikethrough => "~~",
        }
    }

    /// Code suppresses everything else. Underline and strikethrough are
    /// mutually exclusive, underline taking precedence.
    fn stack(annotations: &Annotations) -> Vec<Emphasis> {
        if annotations.code {
            return vec![Emphasis::Code];
        }
        let mut stack = Vec::with_capacity(2);
        if annotations.underline {
            stack.push(Emphasis::Underline);
        } else if annotations.strikethrough {
            stack.push(Emphasis::Strikethrough);
        }
        match (annotations.bold, annotations.italic) {
            (true, true) => stack.push(Emphasis::BoldItalic),
            (true, false) => stack.push(Emphasis::Bold),
            (false, true) => stack.push(Emphasis::Italic),
            (false, false) => {}
        }
        stack
    }
}

pub struct MarkdownSpanOutput<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownSpanOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_span(&mut self, span: &RichText) -> std::fmt::Result {
        let Some(content) = span.content() else {
            return Ok(());
        };
        let stack = Emphasis::stack(&span.annotations);
        for emphasis in &stack {
            self.writer.write_str(emphasis.marker())?;
        }
        match span.link_url() {
            Some(url) => write!(self.writer, "[{content}]({url})")?,
            None => self.writer.write_str(content)?,
        }
        for emphasis in stack.iter().rev() {
            self.writer.write_str(emphasis.marker())?;
        }
        Ok(())
    }
}

/// Inline Markdown for an ordered run of spans.
pub fn render_rich_text(spans: &[RichText]) -> String {
    let mut output = MarkdownSpanOutput::new(String::new());
    for span in spans {
        // Writing into a String cannot fail.
        let _ = output.write_span(span);
    }
    output.into_inner()
}

#[cfg(test)]
mod tests {
    use notion_md_common::model::RichTextKind;

    use super::*;

    fn annotated(text: &str, f: impl FnOnce(&mut Annotations)) -> RichText {
        let mut annotations = Annotations::default();
        f(&mut annotations);
        RichText::plain(text).with_annotations(annotations)
    }

    #[test]
    fn plain_span_is_verbatim() {
        assert_eq!(render_rich_text(&[RichText::plain("Hello")]), "Hello");
    }

    #[test]
    fn bold_and_italic_use_the_joint_marker() {
        let span = annotated("x", |a| {
            a.bold = true;
            a.italic = true;
        });
        assert_eq!(render_rich_text(&[span]), "***x***");
    }

    #[test]
    fn single_emphasis() {
        assert_eq!(render_rich_text(&[annotated("b", |a| a.bold = true)]), "**b**");
        assert_eq!(render_rich_text(&[annotated("i", |a| a.italic = true)]), "*i*");
        assert_eq!(
            render_rich_text(&[annotated("s", |a| a.strikethrough = true)]),
            "~~s~~"
        );
        assert_eq!(
            render_rich_text(&[annotated("u", |a| a.underline = true)]),
            "__u__"
        );
    }

    #[test]
    fn code_ignores_every_other_annotation() {
        let span = annotated("f()", |a| {
            a.code = true;
            a.bold = true;
            a.italic = true;
            a.underline = true;
            a.strikethrough = true;
        });
        assert_eq!(render_rich_text(&[span]), "`f()`");
    }

    #[test]
    fn underline_wraps_outside_emphasis_and_beats_strikethrough() {
        let span = annotated("x", |a| {
            a.bold = true;
            a.underline = true;
            a.strikethrough = true;
        });
        assert_eq!(render_rich_text(&[span]), "__**x**__");
    }

    #[test]
    fn emphasis_wraps_the_whole_link() {
        let span = annotated("docs", |a| a.bold = true).with_link("https://example.com");
        assert_eq!(render_rich_text(&[span]), "**[docs](https://example.com)**");
    }

    #[test]
    fn non_text_spans_render_empty() {
        let equation = RichText {
            kind: RichTextKind::Equation,
            plain_text: "e=mc^2".into(),
            ..Default::default()
        };
        let mention = RichText {
            kind: RichTextKind::Mention,
            plain_text: "@ada".into(),
            ..Default::default()
        };
        assert_eq!(render_rich_text(&[equation, mention]), "");
    }

    #[test]
    fn rendering_is_associative_over_concatenation() {
        let a = annotated("a", |a| a.bold = true);
        let b = RichText::plain(" and ").with_link("https://b.example");
        let c = annotated("c", |a| a.code = true);
        let joined = render_rich_text(&[a.clone(), b.clone(), c.clone()]);
        let split = render_rich_text(&[a, b]) + &render_rich_text(&[c]);
        assert_eq!(joined, split);
        assert_eq!(joined, "**a**[ and ](https://b.example)`c`");
    }

    #[test]
    fn adjacent_identical_spans_are_not_merged() {
        let spans = vec![
            annotated("a", |a| a.bold = true),
            annotated("b", |a| a.bold = true),
        ];
        assert_eq!(render_rich_text(&spans), "**a****b**");
    }
}
