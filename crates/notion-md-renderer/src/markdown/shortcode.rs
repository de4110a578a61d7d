//! Shortcode dialects for callouts and bookmarks.

use notion_md_common::ShortcodeTarget;
use notion_md_common::model::Icon;

use crate::assets::LinkPreview;

pub trait Shortcodes {
    fn callout_open(&self, icon: Option<&Icon>) -> String;
    fn callout_close(&self) -> &'static str;
    fn bookmark_open(&self, preview: &LinkPreview) -> String;
    fn bookmark_close(&self) -> &'static str;
}

impl Shortcodes for ShortcodeTarget {
    fn callout_open(&self, icon: Option<&Icon>) -> String {
        let attr = match icon {
            Some(Icon::Emoji { emoji }) => Some(("emoji", emoji.as_str())),
            Some(Icon::External { external: file } | Icon::File { file }) => {
                Some(("image", file.url.as_str()))
            }
            Some(Icon::Unknown) | None => None,
        };
        match self {
            ShortcodeTarget::Hugo => match attr {
                Some((key, value)) => format!(r#"{{{{% callout {key}="{}" %}}}}"#, quote(value)),
                None => "{{% callout %}}".to_owned(),
            },
            ShortcodeTarget::Hexo => match attr {
                Some((key, value)) => format!(r#"{{% callout {key}="{}" %}}"#, quote(value)),
                None => "{% callout %}".to_owned(),
            },
            ShortcodeTarget::Vuepress => match attr {
                Some(("emoji", emoji)) => format!("::: tip {emoji}"),
                _ => "::: tip".to_owned(),
            },
        }
    }

    fn callout_close(&self) -> &'static str {
        match self {
            ShortcodeTarget::Hugo => "{{% /callout %}}",
            ShortcodeTarget::Hexo => "{% endcallout %}",
            ShortcodeTarget::Vuepress => ":::",
        }
    }

    fn bookmark_open(&self, preview: &LinkPreview) -> String {
        match self {
            ShortcodeTarget::Hugo => format!(
                r#"{{{{< bookmark url="{}" title="{}" img="{}" >}}}}"#,
                quote(&preview.url),
                quote(&preview.title),
                quote(&preview.image)
            ),
            ShortcodeTarget::Hexo => format!(
                r#"{{% bookmark url="{}" title="{}" img="{}" %}}"#,
                quote(&preview.url),
                quote(&preview.title),
                quote(&preview.image)
            ),
            ShortcodeTarget::Vuepress => format!(
                r#"<Bookmark url="{}" title="{}" img="{}">"#,
                html_attr(&preview.url),
                html_attr(&preview.title),
                html_attr(&preview.image)
            ),
        }
    }

    fn bookmark_close(&self) -> &'static str {
        match self {
            ShortcodeTarget::Hugo => "{{< /bookmark >}}",
            ShortcodeTarget::Hexo => "{% endbookmark %}",
            ShortcodeTarget::Vuepress => "</Bookmark>",
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn html_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
