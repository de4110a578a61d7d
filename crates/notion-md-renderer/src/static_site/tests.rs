use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use notion_md_common::model::{Block, BlockKind, FileSource, Image, PropertyValue, RichText, TextBlock};
use notion_md_common::{NotionError, Paginated};

use super::*;
use crate::assets::{AssetError, LinkPreview};

#[derive(Default)]
struct FakeNotion {
    pages: Vec<Page>,
    children: HashMap<String, Vec<Block>>,
    broken: Vec<String>,
    query_fails: bool,
    queried_with: RefCell<Option<SelectFilter>>,
    updates: RefCell<Vec<(String, String, String)>>,
}

impl BlockSource for FakeNotion {
    fn list_children(
        &self,
        block_id: &str,
        _cursor: Option<&str>,
    ) -> Result<Paginated<Block>, NotionError> {
        if self.broken.iter().any(|id| id == block_id) {
            return Err(NotionError::Api {
                status: 404,
                code: "object_not_found".into(),
                message: "gone".into(),
            });
        }
        Ok(Paginated::last(
            self.children.get(block_id).cloned().unwrap_or_default(),
        ))
    }
}

impl DocumentSource for FakeNotion {
    fn query_documents(
        &self,
        _database_id: &str,
        filter: Option<&SelectFilter>,
    ) -> Result<Vec<Page>, NotionError> {
        if self.query_fails {
            return Err(NotionError::Api {
                status: 401,
                code: "unauthorized".into(),
                message: "API token is invalid.".into(),
            });
        }
        *self.queried_with.borrow_mut() = filter.cloned();
        Ok(self
            .pages
            .iter()
            .filter(|page| filter.is_none_or(|f| f.matches(page)))
            .cloned()
            .collect())
    }

    fn update_select(&self, page_id: &str, property: &str, value: &str) -> Result<(), NotionError> {
        self.updates
            .borrow_mut()
            .push((page_id.into(), property.into(), value.into()));
        Ok(())
    }
}

/// Resolves every asset to `{prefix}/asset.png` without touching the network.
struct Offline {
    prefix: String,
}

impl AssetResolver for Offline {
    fn resolve(&self, _url: &str) -> Result<String, AssetError> {
        Ok(format!("{}/asset.png", self.prefix))
    }

    fn link_preview(&self, url: &str) -> Result<LinkPreview, AssetError> {
        Ok(LinkPreview {
            url: url.to_owned(),
            ..Default::default()
        })
    }
}

fn page(id: &str, title: &str, status: &str) -> Page {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    Page::new(id, created, created)
        .with_property("Name", PropertyValue::title(title))
        .with_property("Status", PropertyValue::select(status))
}

fn paragraph(text: &str) -> Block {
    Block::new(
        text,
        BlockKind::Paragraph(TextBlock::new(vec![RichText::plain(text)])),
    )
}

fn options(content_dir: &Path) -> SiteOptions {
    let mut config = Config::default();
    config.notion.filter_prop = Some("Status".into());
    config.notion.filter_values = vec!["Ready".into(), "Published".into()];
    config.notion.published_value = Some("Published".into());
    config.markdown.post_save_path = content_dir.to_path_buf();
    config.markdown.title_property = Some("Name".into());
    SiteOptions::from_config(&config, "db")
}

type Seen = Rc<RefCell<Vec<(PathBuf, String)>>>;

fn generator(notion: FakeNotion, options: SiteOptions) -> (SiteGenerator<FakeNotion>, Seen) {
    let seen: Seen = Rc::default();
    let log = seen.clone();
    let generator = SiteGenerator::new(notion, options, reqwest::blocking::Client::new())
        .with_resolvers(move |dir, prefix| {
            log.borrow_mut().push((dir, prefix.clone()));
            Box::new(Offline { prefix }) as Box<dyn AssetResolver>
        });
    (generator, seen)
}

#[test]
fn filenames_are_normalized() {
    assert_eq!(normalize_title("Hello, World: Rust & Notion!"), "hello-world-rust--notion");
    assert_eq!(normalize_title("  a/b\tc\u{7} "), "ab-c");
    assert_eq!(normalize_title("Ünïcode Title"), "ünïcode-title");

    let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    assert_eq!(document_filename("My Post", &created, false), "my-post.md");
    assert_eq!(document_filename("My Post", &created, true), "2024-03-01-my-post.md");
    assert_eq!(document_filename("???", &created, false), "untitled.md");
    assert_eq!(document_filename("..", &created, false), "untitled.md");
    assert_eq!(page_slug(".hidden Page"), "hidden-page");
}

#[test]
fn options_follow_the_config() {
    let options = options(Path::new("out"));
    let filter = options.filter.as_ref().unwrap();
    assert_eq!(filter.property, "Status");
    assert_eq!(filter.values, vec!["Ready", "Published"]);
    assert_eq!(options.image_public_link, "/images/notion");
    assert_eq!(options.fields.title.as_deref(), Some("Name"));
}

#[test]
fn generates_documents_and_publishes_them() {
    let dir = tempfile::tempdir().unwrap();
    let content_dir = dir.path().join("content/posts");
    let mut notion = FakeNotion {
        pages: vec![page("p1", "Hello World", "Ready"), page("p2", "Draft", "Draft")],
        ..Default::default()
    };
    notion.children.insert("p1".into(), vec![paragraph("Hello")]);

    let (generator, _) = generator(notion, options(&content_dir));
    let summary = generator.run().unwrap();
    assert_eq!(
        summary,
        SiteSummary {
            total: 1,
            generated: 1,
            failed: 0,
            published: 1,
        }
    );

    let written = std::fs::read_to_string(content_dir.join("hello-world.md")).unwrap();
    assert!(written.starts_with("---\ntitle: Hello World\n"));
    assert!(written.ends_with("---\n\nHello\n\n"));
    assert!(!content_dir.join("draft.md").exists());

    assert_eq!(
        *generator.source.updates.borrow(),
        vec![("p1".to_string(), "Status".to_string(), "Published".to_string())]
    );
    assert_eq!(
        generator.source.queried_with.borrow().as_ref().map(|f| f.values.len()),
        Some(2)
    );
}

#[test]
fn already_published_pages_are_not_updated() {
    let dir = tempfile::tempdir().unwrap();
    let notion = FakeNotion {
        pages: vec![page("p1", "Old news", "Published")],
        ..Default::default()
    };
    let (generator, _) = generator(notion, options(dir.path()));
    let summary = generator.run().unwrap();
    assert_eq!(summary.generated, 1);
    assert_eq!(summary.published, 0);
    assert!(generator.source.updates.borrow().is_empty());
}

#[test]
fn failed_documents_are_skipped_and_left_unpublished() {
    let dir = tempfile::tempdir().unwrap();
    let mut notion = FakeNotion {
        pages: vec![page("bad", "Broken", "Ready"), page("good", "Fine", "Ready")],
        broken: vec!["bad".into()],
        ..Default::default()
    };
    notion.children.insert("good".into(), vec![paragraph("ok")]);

    let (generator, _) = generator(notion, options(dir.path()));
    let summary = generator.run().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.generated, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.published, 1);
    assert!(dir.path().join("fine.md").exists());
    assert!(!dir.path().join("broken.md").exists());
    assert_eq!(generator.source.updates.borrow()[0].0, "good");
}

#[test]
fn assets_go_to_a_directory_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut notion = FakeNotion {
        pages: vec![page("p1", "Cats & Dogs", "Ready")],
        ..Default::default()
    };
    notion.children.insert(
        "p1".into(),
        vec![Block::new(
            "img",
            BlockKind::Image(Image {
                caption: vec![],
                source: FileSource::external("https://cdn.example.com/cat.png"),
            }),
        )],
    );
    let mut options = options(dir.path());
    options.page_name_prefix = "blog-".into();
    options.image_dir = dir.path().join("static");

    let (generator, seen) = generator(notion, options);
    generator.run().unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![(
            dir.path().join("static").join("blog-cats--dogs"),
            "/images/notion/blog-cats--dogs".to_string()
        )]
    );
    let written = std::fs::read_to_string(dir.path().join("cats--dogs.md")).unwrap();
    assert!(written.contains("![](/images/notion/blog-cats--dogs/asset.png)"));
}

#[test]
fn asset_directory_and_link_share_one_safe_name() {
    let dir = tempfile::tempdir().unwrap();
    let notion = FakeNotion {
        pages: vec![page("p1", "TCP/IP basics", "Ready"), page("p2", "..", "Ready")],
        ..Default::default()
    };
    let mut options = options(dir.path());
    options.image_dir = dir.path().join("static");

    let (generator, seen) = generator(notion, options);
    generator.run().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0].0, dir.path().join("static").join("tcpip-basics"));
    assert_eq!(seen[0].1, "/images/notion/tcpip-basics");
    assert_eq!(seen[1].0, dir.path().join("static").join("untitled"));
    assert_eq!(seen[1].1, "/images/notion/untitled");
    for (path, _) in seen.iter() {
        assert_eq!(path.parent(), Some(dir.path().join("static").as_path()));
    }
}

#[test]
fn template_is_applied_and_a_broken_one_fails_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("post.hbs");
    std::fs::write(&template, "# {{title}}\n\n{{content}}").unwrap();

    let mut notion = FakeNotion {
        pages: vec![page("p1", "Templated", "Ready")],
        ..Default::default()
    };
    notion.children.insert("p1".into(), vec![paragraph("body")]);
    let mut options = options(&dir.path().join("out"));
    options.template = Some(template.clone());
    options.published_value = None;

    let (generator, _) = generator(notion, options);
    assert_eq!(generator.run().unwrap().generated, 1);
    let written = std::fs::read_to_string(dir.path().join("out/templated.md")).unwrap();
    assert!(written.ends_with("---\n\n# Templated\n\nbody\n\n"));
    assert!(generator.source.updates.borrow().is_empty());

    std::fs::write(&template, "{{#if title}}unclosed").unwrap();
    let summary = generator.run().unwrap();
    assert_eq!(summary.generated, 0);
    assert_eq!(summary.failed, 1);
}

#[test]
fn query_failure_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let notion = FakeNotion {
        query_fails: true,
        ..Default::default()
    };
    let (generator, _) = generator(notion, options(dir.path()));
    assert!(generator.run().is_err());
}

#[test]
fn uncreatable_content_dir_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "").unwrap();
    let (generator, _) = generator(FakeNotion::default(), options(&blocker.join("posts")));
    assert!(generator.run().is_err());
}
