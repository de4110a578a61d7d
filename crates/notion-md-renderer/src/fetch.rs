//! Recursive retrieval of a page's block tree.

use notion_md_common::model::Block;
use notion_md_common::{BlockSource, NotionError};

/// Emitted once per parent after all of its children have been listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress<'a> {
    pub parent_id: &'a str,
    pub pages: usize,
    pub blocks: usize,
}

/// Fetch every block under `root_id`, descending into container blocks.
///
/// Any listing error aborts the whole fetch. No partial tree is returned.
pub fn fetch_tree<S>(source: &S, root_id: &str) -> Result<Vec<Block>, NotionError>
where
    S: BlockSource + ?Sized,
{
    fetch_tree_with_progress(source, root_id, &mut |_| {})
}

pub fn fetch_tree_with_progress<S, F>(
    source: &S,
    root_id: &str,
    progress: &mut F,
) -> Result<Vec<Block>, NotionError>
where
    S: BlockSource + ?Sized,
    F: FnMut(FetchProgress<'_>),
{
    let blocks = list_all_children(source, root_id, progress)?;
    blocks
        .into_iter()
        .map(|block| {
            if block.needs_children() {
                let children = fetch_tree_with_progress(source, &block.id, progress)?;
                Ok(block.with_children(children))
            } else {
                Ok(block)
            }
        })
        .collect()
}

fn list_all_children<S, F>(
    source: &S,
    parent_id: &str,
    progress: &mut F,
) -> Result<Vec<Block>, NotionError>
where
    S: BlockSource + ?Sized,
    F: FnMut(FetchProgress<'_>),
{
    let mut blocks = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = source.list_children(parent_id, cursor.as_deref())?;
        pages += 1;
        tracing::debug!(
            parent = parent_id,
            page = pages,
            count = page.results.len(),
            has_more = page.has_more,
            "listed children"
        );

        if page.results.is_empty() {
            break;
        }
        blocks.extend(page.results);
        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                tracing::warn!(parent = parent_id, "more children reported without a cursor");
                break;
            }
        }
    }

    progress(FetchProgress {
        parent_id,
        pages,
        blocks: blocks.len(),
    });
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use notion_md_common::Paginated;
    use notion_md_common::model::{BlockKind, BlockType, TextBlock};

    use super::*;

    /// Serves fixed child lists in pages of `page_size`, cursors being the
    /// offset of the next page.
    struct FakeSource {
        children: HashMap<String, Vec<Block>>,
        page_size: usize,
        calls: RefCell<Vec<(String, Option<String>)>>,
        fail_on: Option<String>,
    }

    impl FakeSource {
        fn new(page_size: usize) -> Self {
            Self {
                children: HashMap::new(),
                page_size,
                calls: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }

        fn with(mut self, parent: &str, blocks: Vec<Block>) -> Self {
            self.children.insert(parent.to_owned(), blocks);
            self
        }
    }

    impl BlockSource for FakeSource {
        fn list_children(
            &self,
            block_id: &str,
            cursor: Option<&str>,
        ) -> Result<Paginated<Block>, NotionError> {
            self.calls
                .borrow_mut()
                .push((block_id.to_owned(), cursor.map(str::to_owned)));
            if self.fail_on.as_deref() == Some(block_id) {
                return Err(NotionError::Api {
                    status: 502,
                    code: "bad_gateway".into(),
                    message: "upstream".into(),
                });
            }
            let all = self.children.get(block_id).cloned().unwrap_or_default();
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + self.page_size).min(all.len());
            let has_more = end < all.len();
            Ok(Paginated {
                results: all[start..end].to_vec(),
                next_cursor: has_more.then(|| end.to_string()),
                has_more,
            })
        }
    }

    fn paragraph(id: &str) -> Block {
        Block::new(id, BlockKind::Paragraph(TextBlock::default()))
    }

    fn with_children_flag(mut block: Block) -> Block {
        block.has_children = true;
        block
    }

    fn flat(n: usize) -> Vec<Block> {
        (0..n).map(|i| paragraph(&format!("b{i}"))).collect()
    }

    #[test]
    fn page_boundaries_do_not_change_the_result() {
        for total in [1, 99, 100, 101] {
            let expected: Vec<String> = flat(total).into_iter().map(|b| b.id).collect();
            for page_size in [1, 99, 100, 101] {
                let source = FakeSource::new(page_size).with("root", flat(total));
                let tree = fetch_tree(&source, "root").unwrap();
                let ids: Vec<String> = tree.into_iter().map(|b| b.id).collect();
                assert_eq!(ids, expected, "total {total}, page size {page_size}");
                assert_eq!(
                    source.calls.borrow().len(),
                    total.div_ceil(page_size),
                    "total {total}, page size {page_size}"
                );
            }
        }
    }

    #[test]
    fn first_call_has_no_cursor_then_follows_next_cursor() {
        let source = FakeSource::new(100).with("root", flat(101));
        fetch_tree(&source, "root").unwrap();
        assert_eq!(
            *source.calls.borrow(),
            vec![
                ("root".to_string(), None),
                ("root".to_string(), Some("100".to_string())),
            ]
        );
    }

    #[test]
    fn empty_page_stops_pagination() {
        struct Endless;
        impl BlockSource for Endless {
            fn list_children(
                &self,
                _block_id: &str,
                _cursor: Option<&str>,
            ) -> Result<Paginated<Block>, NotionError> {
                Ok(Paginated {
                    results: vec![],
                    next_cursor: Some("again".into()),
                    has_more: true,
                })
            }
        }
        assert!(fetch_tree(&Endless, "root").unwrap().is_empty());
    }

    #[test]
    fn missing_cursor_stops_pagination() {
        struct NoCursor;
        impl BlockSource for NoCursor {
            fn list_children(
                &self,
                _block_id: &str,
                _cursor: Option<&str>,
            ) -> Result<Paginated<Block>, NotionError> {
                Ok(Paginated {
                    results: vec![Block::new("x", BlockKind::Divider)],
                    next_cursor: None,
                    has_more: true,
                })
            }
        }
        assert_eq!(fetch_tree(&NoCursor, "root").unwrap().len(), 1);
    }

    #[test]
    fn containers_are_filled_bottom_up() {
        let quote = with_children_flag(Block::new("q", BlockKind::Quote(TextBlock::default())));
        let nested = with_children_flag(paragraph("p"));
        let source = FakeSource::new(100)
            .with("root", vec![quote, paragraph("after")])
            .with("q", vec![nested])
            .with("p", vec![paragraph("leaf")]);

        let tree = fetch_tree(&source, "root").unwrap();
        assert_eq!(tree.len(), 2);
        let q = &tree[0];
        assert_eq!(q.block_type(), BlockType::Quote);
        assert_eq!(q.children().len(), 1);
        assert_eq!(q.children()[0].children()[0].id, "leaf");
        assert!(tree[1].children().is_empty());
    }

    #[test]
    fn non_containers_are_not_descended() {
        let heading = with_children_flag(Block::new(
            "h",
            BlockKind::Heading1(TextBlock::default()),
        ));
        let source = FakeSource::new(100)
            .with("root", vec![heading])
            .with("h", vec![paragraph("toggle-heading-child")]);

        let tree = fetch_tree(&source, "root").unwrap();
        assert!(tree[0].has_children);
        assert!(tree[0].children().is_empty());
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn errors_abort_the_whole_fetch() {
        let toggle = with_children_flag(Block::new("t", BlockKind::Toggle(TextBlock::default())));
        let mut source = FakeSource::new(100)
            .with("root", vec![toggle, paragraph("sibling")])
            .with("t", flat(3));
        source.fail_on = Some("t".into());

        let err = fetch_tree(&source, "root").unwrap_err();
        assert!(matches!(err, NotionError::Api { status: 502, .. }));
    }

    #[test]
    fn progress_is_reported_per_parent() {
        let toggle = with_children_flag(Block::new("t", BlockKind::Toggle(TextBlock::default())));
        let source = FakeSource::new(2)
            .with("root", vec![toggle, paragraph("a"), paragraph("b")])
            .with("t", flat(1));

        let mut seen = Vec::new();
        fetch_tree_with_progress(&source, "root", &mut |p| {
            seen.push((p.parent_id.to_owned(), p.pages, p.blocks))
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![("root".to_string(), 2, 3), ("t".to_string(), 1, 1)]
        );
    }
}
