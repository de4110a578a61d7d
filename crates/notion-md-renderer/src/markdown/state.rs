use notion_md_common::ShortcodeTarget;
use notion_md_common::model::BlockType;

/// Which list a run of siblings belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListKind {
    #[default]
    None,
    Bulleted,
    Numbered,
    ToDo,
}

impl ListKind {
    pub fn of(ty: BlockType) -> Self {
        match ty {
            BlockType::BulletedListItem => ListKind::Bulleted,
            BlockType::NumberedListItem => ListKind::Numbered,
            BlockType::ToDo => ListKind::ToDo,
            _ => ListKind::None,
        }
    }
}

/// Context for one sibling list. Children get a fresh state from
/// [`RenderState::child`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderState {
    pub depth: usize,
    prefixes: Vec<&'static str>,
    list_kind: ListKind,
    last_type: Option<BlockType>,
    same_type_run: usize,
    shortcodes: Option<ShortcodeTarget>,
}

impl RenderState {
    pub fn new(shortcodes: Option<ShortcodeTarget>) -> Self {
        Self {
            depth: 0,
            prefixes: Vec::new(),
            list_kind: ListKind::None,
            last_type: None,
            same_type_run: 0,
            shortcodes,
        }
    }

    /// State for a block's children, one level deeper, optionally pushing a
    /// line prefix. Sibling tracking starts over.
    pub fn child(&self, prefix: Option<&'static str>) -> Self {
        let mut prefixes = self.prefixes.clone();
        prefixes.extend(prefix);
        Self {
            depth: self.depth + 1,
            prefixes,
            list_kind: ListKind::None,
            last_type: None,
            same_type_run: 0,
            shortcodes: self.shortcodes,
        }
    }

    pub fn prefix(&self) -> String {
        self.prefixes.concat()
    }

    pub fn shortcodes(&self) -> Option<ShortcodeTarget> {
        self.shortcodes
    }

    pub fn list_kind(&self) -> ListKind {
        self.list_kind
    }

    /// Number of directly preceding siblings with the same type.
    pub fn run(&self) -> usize {
        self.same_type_run
    }

    /// Record the next sibling. Returns whether an open list run ends here.
    pub fn advance(&mut self, ty: BlockType) -> bool {
        let kind = ListKind::of(ty);
        let closes = self.list_kind != ListKind::None && self.list_kind != kind;
        self.list_kind = kind;
        self.same_type_run = if self.last_type == Some(ty) {
            self.same_type_run + 1
        } else {
            0
        };
        self.last_type = Some(ty);
        closes
    }
}
