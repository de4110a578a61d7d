//! Typed view of the Notion objects this workspace consumes.
//!
//! Only the fields the renderer and front matter extraction read are
//! modelled. Everything else in the API payloads is ignored on decode.

mod block;
mod page;
mod rich_text;

pub use block::*;
pub use page::*;
pub use rich_text::*;
