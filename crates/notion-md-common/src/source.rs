//! Collaborator traits the renderer and site generator consume.
//!
//! [`NotionClient`](crate::client::NotionClient) implements both over HTTP;
//! tests implement them over in-memory fixtures.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::NotionError;
use crate::model::{Block, Page};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Paginated<T> {
    /// The final page of a listing.
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Paginated access to a block's direct children.
pub trait BlockSource {
    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Block>, NotionError>;
}

/// Database queries and the status flip that marks a page as published.
pub trait DocumentSource {
    /// Every page matching `filter`, following the query's own pagination.
    fn query_documents(
        &self,
        database_id: &str,
        filter: Option<&SelectFilter>,
    ) -> Result<Vec<Page>, NotionError>;

    fn update_select(&self, page_id: &str, property: &str, value: &str)
    -> Result<(), NotionError>;
}

/// OR of `select equals` conditions over one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectFilter {
    pub property: String,
    pub values: Vec<String>,
}

impl SelectFilter {
    /// `None` when there is nothing to filter on, meaning "every page".
    pub fn new(property: Option<&str>, values: &[String]) -> Option<Self> {
        let property = property.filter(|p| !p.is_empty())?;
        let values: Vec<String> = values.iter().filter(|v| !v.is_empty()).cloned().collect();
        if values.is_empty() {
            return None;
        }
        Some(Self {
            property: property.to_owned(),
            values,
        })
    }

    pub fn matches(&self, page: &Page) -> bool {
        page.property(&self.property)
            .and_then(|value| value.select_name())
            .is_some_and(|name| self.values.iter().any(|v| v == name))
    }

    /// Query body fragment in the API's filter syntax.
    pub fn to_json(&self) -> Value {
        let conditions: Vec<Value> = self
            .values
            .iter()
            .map(|value| {
                json!({
                    "property": self.property,
                    "select": { "equals": value },
                })
            })
            .collect();
        json!({ "or": conditions })
    }
}
