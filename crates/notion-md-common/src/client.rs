use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::NotionError;
use crate::model::{Block, Page};
use crate::source::{BlockSource, DocumentSource, Paginated, SelectFilter};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1/";
pub const NOTION_VERSION: &str = "2022-06-28";
/// Largest page the API hands out.
pub const PAGE_SIZE: usize = 100;

/// Blocking Notion API client.
pub struct NotionClient {
    http: Client,
    base: String,
    token: String,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, NOTION_API_BASE)
    }

    /// Point the client at another host, e.g. a recording proxy.
    pub fn with_base_url(token: impl Into<String>, base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            http: Client::new(),
            base,
            token: token.into(),
        }
    }

    /// Shared HTTP client, reused for asset downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, NotionError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let err: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(NotionError::Api {
                status: status.as_u16(),
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn query_page(
        &self,
        database_id: &str,
        filter: Option<&SelectFilter>,
        cursor: Option<&str>,
    ) -> Result<Paginated<Page>, NotionError> {
        let mut body = Map::new();
        body.insert("page_size".into(), json!(PAGE_SIZE));
        if let Some(cursor) = cursor {
            body.insert("start_cursor".into(), json!(cursor));
        }
        if let Some(filter) = filter {
            body.insert("filter".into(), filter.to_json());
        }
        let request = self
            .http
            .post(self.url(&format!("databases/{database_id}/query")))
            .json(&Value::Object(body));
        self.send(request)
    }
}

impl BlockSource for NotionClient {
    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Block>, NotionError> {
        let mut request = self
            .http
            .get(self.url(&format!("blocks/{block_id}/children")))
            .query(&[("page_size", PAGE_SIZE.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        self.send(request)
    }
}

impl DocumentSource for NotionClient {
    fn query_documents(
        &self,
        database_id: &str,
        filter: Option<&SelectFilter>,
    ) -> Result<Vec<Page>, NotionError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.query_page(database_id, filter, cursor.as_deref())?;
            tracing::debug!(
                database = database_id,
                count = page.results.len(),
                has_more = page.has_more,
                "queried database page"
            );
            let done = page.results.is_empty() || !page.has_more;
            pages.extend(page.results);
            match page.next_cursor {
                Some(next) if !done => cursor = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }

    fn update_select(
        &self,
        page_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), NotionError> {
        let body = json!({
            "properties": {
                property: { "select": { "name": value } }
            }
        });
        let request = self.http.patch(self.url(&format!("pages/{page_id}"))).json(&body);
        let _: Value = self.send(request)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = NotionClient::with_base_url("t", "http://localhost:8080/v1");
        assert_eq!(
            client.url("blocks/abc/children"),
            "http://localhost:8080/v1/blocks/abc/children"
        );
    }

    #[test]
    fn paginated_block_listing_decodes() {
        let json = r#"{
            "object": "list",
            "results": [ { "id": "d", "type": "divider", "divider": {}, "has_children": false } ],
            "next_cursor": "abc",
            "has_more": true
        }"#;
        let page: Paginated<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert!(page.has_more);
    }
}
