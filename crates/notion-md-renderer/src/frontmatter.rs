//! Page properties to the YAML preamble.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use notion_md_common::model::{Page, PropertyValue};
use serde_json::{Map, Value, json};
use yaml_rust2::yaml::Hash;
use yaml_rust2::{EmitError, Yaml, YamlEmitter};

use crate::assets::AssetResolver;
use crate::rich_text::render_rich_text;

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum FrontMatterError {
    #[error("could not serialize front matter")]
    #[diagnostic(code(notion_md::frontmatter::emit))]
    Emit(#[from] EmitError),
}

/// Which page properties feed the well-known front matter keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    /// Falls back to the page's title-typed property when unset or unusable.
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub categories: Option<String>,
    /// Also map every remaining property under its lower-cased name.
    pub include_all_properties: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

impl FrontMatterValue {
    fn to_yaml(&self) -> Yaml {
        match self {
            FrontMatterValue::String(s) => Yaml::String(s.clone()),
            FrontMatterValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Yaml::Integer(*n as i64)
            }
            FrontMatterValue::Number(n) => Yaml::Real(n.to_string()),
            FrontMatterValue::Bool(b) => Yaml::Boolean(*b),
            FrontMatterValue::List(items) => {
                Yaml::Array(items.iter().cloned().map(Yaml::String).collect())
            }
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FrontMatterValue::String(s) => json!(s),
            FrontMatterValue::Number(n) => json!(n),
            FrontMatterValue::Bool(b) => json!(b),
            FrontMatterValue::List(items) => json!(items),
        }
    }
}

/// Ordered, lower-cased key/value preamble.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: Vec<(String, FrontMatterValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: &str, value: FrontMatterValue) {
        let key = key.to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn insert_if_absent(&mut self, key: &str, value: FrontMatterValue) {
        if self.get(key).is_none() {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        let key = key.to_lowercase();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrontMatterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `---\n<yaml>\n---\n\n`, or nothing for an empty preamble.
    pub fn to_yaml_block(&self) -> Result<String, FrontMatterError> {
        if self.is_empty() {
            return Ok(String::new());
        }
        let mut hash = Hash::new();
        for (key, value) in &self.entries {
            hash.insert(Yaml::String(key.clone()), value.to_yaml());
        }
        let mut out = String::new();
        YamlEmitter::new(&mut out).dump(&Yaml::Hash(hash))?;
        // The emitter opens the document with `---` but never closes it.
        out.push_str("\n---\n\n");
        Ok(out)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Build the preamble for `page`.
///
/// Problems with individual properties are logged and the key skipped. A
/// cover that cannot be downloaded is left out.
pub fn extract_front_matter(
    page: &Page,
    fields: &FieldMap,
    resolver: Option<&dyn AssetResolver>,
) -> FrontMatter {
    let mut fm = FrontMatter::new();

    fm.insert("title", FrontMatterValue::String(page_title(page, fields.title.as_deref())));
    fm.insert("date", FrontMatterValue::String(format_date(&page.created_time)));
    fm.insert("lastmod", FrontMatterValue::String(format_date(&page.last_edited_time)));

    if let Some(name) = fields.description.as_deref() {
        match page.property(name) {
            Some(PropertyValue::Title { title: text } | PropertyValue::RichText { rich_text: text }) => {
                fm.insert("description", FrontMatterValue::String(render_rich_text(text)));
            }
            other => warn_unusable(name, "description", "rich text", other),
        }
    }

    for (key, name) in [("tags", &fields.tags), ("categories", &fields.categories)] {
        let Some(name) = name.as_deref() else {
            continue;
        };
        match page.property(name) {
            Some(PropertyValue::MultiSelect { multi_select }) => {
                let names = multi_select.iter().map(|o| o.name.clone()).collect();
                fm.insert(key, FrontMatterValue::List(names));
            }
            other => warn_unusable(name, key, "multi_select", other),
        }
    }

    if let Some(author) = page.properties.values().find_map(|value| match value {
        PropertyValue::CreatedBy { created_by } => created_by.name.clone(),
        _ => None,
    }) {
        fm.insert("author", FrontMatterValue::String(author));
    }

    if let (Some(cover), Some(resolver)) = (&page.cover, resolver) {
        match resolver.resolve(cover.url()) {
            Ok(path) => fm.insert("cover", FrontMatterValue::String(path)),
            Err(err) => tracing::warn!(page = %page.id, error = %err, "cover image unavailable"),
        }
    }

    if fields.include_all_properties {
        for (name, value) in &page.properties {
            match property_value(value) {
                Some(mapped) => fm.insert_if_absent(name, mapped),
                None => tracing::debug!(property = %name, kind = value.type_name(), "property not mapped"),
            }
        }
    }

    fm
}

pub fn page_title(page: &Page, configured: Option<&str>) -> String {
    if let Some(name) = configured {
        match page.property(name).and_then(PropertyValue::as_text) {
            Some(title) => return title,
            None => tracing::warn!(
                page = %page.id,
                property = name,
                "title property missing or not text, using the page title"
            ),
        }
    }
    page.title_property()
        .and_then(PropertyValue::as_text)
        .unwrap_or_default()
}

fn warn_unusable(name: &str, key: &str, expected: &str, found: Option<&PropertyValue>) {
    match found {
        None => tracing::warn!(property = name, key, "property not found, skipping"),
        Some(value) => tracing::warn!(
            property = name,
            key,
            expected,
            found = value.type_name(),
            "property has an unexpected type, skipping"
        ),
    }
}

/// Generic mapping used for `include_all_properties`.
fn property_value(value: &PropertyValue) -> Option<FrontMatterValue> {
    use FrontMatterValue as V;

    match value {
        PropertyValue::Title { title: text } | PropertyValue::RichText { rich_text: text } => {
            Some(V::String(render_rich_text(text)))
        }
        PropertyValue::Select { select: option } | PropertyValue::Status { status: option } => {
            option.as_ref().map(|o| V::String(o.name.clone()))
        }
        PropertyValue::MultiSelect { multi_select } => Some(V::List(
            multi_select.iter().map(|o| o.name.clone()).collect(),
        )),
        PropertyValue::People { people } => people.first().and_then(|u| u.name.clone()).map(V::String),
        PropertyValue::CreatedBy { created_by: user }
        | PropertyValue::LastEditedBy { last_edited_by: user } => user.name.clone().map(V::String),
        PropertyValue::Date { date } => date.as_ref().map(|range| {
            V::String(match range.start_datetime() {
                Some(start) => format_date(&start),
                None => range.start.clone(),
            })
        }),
        PropertyValue::CreatedTime { created_time: time }
        | PropertyValue::LastEditedTime { last_edited_time: time } => Some(V::String(format_date(time))),
        PropertyValue::Number { number } => number.map(V::Number),
        PropertyValue::Url { url: text }
        | PropertyValue::Email { email: text }
        | PropertyValue::PhoneNumber { phone_number: text } => text.clone().map(V::String),
        PropertyValue::Checkbox { checkbox } => Some(V::Bool(*checkbox)),
        PropertyValue::Unsupported => None,
    }
}
