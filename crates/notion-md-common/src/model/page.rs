use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::block::FileSource;
use super::rich_text::{RichText, plain_text};

/// A database row: metadata plus the property bag front matter is built from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub cover: Option<FileSource>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Page {
    pub fn new(id: impl Into<String>, created: DateTime<Utc>, last_edited: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_time: created,
            last_edited_time: last_edited,
            cover: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// The single title-typed property, whatever it is called.
    pub fn title_property(&self) -> Option<&PropertyValue> {
        self.properties
            .values()
            .find(|value| matches!(value, PropertyValue::Title { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Select {
        select: Option<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    People {
        #[serde(default)]
        people: Vec<User>,
    },
    CreatedBy {
        created_by: User,
    },
    LastEditedBy {
        last_edited_by: User,
    },
    Date {
        date: Option<DateRange>,
    },
    CreatedTime {
        created_time: DateTime<Utc>,
    },
    LastEditedTime {
        last_edited_time: DateTime<Utc>,
    },
    Number {
        number: Option<f64>,
    },
    Url {
        url: Option<String>,
    },
    Email {
        email: Option<String>,
    },
    PhoneNumber {
        phone_number: Option<String>,
    },
    Checkbox {
        checkbox: bool,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    pub fn title(text: impl Into<String>) -> Self {
        PropertyValue::Title {
            title: vec![RichText::plain(text)],
        }
    }

    pub fn rich_text(text: impl Into<String>) -> Self {
        PropertyValue::RichText {
            rich_text: vec![RichText::plain(text)],
        }
    }

    pub fn select(name: impl Into<String>) -> Self {
        PropertyValue::Select {
            select: Some(SelectOption::named(name)),
        }
    }

    pub fn multi_select<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::MultiSelect {
            multi_select: names.into_iter().map(SelectOption::named).collect(),
        }
    }

    /// API name of the property's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Title { .. } => "title",
            PropertyValue::RichText { .. } => "rich_text",
            PropertyValue::Select { .. } => "select",
            PropertyValue::Status { .. } => "status",
            PropertyValue::MultiSelect { .. } => "multi_select",
            PropertyValue::People { .. } => "people",
            PropertyValue::CreatedBy { .. } => "created_by",
            PropertyValue::LastEditedBy { .. } => "last_edited_by",
            PropertyValue::Date { .. } => "date",
            PropertyValue::CreatedTime { .. } => "created_time",
            PropertyValue::LastEditedTime { .. } => "last_edited_time",
            PropertyValue::Number { .. } => "number",
            PropertyValue::Url { .. } => "url",
            PropertyValue::Email { .. } => "email",
            PropertyValue::PhoneNumber { .. } => "phone_number",
            PropertyValue::Checkbox { .. } => "checkbox",
            PropertyValue::Unsupported => "unsupported",
        }
    }

    /// Plain text of text-bearing properties (title and rich text).
    pub fn as_text(&self) -> Option<String> {
        match self {
            PropertyValue::Title { title } => Some(plain_text(title)),
            PropertyValue::RichText { rich_text } => Some(plain_text(rich_text)),
            _ => None,
        }
    }

    /// Option names of select-like properties, in order.
    pub fn as_names(&self) -> Option<Vec<String>> {
        match self {
            PropertyValue::Select { select } | PropertyValue::Status { status: select } => {
                Some(select.iter().map(|o| o.name.clone()).collect())
            }
            PropertyValue::MultiSelect { multi_select } => {
                Some(multi_select.iter().map(|o| o.name.clone()).collect())
            }
            _ => None,
        }
    }

    pub fn select_name(&self) -> Option<&str> {
        match self {
            PropertyValue::Select { select } | PropertyValue::Status { status: select } => {
                select.as_ref().map(|o| o.name.as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectOption {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRange {
    /// Start of the range. Plain dates are taken as midnight UTC.
    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.start) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&self.start, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}
