//! Notion API request and response types
//!
//! Data structures for the subset of the Notion REST API (version
//! `2022-06-28`) used to mirror a directory tree into a database.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Property holding the row's display name (title)
pub const PROP_NAME: &str = "Name";
/// Property holding the relative-path identifier (rich text)
pub const PROP_RELATIVE_ID: &str = "RelativeID";
/// Property holding the extension or folder marker (rich text)
pub const PROP_EXTENSION: &str = "Extension";
/// Property holding the magic link (url)
pub const PROP_MAGIC_LINK: &str = "MagicLink";

/// Normalized database identifier
///
/// A 32-character hex id is rewritten to hyphenated UUID form, so both the
/// copy-pasted URL form and the API form address the same database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseId(String);

impl DatabaseId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if matches!(trimmed.len(), 32 | 36) {
            if let Ok(uuid) = Uuid::try_parse(trimmed) {
                return Self(uuid.hyphenated().to_string());
            }
        }
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /databases/{id}/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
}

impl QueryRequest {
    /// One page of the full listing
    pub fn page(page_size: u32, start_cursor: Option<String>) -> Self {
        Self {
            page_size: Some(page_size),
            start_cursor,
            filter: None,
        }
    }

    /// Exact match on the `RelativeID` property
    pub fn by_relative_id(relative_id: &str) -> Self {
        Self {
            filter: Some(QueryFilter {
                property: PROP_RELATIVE_ID.to_string(),
                rich_text: TextCondition {
                    equals: relative_id.to_string(),
                },
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFilter {
    pub property: String,
    pub rich_text: TextCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextCondition {
    pub equals: String,
}

/// Response of `POST /databases/{id}/query`
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,

    #[serde(default)]
    pub has_more: bool,

    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Page (row) object, reduced to the fields we read
#[derive(Debug, Deserialize)]
pub struct Page {
    pub id: String,

    #[serde(default)]
    pub properties: PageProperties,
}

impl Page {
    /// Identifier stored in the row, if any
    pub fn relative_id(&self) -> Option<&str> {
        self.properties
            .relative_id
            .as_ref()?
            .rich_text
            .first()
            .map(RichText::content)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageProperties {
    #[serde(rename = "RelativeID")]
    pub relative_id: Option<RichTextProperty>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RichTextProperty {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub text: Option<TextContent>,

    #[serde(default)]
    pub plain_text: Option<String>,
}

impl RichText {
    pub fn content(&self) -> &str {
        self.text
            .as_ref()
            .map(|text| text.content.as_str())
            .or(self.plain_text.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// Response of `GET /databases/{id}`
#[derive(Debug, Deserialize)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub properties: HashMap<String, SchemaProperty>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Response of `POST /pages`
#[derive(Debug, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}

/// Error object returned with non-2xx statuses
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotionErrorBody {
    pub object: String,
    pub status: u16,
    pub code: String,
    pub message: String,
}

/// Page icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(rename = "type")]
    pub kind: String,
    pub emoji: String,
}

impl Icon {
    pub fn emoji(emoji: &str) -> Self {
        Self {
            kind: "emoji".to_string(),
            emoji: emoji.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseParent {
    pub database_id: String,
}

/// Body of `POST /pages`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePageRequest {
    pub parent: DatabaseParent,
    pub properties: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
}

/// Body of `PATCH /pages/{id}`
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl UpdatePageRequest {
    pub fn archive() -> Self {
        Self {
            archived: Some(true),
            ..Default::default()
        }
    }
}

/// Body of `PATCH /databases/{id}` adding a two-way self relation
pub fn self_relation_schema(property: &str, database_id: &DatabaseId) -> Value {
    json!({
        "properties": {
            property: {
                "relation": {
                    "database_id": database_id.as_str(),
                    "type": "dual_property",
                    "dual_property": {}
                }
            }
        }
    })
}

/// Core row properties: name, identifier, extension and link
pub fn row_properties(
    name: &str,
    relative_id: &str,
    extension: &str,
    magic_link: &str,
) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        PROP_NAME.to_string(),
        json!({ "title": [{ "text": { "content": name } }] }),
    );
    properties.insert(PROP_RELATIVE_ID.to_string(), rich_text(relative_id));
    properties.insert(PROP_EXTENSION.to_string(), rich_text(extension));
    properties.insert(PROP_MAGIC_LINK.to_string(), json!({ "url": magic_link }));
    properties
}

/// Relation property value pointing at one row
pub fn relation(row_id: &str) -> Value {
    json!({ "relation": [{ "id": row_id }] })
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}
