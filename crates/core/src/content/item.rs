use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::collection::Collection;
use super::status::Status;

/// Opaque row identifier, stable for the item's lifetime.
pub type ItemId = i64;

/// A row of one of the five manageable collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub collection: Collection,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Weak reference to the creating profile. Only set for posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    /// Editor fields, stored as a JSON object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    pub fn is_archived(&self) -> bool {
        self.status.is_archived()
    }

    /// Best-effort display title, used in logs and confirmation copy.
    pub fn title(&self) -> Option<&str> {
        ["title", "name", "client_name"]
            .iter()
            .find_map(|k| self.fields.get(*k).and_then(Value::as_str))
    }
}

/// Weak author projection joined onto post rows for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Blog taxonomy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: ItemId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Admin console notification, e.g. "new lead from ...".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: ItemId,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored page-section configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}
