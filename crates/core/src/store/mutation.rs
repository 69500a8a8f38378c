//! Write payloads accepted by the content store, and the call log the
//! in-memory store keeps of them.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::content::{Collection, ItemId, Status};

/// Row to insert into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    pub fields: Map<String, Value>,
}

/// Partial update of a row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
}

impl ItemPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            fields: None,
        }
    }

    pub fn content(status: Status, fields: Map<String, Value>) -> Self {
        Self {
            status: Some(status),
            fields: Some(fields),
        }
    }
}

/// One call made against a collection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreCall {
    Select {
        collection: Collection,
    },
    Fetch {
        collection: Collection,
        id: ItemId,
    },
    Insert {
        collection: Collection,
    },
    Update {
        collection: Collection,
        id: ItemId,
        status: Option<Status>,
    },
    Delete {
        collection: Collection,
        id: ItemId,
    },
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreCall::Insert { .. } | StoreCall::Update { .. } | StoreCall::Delete { .. }
        )
    }
}
