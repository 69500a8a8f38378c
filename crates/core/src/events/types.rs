use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{Collection, ItemId, Notification};

/// Events emitted after successful writes, consumed by console SSE listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConsoleEvent {
    Welcome,
    ItemChanged(ItemChangedEvent),
    Notification(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Archived,
    Restored,
    Purged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChangedEvent {
    pub collection: Collection,
    pub item_id: ItemId,
    pub change: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ItemChangedEvent {
    pub fn now(collection: Collection, item_id: ItemId, change: ChangeKind) -> Self {
        Self {
            collection,
            item_id,
            change,
            timestamp: Utc::now(),
        }
    }
}
