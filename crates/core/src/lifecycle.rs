//! Archive / restore / purge lifecycle shared by every collection.
//!
//! Items move `initial -> (editor statuses)* -> Archived`, and from
//! `Archived` either back to the collection's restore status or out of the
//! store entirely. Deleting is always two-step: a live item can only be
//! archived, and only an archived item can be purged.

use serde::{Deserialize, Serialize};

use crate::content::{ContentItem, ItemId, Status};

/// Which partition of a collection the console is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Active,
    Archived,
}

impl ViewMode {
    /// The partition an item belongs to. Every item maps to exactly one.
    pub fn of(item: &ContentItem) -> ViewMode {
        if item.is_archived() {
            ViewMode::Archived
        } else {
            ViewMode::Active
        }
    }

    pub fn includes(self, item: &ContentItem) -> bool {
        ViewMode::of(item) == self
    }
}

/// A collection split into its two partitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    pub active: Vec<ContentItem>,
    pub archived: Vec<ContentItem>,
}

impl Partitioned {
    pub fn into_view(self, mode: ViewMode) -> Vec<ContentItem> {
        match mode {
            ViewMode::Active => self.active,
            ViewMode::Archived => self.archived,
        }
    }
}

/// Split items into the active and archived partitions, preserving order.
pub fn partition(items: Vec<ContentItem>) -> Partitioned {
    let (archived, active): (Vec<_>, Vec<_>) =
        items.into_iter().partition(ContentItem::is_archived);
    Partitioned { active, archived }
}

/// Items shown in `mode`.
pub fn visible(items: Vec<ContentItem>, mode: ViewMode) -> Vec<ContentItem> {
    partition(items).into_view(mode)
}

/// A lifecycle step and the store mutation it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transition {
    /// Soft delete: one status update to `Archived`.
    Archive { id: ItemId },
    /// Status update back to the collection's restore status.
    Restore { id: ItemId, to: Status },
    /// Hard delete: the row is removed.
    Purge { id: ItemId },
}

/// Copy for the confirmation dialog of a destructive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub title: String,
    pub body: String,
    pub confirm_label: &'static str,
    /// True when the action cannot be undone.
    pub irreversible: bool,
}

/// The two meanings of the console's "delete" gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteKind {
    Archive,
    Purge,
}

impl DeleteKind {
    pub fn confirmation(self, item: &ContentItem) -> Confirmation {
        let name = item
            .title()
            .map(|t| format!("\"{t}\""))
            .unwrap_or_else(|| format!("item #{}", item.id));
        match self {
            DeleteKind::Archive => Confirmation {
                title: "Archive item?".to_string(),
                body: format!(
                    "{name} will be hidden from {} and moved to the archive. You can restore it later.",
                    item.collection.label()
                ),
                confirm_label: "Archive",
                irreversible: false,
            },
            DeleteKind::Purge => Confirmation {
                title: "Delete permanently?".to_string(),
                body: format!(
                    "{name} will be removed from {} for good. This cannot be undone.",
                    item.collection.label()
                ),
                confirm_label: "Delete forever",
                irreversible: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("item {0} is already archived")]
    AlreadyArchived(ItemId),
    #[error("item {0} must be archived before it can be permanently deleted")]
    NotArchived(ItemId),
    #[error("item {0} can only be restored from the archive view")]
    RestoreOutsideArchive(ItemId),
    #[error("item {0} is archived; restore it before editing")]
    EditWhileArchived(ItemId),
}

/// Map the single "delete" gesture to its meaning: purge when the item is
/// archived or the archive is being viewed, archive otherwise.
pub fn resolve_delete(item: &ContentItem, mode: ViewMode) -> DeleteKind {
    if item.is_archived() || mode == ViewMode::Archived {
        DeleteKind::Purge
    } else {
        DeleteKind::Archive
    }
}

/// Editor saves only apply to live items.
pub fn ensure_editable(item: &ContentItem) -> Result<(), LifecycleError> {
    if item.is_archived() {
        return Err(LifecycleError::EditWhileArchived(item.id));
    }
    Ok(())
}

/// Soft delete. Refused for an item that is already archived.
pub fn archive(item: &ContentItem) -> Result<Transition, LifecycleError> {
    if item.is_archived() {
        return Err(LifecycleError::AlreadyArchived(item.id));
    }
    Ok(Transition::Archive { id: item.id })
}

/// Hard delete. Only reachable for an archived item.
pub fn purge(item: &ContentItem) -> Result<Transition, LifecycleError> {
    if !item.is_archived() {
        return Err(LifecycleError::NotArchived(item.id));
    }
    Ok(Transition::Purge { id: item.id })
}

/// Move an archived item back to its collection's restore status. Only
/// offered while the archive is being viewed.
pub fn restore(item: &ContentItem, mode: ViewMode) -> Result<Transition, LifecycleError> {
    if mode != ViewMode::Archived {
        return Err(LifecycleError::RestoreOutsideArchive(item.id));
    }
    if !item.is_archived() {
        return Err(LifecycleError::NotArchived(item.id));
    }
    Ok(Transition::Restore {
        id: item.id,
        to: item.collection.restore_status(),
    })
}
