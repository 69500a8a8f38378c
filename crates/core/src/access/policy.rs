//! The permission policy: a pure, total function of
//! `(role, collection, operation) -> allow/deny`.
//!
//! Every surface that shows or performs an action (navigation, per-row
//! action sets, mutation handlers) asks this module and nothing else. A
//! missing or unrecognised role is represented as `None` and is denied
//! everything.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::content::{Collection, ContentItem};
use crate::lifecycle::ViewMode;
use crate::session::SessionState;

/// Operations gated per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    View,
    Create,
    Edit,
    Archive,
    Restore,
    /// Permanent delete.
    Purge,
    ManageCategories,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::List,
        Operation::View,
        Operation::Create,
        Operation::Edit,
        Operation::Archive,
        Operation::Restore,
        Operation::Purge,
        Operation::ManageCategories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::View => "view",
            Operation::Create => "create",
            Operation::Edit => "edit",
            Operation::Archive => "archive",
            Operation::Restore => "restore",
            Operation::Purge => "purge",
            Operation::ManageCategories => "manage_categories",
        }
    }

    fn is_read(self) -> bool {
        matches!(self, Operation::List | Operation::View)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Console capabilities that are not tied to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageRoles,
    ViewTeam,
    ViewSettings,
    ManageSettings,
    ReadNotifications,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::ManageRoles,
        Capability::ViewTeam,
        Capability::ViewSettings,
        Capability::ManageSettings,
        Capability::ReadNotifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ManageRoles => "manage_roles",
            Capability::ViewTeam => "view_team",
            Capability::ViewSettings => "view_settings",
            Capability::ManageSettings => "manage_settings",
            Capability::ReadNotifications => "read_notifications",
        }
    }
}

/// Whether `role` may perform `operation` on `collection`.
pub fn allows(role: Option<Role>, collection: Collection, operation: Operation) -> bool {
    match role {
        None => false,
        Some(Role::Admin) => true,
        Some(Role::Manager) => operation.is_read(),
        Some(Role::Blogger) => collection == Collection::Posts && operation != Operation::Purge,
    }
}

/// Whether `role` holds a console-wide capability.
pub fn has_capability(role: Option<Role>, capability: Capability) -> bool {
    match (role, capability) {
        (Some(Role::Admin), _) => true,
        (Some(Role::Manager), Capability::ViewSettings) => true,
        (Some(_), Capability::ReadNotifications) => true,
        _ => false,
    }
}

/// Capabilities held by `role`, for the console navigation.
pub fn capabilities(role: Option<Role>) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|c| has_capability(role, *c))
        .collect()
}

/// Collections shown in the console navigation for `role`.
pub fn visible_collections(role: Option<Role>) -> Vec<Collection> {
    Collection::ALL
        .into_iter()
        .filter(|c| allows(role, *c, Operation::List))
        .collect()
}

/// A refused operation, carrying enough context to render an explicit
/// "access denied" state rather than an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} cannot {operation} {target}", role_label(.role))]
pub struct AccessDenied {
    pub role: Option<Role>,
    pub operation: String,
    pub target: String,
}

fn role_label(role: &Option<Role>) -> String {
    match role {
        Some(r) => format!("role '{r}'"),
        None => "a user without a role".to_string(),
    }
}

impl AccessDenied {
    pub fn collection(role: Option<Role>, collection: Collection, operation: Operation) -> Self {
        Self {
            role,
            operation: operation.as_str().to_string(),
            target: collection.table().to_string(),
        }
    }

    pub fn capability(role: Option<Role>, capability: Capability) -> Self {
        Self {
            role,
            operation: capability.as_str().to_string(),
            target: "console".to_string(),
        }
    }
}

/// Check a collection operation against the session's role.
pub fn authorize(
    session: &SessionState,
    collection: Collection,
    operation: Operation,
) -> Result<(), AccessDenied> {
    let role = session.role();
    if allows(role, collection, operation) {
        Ok(())
    } else {
        Err(AccessDenied::collection(role, collection, operation))
    }
}

/// Check a console capability against the session's role.
pub fn authorize_capability(
    session: &SessionState,
    capability: Capability,
) -> Result<(), AccessDenied> {
    let role = session.role();
    if has_capability(role, capability) {
        Ok(())
    } else {
        Err(AccessDenied::capability(role, capability))
    }
}

/// Per-row action set, each flag gated individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowActions {
    pub edit: bool,
    pub archive: bool,
    pub restore: bool,
    pub purge: bool,
}

impl RowActions {
    pub fn is_empty(&self) -> bool {
        !(self.edit || self.archive || self.restore || self.purge)
    }
}

/// Actions offered for `item` while the collection is shown in `mode`.
///
/// Active view offers edit and archive on live rows; the archived view offers
/// restore and purge on archived rows.
pub fn row_actions(
    role: Option<Role>,
    collection: Collection,
    item: &ContentItem,
    mode: ViewMode,
) -> RowActions {
    let can = |op| allows(role, collection, op);
    match mode {
        ViewMode::Active if !item.is_archived() => RowActions {
            edit: can(Operation::Edit),
            archive: can(Operation::Archive),
            ..RowActions::default()
        },
        ViewMode::Archived if item.is_archived() => RowActions {
            restore: can(Operation::Restore),
            purge: can(Operation::Purge),
            ..RowActions::default()
        },
        _ => RowActions::default(),
    }
}
