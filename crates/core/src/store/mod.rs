//! Content store interface and its two backends.
//!
//! [`ContentStore`] covers the five manageable collections, [`ProfileStore`]
//! the identity profiles, and [`SiteStore`] the supporting tables
//! (categories, notifications, site settings). [`MemoryStore`] implements all
//! three for development and tests; [`PgStore`] is the Postgres backend.

pub mod memory;
pub mod mutation;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::access::Role;
use crate::content::{Category, Collection, ContentItem, ItemId, Notification, SiteSetting};
use crate::session::Profile;

pub use memory::MemoryStore;
pub use mutation::{ItemPatch, NewItem, StoreCall};
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("stored row is invalid: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(collection: Collection, id: ItemId) -> Self {
        StoreError::NotFound {
            table: collection.table(),
            id: id.to_string(),
        }
    }
}

/// A profile together with its stored password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub profile: Profile,
    pub password_hash: String,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every row of the collection, newest first.
    async fn select(&self, collection: Collection) -> Result<Vec<ContentItem>, StoreError>;

    async fn fetch(
        &self,
        collection: Collection,
        id: ItemId,
    ) -> Result<Option<ContentItem>, StoreError>;

    async fn insert(&self, collection: Collection, item: NewItem)
        -> Result<ContentItem, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row matched.
    async fn update(
        &self,
        collection: Collection,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row matched.
    async fn delete(&self, collection: Collection, id: ItemId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Profiles for the given ids. Unknown ids are skipped.
    async fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError>;

    /// Profile with this email (case-insensitive), whether or not it can
    /// sign in with a password.
    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    async fn credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), StoreError>;

    async fn create_profile(&self, profile: Profile, password_hash: String)
        -> Result<(), StoreError>;
}

#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, StoreError>;

    async fn delete_category(&self, id: ItemId) -> Result<(), StoreError>;

    /// Most recent first.
    async fn notifications(&self, limit: i64) -> Result<Vec<Notification>, StoreError>;

    async fn insert_notification(
        &self,
        kind: &str,
        message: &str,
    ) -> Result<Notification, StoreError>;

    async fn mark_notification_read(&self, id: ItemId) -> Result<(), StoreError>;

    async fn setting(&self, key: &str) -> Result<Option<SiteSetting>, StoreError>;

    async fn put_setting(&self, key: &str, value: Value) -> Result<SiteSetting, StoreError>;
}
