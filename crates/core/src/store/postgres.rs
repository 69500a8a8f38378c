//! Postgres backend. Table names come from [`Collection::table`], which only
//! yields static identifiers, so they are interpolated into the SQL text;
//! every value is bound.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ContentStore, Credentials, ItemPatch, NewItem, ProfileStore, SiteStore, StoreError,
};
use crate::access::Role;
use crate::content::{Category, Collection, ContentItem, ItemId, Notification, SiteSetting, Status};
use crate::session::Profile;

const ITEM_COLUMNS: &str = "id, status, created_at, updated_at, author_id, data";
const PROFILE_COLUMNS: &str = "id, email, full_name, avatar_url, role, password_hash";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    author_id: Option<Uuid>,
    data: Value,
}

impl ItemRow {
    fn into_item(self, collection: Collection) -> Result<ContentItem, StoreError> {
        let status = Status::parse_for(collection, &self.status)
            .map_err(|e| StoreError::Corrupt(format!("{collection} row {}: {e}", self.id)))?;
        let fields = match self.data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(StoreError::Corrupt(format!(
                    "{collection} row {}: data is {other}, expected an object",
                    self.id
                )))
            }
        };
        Ok(ContentItem {
            id: self.id,
            collection,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author_id: self.author_id,
            fields,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    role: Option<String>,
    password_hash: Option<String>,
}

impl ProfileRow {
    fn split(self) -> (Profile, Option<String>) {
        let profile = Profile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            role: self.role.as_deref().and_then(Role::parse),
        };
        (profile, self.password_hash)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category {
            id: r.id,
            name: r.name,
            slug: r.slug,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    kind: String,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Notification {
            id: r.id,
            kind: r.kind,
            message: r.message,
            read: r.read,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettingRow {
    key: String,
    value: Value,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for SiteSetting {
    fn from(r: SettingRow) -> Self {
        SiteSetting {
            key: r.key,
            value: r.value,
            updated_at: r.updated_at,
        }
    }
}

/// Map a Postgres unique violation (23505) to [`StoreError::Conflict`].
fn map_unique(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Conflict(format!("{what} already exists"));
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ContentStore for PgStore {
    async fn select(&self, collection: Collection) -> Result<Vec<ContentItem>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} ORDER BY created_at DESC, id DESC",
            collection.table()
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_item(collection)).collect()
    }

    async fn fetch(
        &self,
        collection: Collection,
        id: ItemId,
    ) -> Result<Option<ContentItem>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE id = $1",
            collection.table()
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_item(collection)).transpose()
    }

    async fn insert(
        &self,
        collection: Collection,
        item: NewItem,
    ) -> Result<ContentItem, StoreError> {
        let sql = format!(
            "INSERT INTO {} (status, author_id, data) VALUES ($1, $2, $3) RETURNING {ITEM_COLUMNS}",
            collection.table()
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item.status.as_str())
            .bind(item.author_id)
            .bind(Value::Object(item.fields))
            .fetch_one(&self.pool)
            .await?;
        row.into_item(collection)
    }

    async fn update(
        &self,
        collection: Collection,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET status = COALESCE($2, status), data = COALESCE($3, data), \
             updated_at = now() WHERE id = $1",
            collection.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(patch.status.map(Status::as_str))
            .bind(patch.fields.map(Value::Object))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: ItemId) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.split().0))
    }

    async fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.split().0).collect())
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.split().0))
    }

    async fn credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|r| {
            let (profile, hash) = r.split();
            hash.map(|password_hash| Credentials {
                profile,
                password_hash,
            })
        }))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY email");
        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.split().0).collect())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE profiles SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: "profiles",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn create_profile(
        &self,
        profile: Profile,
        password_hash: String,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (id, email, full_name, avatar_url, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(profile.role.map(Role::as_str))
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &format!("profile {}", profile.email)))?;
        Ok(())
    }
}

#[async_trait]
impl SiteStore for PgStore {
    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, StoreError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) \
             RETURNING id, name, slug, created_at",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, &format!("category '{slug}'")))?;
        Ok(row.into())
    }

    async fn delete_category(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: "categories",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn notifications(&self, limit: i64) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, kind, message, read, created_at FROM notifications \
             ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn insert_notification(
        &self,
        kind: &str,
        message: &str,
    ) -> Result<Notification, StoreError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (kind, message) VALUES ($1, $2) \
             RETURNING id, kind, message, read, created_at",
        )
        .bind(kind)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn mark_notification_read(&self, id: ItemId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: "notifications",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn setting(&self, key: &str) -> Result<Option<SiteSetting>, StoreError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_at FROM site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SiteSetting::from))
    }

    async fn put_setting(&self, key: &str, value: Value) -> Result<SiteSetting, StoreError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "INSERT INTO site_settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
