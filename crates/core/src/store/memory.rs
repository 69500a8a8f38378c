use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{
    ContentStore, Credentials, ItemPatch, NewItem, ProfileStore, SiteStore, StoreCall, StoreError,
};
use crate::access::Role;
use crate::content::{Category, Collection, ContentItem, ItemId, Notification, SiteSetting, Status};
use crate::session::Profile;

/// In-process store backing local development and tests.
///
/// Every call against a collection table is appended to a call log so tests
/// can assert exactly which reads and writes an operation issued. Writes can
/// be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: ItemId,
    items: HashMap<Collection, BTreeMap<ItemId, ContentItem>>,
    profiles: HashMap<Uuid, (Profile, Option<String>)>,
    categories: BTreeMap<ItemId, Category>,
    notifications: BTreeMap<ItemId, Notification>,
    settings: BTreeMap<String, SiteSetting>,
    calls: Vec<StoreCall>,
    fail_writes: Option<String>,
}

impl Inner {
    fn next_id(&mut self) -> ItemId {
        self.next_id += 1;
        self.next_id
    }

    fn check_write(&self) -> Result<(), StoreError> {
        match &self.fail_writes {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn table(&mut self, collection: Collection) -> &mut BTreeMap<ItemId, ContentItem> {
        self.items.entry(collection).or_default()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a row as-is, bypassing the call log.
    pub fn seed_item(&self, item: ContentItem) {
        let mut inner = self.lock();
        inner.next_id = inner.next_id.max(item.id);
        inner.table(item.collection).insert(item.id, item);
    }

    /// Insert a new row with a fresh id, bypassing the call log.
    pub fn seed(
        &self,
        collection: Collection,
        status: Status,
        fields: Map<String, Value>,
    ) -> ContentItem {
        let mut inner = self.lock();
        let id = inner.next_id();
        let item = ContentItem {
            id,
            collection,
            status,
            created_at: Utc::now(),
            updated_at: None,
            author_id: None,
            fields,
        };
        inner.table(collection).insert(id, item.clone());
        item
    }

    pub fn seed_profile(&self, profile: Profile, password_hash: Option<String>) {
        self.lock()
            .profiles
            .insert(profile.id, (profile, password_hash));
    }

    /// Calls made against collection tables, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`]
    /// until called again with `None`.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.lock().fail_writes = reason.map(str::to_string);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn select(&self, collection: Collection) -> Result<Vec<ContentItem>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Select { collection });
        let mut rows: Vec<ContentItem> = inner.table(collection).values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn fetch(
        &self,
        collection: Collection,
        id: ItemId,
    ) -> Result<Option<ContentItem>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Fetch { collection, id });
        Ok(inner.table(collection).get(&id).cloned())
    }

    async fn insert(
        &self,
        collection: Collection,
        item: NewItem,
    ) -> Result<ContentItem, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Insert { collection });
        inner.check_write()?;
        let id = inner.next_id();
        let row = ContentItem {
            id,
            collection,
            status: item.status,
            created_at: Utc::now(),
            updated_at: None,
            author_id: item.author_id,
            fields: item.fields,
        };
        inner.table(collection).insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        collection: Collection,
        id: ItemId,
        patch: ItemPatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Update {
            collection,
            id,
            status: patch.status,
        });
        inner.check_write()?;
        let row = inner
            .table(collection)
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(fields) = patch.fields {
            row.fields = fields;
        }
        row.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: ItemId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Delete { collection, id });
        inner.check_write()?;
        inner
            .table(collection)
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock().profiles.get(&id).map(|(p, _)| p.clone()))
    }

    async fn profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        let inner = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).map(|(p, _)| p.clone()))
            .collect())
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .lock()
            .profiles
            .values()
            .find(|(p, _)| p.email.eq_ignore_ascii_case(email))
            .map(|(p, _)| p.clone()))
    }

    async fn credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let inner = self.lock();
        Ok(inner.profiles.values().find_map(|(p, hash)| {
            let hash = hash.as_ref()?;
            p.email.eq_ignore_ascii_case(email).then(|| Credentials {
                profile: p.clone(),
                password_hash: hash.clone(),
            })
        }))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let mut all: Vec<Profile> = self
            .lock()
            .profiles
            .values()
            .map(|(p, _)| p.clone())
            .collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        let (profile, _) = inner.profiles.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            table: "profiles",
            id: id.to_string(),
        })?;
        profile.role = Some(role);
        Ok(())
    }

    async fn create_profile(
        &self,
        profile: Profile,
        password_hash: String,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        if inner
            .profiles
            .values()
            .any(|(p, _)| p.email.eq_ignore_ascii_case(&profile.email))
        {
            return Err(StoreError::Conflict(format!(
                "profile with email {} already exists",
                profile.email
            )));
        }
        inner
            .profiles
            .insert(profile.id, (profile, Some(password_hash)));
        Ok(())
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut all: Vec<Category> = self.lock().categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        if inner.categories.values().any(|c| c.slug == slug) {
            return Err(StoreError::Conflict(format!("category '{slug}' already exists")));
        }
        let id = inner.next_id();
        let category = Category {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now(),
        };
        inner.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: ItemId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        inner
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                table: "categories",
                id: id.to_string(),
            })
    }

    async fn notifications(&self, limit: i64) -> Result<Vec<Notification>, StoreError> {
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .lock()
            .notifications
            .values()
            .rev()
            .take(take)
            .cloned()
            .collect())
    }

    async fn insert_notification(
        &self,
        kind: &str,
        message: &str,
    ) -> Result<Notification, StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        let id = inner.next_id();
        let notification = Notification {
            id,
            kind: kind.to_string(),
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        inner.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn mark_notification_read(&self, id: ItemId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        let n = inner
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                table: "notifications",
                id: id.to_string(),
            })?;
        n.read = true;
        Ok(())
    }

    async fn setting(&self, key: &str) -> Result<Option<SiteSetting>, StoreError> {
        Ok(self.lock().settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: Value) -> Result<SiteSetting, StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        let setting = SiteSetting {
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        };
        inner.settings.insert(key.to_string(), setting.clone());
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn fields(title: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("title".into(), json!(title));
        m
    }

    #[tokio::test]
    async fn insert_update_delete_are_logged() {
        let store = MemoryStore::new();
        let row = store
            .insert(
                Collection::Services,
                NewItem {
                    status: Status::Draft,
                    author_id: None,
                    fields: fields("SEO"),
                },
            )
            .await
            .unwrap();
        store
            .update(Collection::Services, row.id, ItemPatch::status(Status::Archived))
            .await
            .unwrap();
        store.delete(Collection::Services, row.id).await.unwrap();

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Insert { collection: Collection::Services },
                StoreCall::Update {
                    collection: Collection::Services,
                    id: row.id,
                    status: Some(Status::Archived),
                },
                StoreCall::Delete { collection: Collection::Services, id: row.id },
            ]
        );
        assert!(store.select(Collection::Services).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn select_is_newest_first() {
        let store = MemoryStore::new();
        let a = store.seed(Collection::Posts, Status::Draft, fields("a"));
        let b = store.seed(Collection::Posts, Status::Draft, fields("b"));
        let ids: Vec<_> = store
            .select(Collection::Posts)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_rows_untouched() {
        let store = MemoryStore::new();
        let row = store.seed(Collection::Leads, Status::New, fields("x"));
        store.fail_writes(Some("offline"));
        assert_matches!(
            store
                .update(Collection::Leads, row.id, ItemPatch::status(Status::Archived))
                .await,
            Err(StoreError::Unavailable(_))
        );
        store.fail_writes(None);
        let fetched = store.fetch(Collection::Leads, row.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, Status::New);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = MemoryStore::new();
        assert_matches!(
            store.delete(Collection::Services, 42).await,
            Err(StoreError::NotFound { table: "services", .. })
        );
    }

    #[tokio::test]
    async fn duplicate_category_slug_conflicts() {
        let store = MemoryStore::new();
        store.insert_category("Design", "design").await.unwrap();
        assert_matches!(
            store.insert_category("Design", "design").await,
            Err(StoreError::Conflict(_))
        );
    }
}
