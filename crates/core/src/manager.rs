//! Content Manager: wires the permission policy and the lifecycle rules to
//! the stores.
//!
//! Every operation checks the policy first, so a refused request never
//! reaches a store. Writes re-read the store before deciding a lifecycle
//! transition, apply exactly one mutation, and then re-fetch the whole
//! collection so callers always render the store's current truth.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::access::{
    authorize, authorize_capability, row_actions, AccessDenied, Capability, Operation, Role,
    RowActions,
};
use crate::content::{
    AuthorRef, Category, Collection, ContentItem, ItemId, Notification, SiteSetting, Status,
};
use crate::editor::{self, slugify, validate_section, EditorError, SectionError, SectionKey};
use crate::events::{ChangeKind, ConsoleEvent, EventBus, ItemChangedEvent};
use crate::lifecycle::{self, Confirmation, LifecycleError, Transition, ViewMode};
use crate::session::{Profile, SessionState};
use crate::store::{ContentStore, ItemPatch, NewItem, ProfileStore, SiteStore, StoreError};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error("{0}")]
    Invalid(String),

    #[error("{target} {id} not found")]
    NotFound { target: &'static str, id: String },

    #[error("a save is already in progress for {0}")]
    Busy(String),

    #[error("you cannot change your own role")]
    SelfRoleChange,

    #[error("{0} are not published on the public site")]
    NotPublic(Collection),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, id } => ManagerError::NotFound { target: table, id },
            other => ManagerError::Store(other),
        }
    }
}

/// What the console renders for a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectionView {
    /// Named refusal. Rendered instead of an empty list.
    AccessDenied {
        collection: Collection,
        role: Option<Role>,
        message: String,
    },
    Listing(Listing),
}

impl CollectionView {
    pub fn listing(&self) -> Option<&Listing> {
        match self {
            CollectionView::Listing(l) => Some(l),
            CollectionView::AccessDenied { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub collection: Collection,
    pub view: ViewMode,
    pub rows: Vec<Row>,
    pub counts: PartitionCounts,
}

impl Listing {
    pub fn ids(&self) -> Vec<ItemId> {
        self.rows.iter().map(|r| r.item.id).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionCounts {
    pub active: usize,
    pub archived: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub item: ContentItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRef>,
    pub actions: RowActions,
}

/// A single item opened in the console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub item: ContentItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRef>,
    pub actions: RowActions,
    /// Copy for the delete gesture in the item's own partition.
    pub delete: Confirmation,
}

/// Result of a write: the affected id and the re-fetched listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub item_id: ItemId,
    pub listing: Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WriteKey {
    Create(Collection),
    Item(Collection, ItemId),
}

impl WriteKey {
    fn describe(self) -> String {
        match self {
            WriteKey::Create(c) => format!("a new {} item", c.label()),
            WriteKey::Item(c, id) => format!("{} {id}", c.table()),
        }
    }
}

/// Held for the duration of one write; releases its key on drop.
#[derive(Debug)]
struct PendingWrite {
    pending: Arc<Mutex<HashSet<WriteKey>>>,
    key: WriteKey,
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Clone)]
pub struct ContentManager {
    content: Arc<dyn ContentStore>,
    profiles: Arc<dyn ProfileStore>,
    site: Arc<dyn SiteStore>,
    events: EventBus,
    pending: Arc<Mutex<HashSet<WriteKey>>>,
}

impl ContentManager {
    pub fn new(
        content: Arc<dyn ContentStore>,
        profiles: Arc<dyn ProfileStore>,
        site: Arc<dyn SiteStore>,
        events: EventBus,
    ) -> Self {
        Self {
            content,
            profiles,
            site,
            events,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn begin_write(&self, key: WriteKey) -> Result<PendingWrite, ManagerError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key) {
            return Err(ManagerError::Busy(key.describe()));
        }
        Ok(PendingWrite {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    fn publish_change(&self, collection: Collection, item_id: ItemId, change: ChangeKind) {
        let receivers = self.events.publish(ConsoleEvent::ItemChanged(ItemChangedEvent::now(
            collection, item_id, change,
        )));
        tracing::debug!(%collection, item_id, ?change, receivers, "Published item change");
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    /// Render a collection in `mode`. A role without `list` gets an
    /// access-denied view and no store call is made.
    pub async fn list(
        &self,
        session: &SessionState,
        collection: Collection,
        mode: ViewMode,
    ) -> Result<CollectionView, ManagerError> {
        if let Err(denied) = authorize(session, collection, Operation::List) {
            tracing::info!(%collection, role = ?denied.role, "Collection listing denied");
            return Ok(CollectionView::AccessDenied {
                collection,
                role: denied.role,
                message: denied.to_string(),
            });
        }
        let listing = self.fetch_listing(session.role(), collection, mode).await?;
        Ok(CollectionView::Listing(listing))
    }

    async fn fetch_listing(
        &self,
        role: Option<Role>,
        collection: Collection,
        mode: ViewMode,
    ) -> Result<Listing, StoreError> {
        let split = lifecycle::partition(self.content.select(collection).await?);
        let counts = PartitionCounts {
            active: split.active.len(),
            archived: split.archived.len(),
        };
        let items = split.into_view(mode);

        let authors = if collection.has_author() {
            self.authors(&items).await
        } else {
            HashMap::new()
        };

        let rows = items
            .into_iter()
            .map(|item| Row {
                actions: row_actions(role, collection, &item, mode),
                author: item.author_id.and_then(|id| authors.get(&id).cloned()),
                item,
            })
            .collect();

        Ok(Listing {
            collection,
            view: mode,
            rows,
            counts,
        })
    }

    /// Author references for `items`. The join is weak: a failed lookup
    /// renders rows without authors instead of failing the listing.
    async fn authors(&self, items: &[ContentItem]) -> HashMap<Uuid, AuthorRef> {
        let mut ids: Vec<Uuid> = items.iter().filter_map(|i| i.author_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.profiles.profiles(&ids).await {
            Ok(profiles) => profiles
                .into_iter()
                .map(|p| {
                    (
                        p.id,
                        AuthorRef {
                            id: p.id,
                            full_name: p.full_name,
                            avatar_url: p.avatar_url,
                        },
                    )
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Author lookup failed; rendering rows without authors");
                HashMap::new()
            }
        }
    }

    async fn fetch_item(
        &self,
        collection: Collection,
        id: ItemId,
    ) -> Result<ContentItem, ManagerError> {
        self.content
            .fetch(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id).into())
    }

    pub async fn item(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
    ) -> Result<ItemView, ManagerError> {
        authorize(session, collection, Operation::View)?;
        let item = self.fetch_item(collection, id).await?;
        let mode = ViewMode::of(&item);
        let author = if collection.has_author() {
            self.authors(std::slice::from_ref(&item))
                .await
                .into_values()
                .next()
        } else {
            None
        };
        Ok(ItemView {
            actions: row_actions(session.role(), collection, &item, mode),
            delete: lifecycle::resolve_delete(&item, mode).confirmation(&item),
            author,
            item,
        })
    }

    /// Save a new item from an editor payload. Posts record the session's
    /// profile as author.
    pub async fn create(
        &self,
        session: &SessionState,
        collection: Collection,
        payload: Value,
    ) -> Result<Mutation, ManagerError> {
        authorize(session, collection, Operation::Create)?;
        let draft = editor::parse_payload(collection, payload)?;
        let _write = self.begin_write(WriteKey::Create(collection))?;

        let author_id = if collection.has_author() {
            session.user_id()
        } else {
            None
        };
        let item = self
            .content
            .insert(
                collection,
                NewItem {
                    status: draft.status,
                    author_id,
                    fields: draft.fields,
                },
            )
            .await?;
        tracing::info!(%collection, item_id = item.id, status = %item.status, "Item created");
        self.publish_change(collection, item.id, ChangeKind::Created);

        let listing = self
            .fetch_listing(session.role(), collection, ViewMode::Active)
            .await?;
        Ok(Mutation {
            item_id: item.id,
            listing,
        })
    }

    /// Save editor changes to a live item. The author reference is never
    /// touched.
    pub async fn edit(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
        payload: Value,
    ) -> Result<Mutation, ManagerError> {
        authorize(session, collection, Operation::Edit)?;
        let draft = editor::parse_payload(collection, payload)?;
        let _write = self.begin_write(WriteKey::Item(collection, id))?;

        let current = self.fetch_item(collection, id).await?;
        lifecycle::ensure_editable(&current)?;
        self.content
            .update(collection, id, ItemPatch::content(draft.status, draft.fields))
            .await?;
        tracing::info!(%collection, item_id = id, status = %draft.status, "Item updated");
        self.publish_change(collection, id, ChangeKind::Updated);

        let listing = self
            .fetch_listing(session.role(), collection, ViewMode::Active)
            .await?;
        Ok(Mutation {
            item_id: id,
            listing,
        })
    }

    /// Soft delete. The row stays and moves to the archived partition.
    pub async fn archive(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
    ) -> Result<Mutation, ManagerError> {
        authorize(session, collection, Operation::Archive)?;
        self.transition(session, collection, id, ViewMode::Active, lifecycle::archive)
            .await
    }

    /// Hard delete of an archived item. Irreversible.
    pub async fn purge(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
    ) -> Result<Mutation, ManagerError> {
        authorize(session, collection, Operation::Purge)?;
        self.transition(session, collection, id, ViewMode::Archived, lifecycle::purge)
            .await
    }

    /// Move an archived item back to the collection's restore status.
    /// Only offered while the archived view is shown.
    pub async fn restore(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
        mode: ViewMode,
    ) -> Result<Mutation, ManagerError> {
        authorize(session, collection, Operation::Restore)?;
        self.transition(session, collection, id, ViewMode::Archived, |item| {
            lifecycle::restore(item, mode)
        })
        .await
    }

    /// The legacy single "delete" gesture: archive from the active view,
    /// purge from the archived view.
    pub async fn delete(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
        mode: ViewMode,
    ) -> Result<Mutation, ManagerError> {
        let gesture = match mode {
            ViewMode::Active => Operation::Archive,
            ViewMode::Archived => Operation::Purge,
        };
        authorize(session, collection, gesture)?;
        let item = self.fetch_item(collection, id).await?;
        match lifecycle::resolve_delete(&item, mode) {
            lifecycle::DeleteKind::Archive => self.archive(session, collection, id).await,
            lifecycle::DeleteKind::Purge => self.purge(session, collection, id).await,
        }
    }

    async fn transition<F>(
        &self,
        session: &SessionState,
        collection: Collection,
        id: ItemId,
        refetch: ViewMode,
        decide: F,
    ) -> Result<Mutation, ManagerError>
    where
        F: FnOnce(&ContentItem) -> Result<Transition, LifecycleError>,
    {
        let _write = self.begin_write(WriteKey::Item(collection, id))?;
        let current = self.fetch_item(collection, id).await?;
        let transition = decide(&current)?;

        let change = match transition {
            Transition::Archive { id } => {
                self.content
                    .update(collection, id, ItemPatch::status(Status::Archived))
                    .await?;
                ChangeKind::Archived
            }
            Transition::Restore { id, to } => {
                self.content
                    .update(collection, id, ItemPatch::status(to))
                    .await?;
                ChangeKind::Restored
            }
            Transition::Purge { id } => {
                self.content.delete(collection, id).await?;
                ChangeKind::Purged
            }
        };
        tracing::info!(%collection, item_id = id, ?change, "Lifecycle transition applied");
        self.publish_change(collection, id, change);

        let listing = self
            .fetch_listing(session.role(), collection, refetch)
            .await?;
        Ok(Mutation {
            item_id: id,
            listing,
        })
    }

    // ------------------------------------------------------------------
    // Public site
    // ------------------------------------------------------------------

    /// Live items of a publicly rendered collection, newest first.
    pub async fn public_items(
        &self,
        collection: Collection,
    ) -> Result<Vec<ContentItem>, ManagerError> {
        let live = collection
            .public_status()
            .ok_or(ManagerError::NotPublic(collection))?;
        let items = self.content.select(collection).await?;
        Ok(items.into_iter().filter(|i| i.status == live).collect())
    }

    pub async fn section(&self, key: SectionKey) -> Result<Option<SiteSetting>, ManagerError> {
        Ok(self.site.setting(key.as_str()).await?)
    }

    /// Record a contact-form submission as a `New` lead and raise a console
    /// notification for it.
    pub async fn intake_lead(
        &self,
        fields: Map<String, Value>,
    ) -> Result<(ContentItem, Notification), ManagerError> {
        let mut payload = fields;
        payload.remove("status");
        let draft = editor::parse_payload(Collection::Leads, Value::Object(payload))?;
        let lead = self
            .content
            .insert(
                Collection::Leads,
                NewItem {
                    status: Collection::Leads.initial_status(),
                    author_id: None,
                    fields: draft.fields,
                },
            )
            .await?;
        self.publish_change(Collection::Leads, lead.id, ChangeKind::Created);

        let who = lead.title().unwrap_or("website visitor");
        let notification = self
            .site
            .insert_notification("lead", &format!("New lead from {who}"))
            .await?;
        self.events
            .publish(ConsoleEvent::Notification(notification.clone()));
        tracing::info!(lead_id = lead.id, notification_id = notification.id, "Lead recorded");
        Ok((lead, notification))
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn categories(&self, session: &SessionState) -> Result<Vec<Category>, ManagerError> {
        authorize(session, Collection::Posts, Operation::List)?;
        Ok(self.site.categories().await?)
    }

    pub async fn create_category(
        &self,
        session: &SessionState,
        name: &str,
    ) -> Result<Category, ManagerError> {
        authorize(session, Collection::Posts, Operation::ManageCategories)?;
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(ManagerError::Invalid(
                "category name needs at least one letter or digit".to_string(),
            ));
        }
        let category = self.site.insert_category(name, &slug).await?;
        tracing::info!(category_id = category.id, %slug, "Category created");
        Ok(category)
    }

    pub async fn delete_category(
        &self,
        session: &SessionState,
        id: ItemId,
    ) -> Result<(), ManagerError> {
        authorize(session, Collection::Posts, Operation::ManageCategories)?;
        self.site.delete_category(id).await?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Team
    // ------------------------------------------------------------------

    pub async fn team(&self, session: &SessionState) -> Result<Vec<Profile>, ManagerError> {
        authorize_capability(session, Capability::ViewTeam)?;
        Ok(self.profiles.list_profiles().await?)
    }

    /// Assign `role` to another profile. Admins cannot change their own role.
    pub async fn change_role(
        &self,
        session: &SessionState,
        target: Uuid,
        role: Role,
    ) -> Result<Profile, ManagerError> {
        authorize_capability(session, Capability::ManageRoles)?;
        if session.user_id() == Some(target) {
            return Err(ManagerError::SelfRoleChange);
        }
        self.profiles.set_role(target, role).await?;
        let profile = self
            .profiles
            .profile(target)
            .await?
            .ok_or_else(|| ManagerError::NotFound {
                target: "profiles",
                id: target.to_string(),
            })?;
        tracing::info!(%target, %role, "Role changed");
        Ok(profile)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn sections(&self, session: &SessionState) -> Result<Vec<SiteSetting>, ManagerError> {
        authorize_capability(session, Capability::ViewSettings)?;
        let mut out = Vec::new();
        for key in SectionKey::ALL {
            if let Some(setting) = self.site.setting(key.as_str()).await? {
                out.push(setting);
            }
        }
        Ok(out)
    }

    pub async fn update_section(
        &self,
        session: &SessionState,
        key: SectionKey,
        value: Value,
    ) -> Result<SiteSetting, ManagerError> {
        authorize_capability(session, Capability::ManageSettings)?;
        let value = validate_section(key, value)?;
        let setting = self.site.put_setting(key.as_str(), value).await?;
        tracing::info!(section = %key, "Section updated");
        Ok(setting)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub async fn notifications(
        &self,
        session: &SessionState,
        limit: i64,
    ) -> Result<Vec<Notification>, ManagerError> {
        authorize_capability(session, Capability::ReadNotifications)?;
        Ok(self.site.notifications(limit.clamp(1, 200)).await?)
    }

    pub async fn mark_read(&self, session: &SessionState, id: ItemId) -> Result<(), ManagerError> {
        authorize_capability(session, Capability::ReadNotifications)?;
        Ok(self.site.mark_notification_read(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreCall};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn profile(role: Role) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: format!("{role}@studio.test"),
            full_name: Some(format!("{role} user")),
            avatar_url: None,
            role: Some(role),
        }
    }

    fn session(role: Role) -> SessionState {
        SessionState::Authenticated(profile(role))
    }

    fn setup() -> (Arc<MemoryStore>, ContentManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = ContentManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            EventBus::new(16),
        );
        (store, manager)
    }

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn blogger_listing_leads_is_denied_without_store_calls() {
        let (store, manager) = setup();
        store.seed(Collection::Leads, Status::New, fields(json!({"name": "Sam"})));

        let view = manager
            .list(&session(Role::Blogger), Collection::Leads, ViewMode::Active)
            .await
            .unwrap();

        assert_matches!(
            view,
            CollectionView::AccessDenied { collection: Collection::Leads, role: Some(Role::Blogger), .. }
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn signed_out_session_sees_access_denied() {
        let (store, manager) = setup();
        let view = manager
            .list(&SessionState::Anonymous, Collection::Posts, ViewMode::Active)
            .await
            .unwrap();
        assert_matches!(view, CollectionView::AccessDenied { role: None, .. });
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn manager_sees_service_rows_without_actions() {
        let (store, manager) = setup();
        store.seed(Collection::Services, Status::Active, fields(json!({"title": "SEO"})));
        store.seed(Collection::Services, Status::Draft, fields(json!({"title": "Ads"})));

        let view = manager
            .list(&session(Role::Manager), Collection::Services, ViewMode::Active)
            .await
            .unwrap();
        let listing = view.listing().unwrap();

        assert_eq!(listing.rows.len(), 2);
        assert!(listing.rows.iter().all(|r| r.actions.is_empty()));
    }

    #[tokio::test]
    async fn admin_archives_then_purges_testimonial_seven() {
        let (store, manager) = setup();
        for n in 1..=7 {
            let status = if n == 7 { Status::Active } else { Status::Draft };
            store.seed(Collection::Testimonials, status, fields(json!({"client_name": format!("c{n}")})));
        }
        let admin = session(Role::Admin);
        store.clear_calls();

        let archived = manager.archive(&admin, Collection::Testimonials, 7).await.unwrap();
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Fetch { collection: Collection::Testimonials, id: 7 },
                StoreCall::Update {
                    collection: Collection::Testimonials,
                    id: 7,
                    status: Some(Status::Archived),
                },
                StoreCall::Select { collection: Collection::Testimonials },
            ]
        );
        assert_eq!(archived.listing.view, ViewMode::Active);
        assert!(!archived.listing.ids().contains(&7));
        assert_eq!(archived.listing.counts, PartitionCounts { active: 6, archived: 1 });

        let view = manager
            .list(&admin, Collection::Testimonials, ViewMode::Archived)
            .await
            .unwrap();
        assert_eq!(view.listing().unwrap().ids(), vec![7]);

        store.clear_calls();
        let purged = manager
            .delete(&admin, Collection::Testimonials, 7, ViewMode::Archived)
            .await
            .unwrap();
        let writes: Vec<_> = store.calls().into_iter().filter(StoreCall::is_write).collect();
        assert_eq!(
            writes,
            vec![StoreCall::Delete { collection: Collection::Testimonials, id: 7 }]
        );
        assert!(purged.listing.rows.is_empty());

        let active = manager
            .list(&admin, Collection::Testimonials, ViewMode::Active)
            .await
            .unwrap();
        assert!(!active.listing().unwrap().ids().contains(&7));
        assert!(store.fetch(Collection::Testimonials, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archiving_twice_is_refused() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Services, Status::Archived, fields(json!({"title": "Old"})));
        store.clear_calls();

        let err = manager
            .archive(&session(Role::Admin), Collection::Services, item.id)
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Lifecycle(LifecycleError::AlreadyArchived(_)));
        assert!(store.calls().iter().all(|c| !c.is_write()));
    }

    #[tokio::test]
    async fn purge_of_live_item_is_refused() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Posts, Status::Published, fields(json!({"title": "Live"})));

        let err = manager
            .purge(&session(Role::Admin), Collection::Posts, item.id)
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Lifecycle(LifecycleError::NotArchived(_)));
        assert!(store.fetch(Collection::Posts, item.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn manager_edit_is_blocked_before_the_store() {
        let (store, manager) = setup();
        let mgr = session(Role::Manager);
        for collection in Collection::ALL {
            let item = store.seed(collection, collection.initial_status(), Map::new());
            store.clear_calls();

            let err = manager
                .edit(&mgr, collection, item.id, json!({"title": "x"}))
                .await
                .unwrap_err();
            assert_matches!(err, ManagerError::Denied(_));
            assert!(store.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn manager_delete_is_refused_before_the_store() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Services, Status::Active, Map::new());
        store.clear_calls();

        for mode in [ViewMode::Active, ViewMode::Archived] {
            let err = manager
                .delete(&session(Role::Manager), Collection::Services, item.id, mode)
                .await
                .unwrap_err();
            assert_matches!(err, ManagerError::Denied(_));
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn blogger_cannot_purge_posts() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Posts, Status::Archived, fields(json!({"title": "Old"})));
        store.clear_calls();

        let err = manager
            .purge(&session(Role::Blogger), Collection::Posts, item.id)
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Denied(_));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn store_failure_leaves_rows_unchanged() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Services, Status::Active, fields(json!({"title": "SEO"})));
        store.fail_writes(Some("connection reset"));

        let err = manager
            .archive(&session(Role::Admin), Collection::Services, item.id)
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Store(StoreError::Unavailable(_)));

        store.fail_writes(None);
        let current = store.fetch(Collection::Services, item.id).await.unwrap().unwrap();
        assert_eq!(current.status, Status::Active);
    }

    #[tokio::test]
    async fn restore_moves_item_back_to_active() {
        let (store, manager) = setup();
        let admin = session(Role::Admin);
        let post = store.seed(Collection::Posts, Status::Archived, fields(json!({"title": "Back"})));
        let lead = store.seed(Collection::Leads, Status::Archived, fields(json!({"name": "Sam"})));

        let err = manager
            .restore(&admin, Collection::Posts, post.id, ViewMode::Active)
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Lifecycle(LifecycleError::RestoreOutsideArchive(_)));

        manager
            .restore(&admin, Collection::Posts, post.id, ViewMode::Archived)
            .await
            .unwrap();
        let restored = store.fetch(Collection::Posts, post.id).await.unwrap().unwrap();
        assert_eq!(restored.status, Status::Draft);

        let view = manager.list(&admin, Collection::Posts, ViewMode::Active).await.unwrap();
        assert_eq!(view.listing().unwrap().ids(), vec![post.id]);

        manager
            .restore(&admin, Collection::Leads, lead.id, ViewMode::Archived)
            .await
            .unwrap();
        let lead = store.fetch(Collection::Leads, lead.id).await.unwrap().unwrap();
        assert_eq!(lead.status, Status::New);
    }

    #[tokio::test]
    async fn blogger_post_gets_author_which_edits_keep() {
        let (store, manager) = setup();
        let author = profile(Role::Blogger);
        store.seed_profile(author.clone(), None);
        let blogger = SessionState::Authenticated(author.clone());

        let created = manager
            .create(&blogger, Collection::Posts, json!({"title": "Hello", "content": "<p>hi</p>"}))
            .await
            .unwrap();
        let row = &created.listing.rows[0];
        assert_eq!(row.item.author_id, Some(author.id));
        assert_eq!(row.author.as_ref().map(|a| a.id), Some(author.id));
        assert!(row.actions.edit && row.actions.archive);

        let admin = session(Role::Admin);
        manager
            .edit(
                &admin,
                Collection::Posts,
                created.item_id,
                json!({"title": "Hello again", "content": "<p>hi</p>", "status": "Published"}),
            )
            .await
            .unwrap();
        let post = store.fetch(Collection::Posts, created.item_id).await.unwrap().unwrap();
        assert_eq!(post.author_id, Some(author.id));
        assert_eq!(post.status, Status::Published);
        assert_eq!(post.fields["slug"], "hello-again");
    }

    #[tokio::test]
    async fn editing_archived_item_is_refused() {
        let (store, manager) = setup();
        let item = store.seed(Collection::Services, Status::Archived, fields(json!({"title": "Old"})));
        let err = manager
            .edit(
                &session(Role::Admin),
                Collection::Services,
                item.id,
                json!({"title": "New", "description": "d"}),
            )
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Lifecycle(LifecycleError::EditWhileArchived(_)));
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_the_store() {
        let (store, manager) = setup();
        let err = manager
            .create(&session(Role::Admin), Collection::Services, json!({"title": "", "description": "d"}))
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Editor(EditorError::Invalid(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_write_blocks_a_second_submit() {
        let (_store, manager) = setup();
        let held = manager
            .begin_write(WriteKey::Item(Collection::Posts, 3))
            .unwrap();
        assert_matches!(
            manager.begin_write(WriteKey::Item(Collection::Posts, 3)),
            Err(ManagerError::Busy(_))
        );
        assert!(manager.begin_write(WriteKey::Item(Collection::Posts, 4)).is_ok());
        drop(held);
        assert!(manager.begin_write(WriteKey::Item(Collection::Posts, 3)).is_ok());
    }

    #[tokio::test]
    async fn writes_publish_change_events() {
        let (store, manager) = setup();
        let mut rx = manager.events().subscribe();
        let item = store.seed(Collection::Services, Status::Active, fields(json!({"title": "SEO"})));

        manager
            .archive(&session(Role::Admin), Collection::Services, item.id)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_matches!(
            event,
            ConsoleEvent::ItemChanged(ItemChangedEvent { change: ChangeKind::Archived, .. })
        );
    }

    #[tokio::test]
    async fn self_role_change_is_refused() {
        let (store, manager) = setup();
        let admin = profile(Role::Admin);
        let other = profile(Role::Blogger);
        store.seed_profile(admin.clone(), None);
        store.seed_profile(other.clone(), None);
        let s = SessionState::Authenticated(admin.clone());

        assert_matches!(
            manager.change_role(&s, admin.id, Role::Blogger).await,
            Err(ManagerError::SelfRoleChange)
        );
        let updated = manager.change_role(&s, other.id, Role::Manager).await.unwrap();
        assert_eq!(updated.role, Some(Role::Manager));

        assert_matches!(
            manager.change_role(&session(Role::Manager), other.id, Role::Admin).await,
            Err(ManagerError::Denied(_))
        );
    }

    #[tokio::test]
    async fn public_items_only_include_live_rows() {
        let (store, manager) = setup();
        let live = store.seed(Collection::Posts, Status::Published, fields(json!({"title": "A"})));
        store.seed(Collection::Posts, Status::Draft, fields(json!({"title": "B"})));
        store.seed(Collection::Posts, Status::Archived, fields(json!({"title": "C"})));

        let items = manager.public_items(Collection::Posts).await.unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![live.id]);
        assert_matches!(
            manager.public_items(Collection::Leads).await,
            Err(ManagerError::NotPublic(Collection::Leads))
        );
    }

    #[tokio::test]
    async fn intake_records_lead_and_notification() {
        let (store, manager) = setup();
        let mut rx = manager.events().subscribe();

        let (lead, note) = manager
            .intake_lead(fields(json!({
                "name": "Jo",
                "email": "jo@example.com",
                "message": "Need a site",
                "status": "Archived"
            })))
            .await
            .unwrap();
        assert_eq!(lead.status, Status::New);
        assert_eq!(note.message, "New lead from Jo");
        assert_eq!(store.notifications(10).await.unwrap().len(), 1);

        assert_matches!(rx.recv().await.unwrap(), ConsoleEvent::ItemChanged(_));
        assert_matches!(rx.recv().await.unwrap(), ConsoleEvent::Notification(_));
    }

    #[tokio::test]
    async fn sections_are_validated_and_gated() {
        let (_store, manager) = setup();
        let admin = session(Role::Admin);

        let err = manager
            .update_section(&session(Role::Manager), SectionKey::Faq, json!({"items": []}))
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Denied(_));

        let err = manager
            .update_section(&admin, SectionKey::Faq, json!({"items": []}))
            .await
            .unwrap_err();
        assert_matches!(err, ManagerError::Section(_));

        manager
            .update_section(&admin, SectionKey::Faq, json!({"items": [{"question": "Q", "answer": "A"}]}))
            .await
            .unwrap();
        let stored = manager.section(SectionKey::Faq).await.unwrap().unwrap();
        assert_eq!(stored.value["items"][0]["answer"], "A");
        assert_eq!(manager.sections(&session(Role::Manager)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn categories_need_manage_permission() {
        let (_store, manager) = setup();
        let blogger = session(Role::Blogger);

        let cat = manager.create_category(&blogger, "  Brand Strategy ").await.unwrap();
        assert_eq!(cat.slug, "brand-strategy");
        assert_matches!(
            manager.create_category(&blogger, "!!!").await,
            Err(ManagerError::Invalid(_))
        );
        assert_matches!(
            manager.create_category(&session(Role::Manager), "Ops").await,
            Err(ManagerError::Denied(_))
        );
        assert_eq!(manager.categories(&session(Role::Manager)).await.unwrap().len(), 1);
    }
}
