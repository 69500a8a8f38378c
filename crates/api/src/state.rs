use std::sync::Arc;

use agency_core::auth::TokenConfig;
use agency_core::events::EventBus;
use agency_core::store::{ContentStore, MemoryStore, PgStore, ProfileStore, SiteStore};
use agency_core::ContentManager;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::outbound::Outbound;

/// Which store implementation backs the process.
#[derive(Clone)]
pub enum Backend {
    Memory(Arc<MemoryStore>),
    Postgres(PgStore),
}

impl Backend {
    fn stores(&self) -> (Arc<dyn ContentStore>, Arc<dyn ProfileStore>, Arc<dyn SiteStore>) {
        match self {
            Backend::Memory(store) => (store.clone(), store.clone(), store.clone()),
            Backend::Postgres(store) => {
                let store = Arc::new(store.clone());
                (store.clone(), store.clone(), store)
            }
        }
    }
}

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    backend: Backend,
    config: AppConfig,
    manager: ContentManager,
    profiles: Arc<dyn ProfileStore>,
    tokens: TokenConfig,
    outbound: Outbound,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Backend, outbound: Outbound) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let (content, profiles, site) = backend.stores();
        let manager = ContentManager::new(content, profiles.clone(), site, event_bus);
        let tokens = TokenConfig {
            secret: config.jwt_secret.clone(),
            ttl_mins: config.session_ttl_mins,
        };
        Self {
            inner: Arc::new(InnerState {
                backend,
                config,
                manager,
                profiles,
                tokens,
                outbound,
            }),
        }
    }

    /// Database pool, when running on Postgres.
    pub fn pool(&self) -> Option<&PgPool> {
        match &self.inner.backend {
            Backend::Postgres(store) => Some(store.pool()),
            Backend::Memory(_) => None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &ContentManager {
        &self.inner.manager
    }

    pub fn profiles(&self) -> &dyn ProfileStore {
        self.inner.profiles.as_ref()
    }

    pub fn tokens(&self) -> &TokenConfig {
        &self.inner.tokens
    }

    pub fn outbound(&self) -> &Outbound {
        &self.inner.outbound
    }

    pub fn event_bus(&self) -> &EventBus {
        self.inner.manager.events()
    }
}
