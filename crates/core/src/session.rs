//! Explicitly owned authentication state for one console request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Role;
use crate::store::ProfileStore;

/// Profile row keyed by the identity's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    /// `None` when the stored role is missing or unrecognised.
    pub role: Option<Role>,
}

/// `Uninitialized -> Loading -> Authenticated(profile) | Anonymous`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    Authenticated(Profile),
    Anonymous,
}

impl SessionState {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    /// Role of the signed-in profile; `None` for every other state.
    pub fn role(&self) -> Option<Role> {
        self.profile().and_then(|p| p.role)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.profile().map(|p| p.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// Resolve the session for `user_id` by loading its profile, giving up
    /// after `timeout`. A missing identity, missing profile, store error or
    /// timeout all settle on `Anonymous`.
    pub async fn establish(
        profiles: &dyn ProfileStore,
        user_id: Option<Uuid>,
        timeout: Duration,
    ) -> SessionState {
        let Some(user_id) = user_id else {
            return SessionState::Anonymous;
        };
        match tokio::time::timeout(timeout, profiles.profile(user_id)).await {
            Ok(Ok(Some(profile))) => SessionState::Authenticated(profile),
            Ok(Ok(None)) => {
                tracing::warn!(%user_id, "No profile for authenticated identity");
                SessionState::Anonymous
            }
            Ok(Err(e)) => {
                tracing::warn!(%user_id, error = %e, "Profile lookup failed");
                SessionState::Anonymous
            }
            Err(_) => {
                tracing::warn!(%user_id, ?timeout, "Profile lookup timed out");
                SessionState::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn profile(role: Option<Role>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            full_name: Some("Ops".into()),
            avatar_url: None,
            role,
        }
    }

    #[test]
    fn role_only_when_authenticated() {
        assert_eq!(SessionState::Uninitialized.role(), None);
        assert_eq!(SessionState::Loading.role(), None);
        assert_eq!(SessionState::Anonymous.role(), None);
        let s = SessionState::Authenticated(profile(Some(Role::Manager)));
        assert_eq!(s.role(), Some(Role::Manager));
        assert!(s.is_authenticated());
    }

    #[tokio::test]
    async fn establish_loads_profile() {
        let store = MemoryStore::new();
        let p = profile(Some(Role::Blogger));
        store.seed_profile(p.clone(), None);

        let s = SessionState::establish(&store, Some(p.id), Duration::from_secs(1)).await;
        assert_eq!(s, SessionState::Authenticated(p));
    }

    #[tokio::test]
    async fn establish_without_identity_or_profile_is_anonymous() {
        let store = MemoryStore::new();
        let s = SessionState::establish(&store, None, Duration::from_secs(1)).await;
        assert_eq!(s, SessionState::Anonymous);
        let s = SessionState::establish(&store, Some(Uuid::new_v4()), Duration::from_secs(1)).await;
        assert_eq!(s, SessionState::Anonymous);
    }
}
