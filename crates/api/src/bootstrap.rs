//! First-run admin account.

use agency_core::access::Role;
use agency_core::auth::{hash_password, validate_password_strength};
use agency_core::session::Profile;
use agency_core::store::{ProfileStore, StoreError};
use uuid::Uuid;

use crate::config::BootstrapAdmin;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("bootstrap admin password rejected: {0}")]
    WeakPassword(String),
    #[error("could not hash bootstrap admin password: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create the configured admin profile unless one with that email already
/// exists. Returns whether a profile was created.
pub async fn ensure_admin(
    profiles: &dyn ProfileStore,
    admin: &BootstrapAdmin,
) -> Result<bool, BootstrapError> {
    let email = admin.email.trim().to_lowercase();
    if profiles.profile_by_email(&email).await?.is_some() {
        tracing::debug!(%email, "Bootstrap admin already present");
        return Ok(false);
    }

    validate_password_strength(&admin.password).map_err(BootstrapError::WeakPassword)?;
    let hash = hash_password(&admin.password).map_err(|e| BootstrapError::Hash(e.to_string()))?;
    let profile = Profile {
        id: Uuid::new_v4(),
        email,
        full_name: Some("Administrator".to_string()),
        avatar_url: None,
        role: Some(Role::Admin),
    };
    let id = profile.id;
    profiles.create_profile(profile, hash).await?;
    tracing::info!(user_id = %id, "Bootstrap admin created");
    Ok(true)
}
