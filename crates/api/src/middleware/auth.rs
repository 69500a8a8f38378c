//! Bearer-token session extractor for console handlers.

use agency_core::auth::validate_token;
use agency_core::session::SessionState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Session of the signed-in console user.
///
/// Resolved per request: the token names the identity, and the profile
/// (with its current role) is loaded under the configured timeout. A request
/// that cannot be resolved to a profile is rejected with 401.
///
/// ```ignore
/// async fn handler(Console(session): Console) -> ApiResult<Json<()>> {
///     tracing::info!(role = ?session.role(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Console(pub SessionState);

impl FromRequestParts<AppState> for Console {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized("Missing Authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>",
        ))?;

        let claims = validate_token(state.tokens(), token)?;

        let session = SessionState::establish(
            state.profiles(),
            Some(claims.sub),
            state.config().session_init_timeout,
        )
        .await;

        if !session.is_authenticated() {
            return Err(ApiError::Unauthorized("Session could not be established"));
        }
        Ok(Console(session))
    }
}
