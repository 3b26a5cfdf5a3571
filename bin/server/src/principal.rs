//! Principal extractor for Axum.
//!
//! The server sits behind an authenticating front door that forwards the
//! caller's username in a header. This module only reads and normalizes it.

use crate::{AppState, error::ApiError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use flowcanvas_platform_access::{AuthenticationError, Principal};
use std::sync::Arc;
use tracing::debug;

/// Extractor for requiring a caller principal.
///
/// Falls back to the configured development principal when the header is
/// absent. Rejects with 401 otherwise.
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let auth = &app_state.auth;

        let raw = match parts.headers.get(auth.principal_header.as_str()) {
            Some(value) => value.to_str().map_err(|_| {
                ApiError::Authentication(AuthenticationError::InvalidPrincipal {
                    reason: "header is not visible ASCII".to_string(),
                })
            })?,
            None => match auth.dev_fallback_principal.as_deref() {
                Some(fallback) => {
                    debug!("principal header absent, using development fallback");
                    fallback
                }
                None => return Err(ApiError::Authentication(AuthenticationError::MissingPrincipal)),
            },
        };

        Ok(RequirePrincipal(Principal::parse(raw)?))
    }
}
