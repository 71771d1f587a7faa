use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use super::{guard, Access, AuthStatus, GuardDecision, Principal};
use crate::app::AppState;
use crate::error::ApiError;

/// Guards protected routes.
///
/// Resolves the bearer token, asks [`guard`] what to do, and on success
/// stores the [`Principal`] in the request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    let status = state.auth.resolve(token);

    match guard(Access::Protected, &status) {
        GuardDecision::Allow => {
            if let AuthStatus::Authenticated(principal) = status {
                request.extensions_mut().insert(principal);
            }
            Ok(next.run(request).await)
        }
        GuardDecision::Wait => Err(ApiError::Unavailable(
            "Authentication is still initializing".to_string(),
        )),
        GuardDecision::Deny => {
            tracing::warn!(
                uri = %request.uri(),
                token_present = token.is_some(),
                "Rejected unauthenticated request"
            );
            Err(ApiError::Unauthorized(
                "Missing or invalid API token".to_string(),
            ))
        }
    }
}

/// Extractor for the caller admitted by [`require_auth`]
///
/// Example:
/// ```ignore
/// async fn protected_route(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}", auth.label)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Principal);

impl std::ops::Deref for RequireAuth {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(RequireAuth)
            .ok_or_else(|| ApiError::Unauthorized("Route is not behind the auth guard".to_string()))
    }
}
