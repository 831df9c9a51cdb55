use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{
    AccessResponse, ApiError, AppState, RefreshRequest, RegisterRequest, RegisterResponse,
    TokenRequest,
};
use crate::services::{AuthUser, TokenPair, UserProfile};

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";

// ============================================================================
// Middleware
// ============================================================================

/// Verifies `Authorization: Bearer <access>` and inserts the caller as an
/// [`AuthUser`] extension. Short-circuits with 401 otherwise.
///
/// The caller is copied onto the response too, where the request logging
/// middleware picks it up.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        bearer_token(&request).ok_or_else(|| ApiError::unauthorized(MISSING_CREDENTIALS))?;

    let user = state.auth_service.authenticate(token).await?;
    request.extensions_mut().insert(user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(MISSING_CREDENTIALS))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /users/register/
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth_service.register(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "User created successfully",
        }),
    ))
}

/// POST /users/token/
/// Exchange username and password for an access/refresh token pair
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state
        .auth_service
        .obtain_tokens(&payload.username, &payload.password)
        .await?;

    Ok(Json(pair))
}

/// POST /users/token/refresh/
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    let access = state.auth_service.refresh_access(&payload.refresh).await?;
    Ok(Json(AccessResponse { access }))
}

/// GET /users/me/
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.auth_service.get_profile(user.id).await?;
    Ok(Json(profile))
}
