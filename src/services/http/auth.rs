use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use subtle::ConstantTimeEq;

use super::super::ServiceError;
use super::{error_response, AppState};
use crate::models::api_keys;
use crate::repositories::api_keys::ApiKeyRepository;
use crate::repositories::rate_limits::RateLimitRepository;
use crate::settings::RateLimit;

#[derive(Clone)]
pub struct AuthState {
    api_keys: ApiKeyRepository,
    rate_limits: RateLimitRepository,
    max_requests: i32,
    window_secs: i64,
}

impl AuthState {
    pub fn new(pool: PgPool, limits: &RateLimit) -> Self {
        AuthState {
            api_keys: ApiKeyRepository::new(pool.clone()),
            rate_limits: RateLimitRepository::new(pool),
            max_requests: limits.max_requests,
            window_secs: limits.window_secs.max(1),
        }
    }
}

/// Merchant identity attached to the request after the key checks out.
#[derive(Clone)]
pub struct ApiIdentity {
    pub user_id: String,
}

/// Bearer-key gate for the programmatic endpoints. Every rejection answers
/// with the same body so callers cannot probe which check failed. The rate
/// limit runs after authentication and before any business logic.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = &state.auth;

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return invalid_key(),
    };

    if !api_keys::is_well_formed(&token) {
        return invalid_key();
    }

    let key = match auth
        .api_keys
        .find_by_prefix(&token[..api_keys::PREFIX_LENGTH])
        .await
    {
        Ok(Some(key)) => key,
        Ok(None) => return invalid_key(),
        Err(e) => {
            return error_response(&ServiceError::Database(e.to_string())).into_response();
        }
    };

    if !key.verify(&token) || !key.is_active() {
        return invalid_key();
    }

    // Usage stamp is best-effort; a failure here must not fail the request.
    let repository = auth.api_keys.clone();
    let key_id = key.id.clone();
    tokio::spawn(async move {
        if let Err(e) = repository.touch_last_used(&key_id).await {
            log::debug!("Could not record key usage for {}: {}", key_id, e);
        }
    });

    let identity = format!("{}:{}", key.user_id, client_ip(request.headers()));
    let endpoint = request.uri().path().to_string();
    let now = chrono::Utc::now().timestamp();
    let window_start = now - now.rem_euclid(auth.window_secs);

    match auth.rate_limits.hit(&identity, &endpoint, window_start).await {
        Ok(count) if count > auth.max_requests => {
            log::warn!("Rate limit exceeded for {} on {}.", identity, endpoint);
            return error_response(&ServiceError::RateLimited).into_response();
        }
        Ok(_) => {}
        Err(e) => {
            return error_response(&ServiceError::Database(e.to_string())).into_response();
        }
    }

    request.extensions_mut().insert(ApiIdentity {
        user_id: key.user_id.clone(),
    });

    next.run(request).await
}

/// Shared-token gate for the withdrawal decision endpoints, which back the
/// operator dashboard.
pub async fn require_operator(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = bearer_token(request.headers())
        .map(|token| bool::from(token.as_bytes().ct_eq(state.admin_token.as_bytes())))
        .unwrap_or(false);

    if !authorized {
        return error_response(&ServiceError::Unauthorized).into_response();
    }

    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn invalid_key() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid API key" })),
    )
        .into_response()
}
