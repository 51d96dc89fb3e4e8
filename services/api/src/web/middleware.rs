//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting the admin-only routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::web::auth::{clear_session_cookie, session_cookie_value, SessionToken};
use crate::web::state::AppState;
use crate::web::ErrorBody;

/// The admin identity established by `require_admin`, available to handlers
/// through request extensions.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub String);

/// Middleware that validates the admin session cookie.
///
/// If valid, inserts the admin identity into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized; an invalid cookie is cleared.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let config = &state.config;

    let Some(value) = session_cookie_value(req.headers()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "Authentication required".to_string(),
            }),
        )
            .into_response();
    };

    let token = SessionToken::decode(value, &config.session_secret)
        .filter(|token| !token.is_expired(Utc::now().timestamp_millis()));

    match token {
        Some(token) => {
            req.extensions_mut().insert(AdminIdentity(token.username));
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            [(
                header::SET_COOKIE,
                clear_session_cookie(config.cookie_secure),
            )],
            Json(ErrorBody {
                error: "Authentication required".to_string(),
            }),
        )
            .into_response(),
    }
}
