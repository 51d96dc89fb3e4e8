//! services/api/src/web/auth.rs
//!
//! Admin login, session verification, and logout endpoints, together with
//! the signed session token the cookie carries.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::state::AppState;
use crate::web::ErrorBody;

/// Name of the cookie holding the admin session token.
pub const SESSION_COOKIE: &str = "admin-session";

/// Session validity window in seconds, also used as the cookie's Max-Age.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24;

//=========================================================================================
// Session Token
//=========================================================================================

type HmacSha256 = Hmac<Sha256>;

/// An admin session asserted by the cookie: who logged in and when.
///
/// The encoded form is `base64(username:issued_at_millis)` followed by a
/// `.`-separated HMAC-SHA256 signature over that payload, so a token cannot
/// be forged or altered without the server's secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub username: String,
    pub issued_at_millis: i64,
}

fn payload_signature(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

impl SessionToken {
    pub fn issue(username: &str, issued_at_millis: i64) -> Self {
        Self {
            username: username.to_string(),
            issued_at_millis,
        }
    }

    /// Serializes and signs the token for transport in the cookie.
    pub fn encode(&self, secret: &str) -> String {
        let payload = STANDARD.encode(format!("{}:{}", self.username, self.issued_at_millis));
        let signature = payload_signature(&payload, secret);
        format!("{}.{}", payload, signature)
    }

    /// Parses a cookie value back into a token. Returns `None` for any
    /// malformed, unsigned, or tampered input.
    pub fn decode(value: &str, secret: &str) -> Option<Self> {
        let (payload, signature) = value.split_once('.')?;

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let signature_bytes = URL_SAFE_NO_PAD.decode(signature).ok()?;
        mac.verify_slice(&signature_bytes).ok()?;

        let decoded = String::from_utf8(STANDARD.decode(payload).ok()?).ok()?;
        let (username, millis) = decoded.rsplit_once(':')?;
        Some(Self {
            username: username.to_string(),
            issued_at_millis: millis.parse().ok()?,
        })
    }

    /// A token older than the validity window is no longer accepted,
    /// independently of the cookie's own Max-Age.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis - self.issued_at_millis > SESSION_MAX_AGE_SECS * 1000
    }
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

/// Builds the Set-Cookie value that establishes a session.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the Set-Cookie value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts the raw session token from the request's Cookie header.
pub fn session_cookie_value(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Exchange the fixed admin credentials for a session cookie
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "Username and password are required".to_string(),
            }),
        ));
    }

    let config = &state.config;
    if req.username != config.admin_username || req.password != config.admin_password {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "Invalid credentials".to_string(),
            }),
        ));
    }

    let token = SessionToken::issue(&req.username, Utc::now().timestamp_millis())
        .encode(&config.session_secret);

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&token, config.cookie_secure),
        )],
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
        }),
    ))
}

/// GET /auth/verify - Report whether the caller holds a valid admin session
#[utoipa::path(
    get,
    path = "/auth/verify",
    responses(
        (status = 200, description = "Session is valid", body = VerifyResponse),
        (status = 401, description = "No valid session", body = VerifyResponse)
    )
)]
pub async fn verify_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let config = &state.config;

    let Some(value) = session_cookie_value(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                authenticated: false,
                username: None,
            }),
        )
            .into_response();
    };

    let token = SessionToken::decode(value, &config.session_secret)
        .filter(|token| !token.is_expired(Utc::now().timestamp_millis()));

    match token {
        Some(token) => (
            StatusCode::OK,
            Json(VerifyResponse {
                authenticated: true,
                username: Some(token.username),
            }),
        )
            .into_response(),
        // A cookie was presented but is forged, malformed, or expired:
        // clear it so the browser stops sending it.
        None => (
            StatusCode::UNAUTHORIZED,
            [(
                header::SET_COOKIE,
                clear_session_cookie(config.cookie_secure),
            )],
            Json(VerifyResponse {
                authenticated: false,
                username: None,
            }),
        )
            .into_response(),
    }
}

/// POST /auth/logout - Destroy the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse)
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.cookie_secure),
        )],
        Json(LogoutResponse { success: true }),
    )
}

//=========================================================================================
// Tests
//=========================================================================================
