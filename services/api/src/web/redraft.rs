//! services/api/src/web/redraft.rs
//!
//! The streaming redraft endpoint: validates the request, hands it to the
//! redraft service, and forwards the generated text chunk-by-chunk.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use redraft_core::domain::{ClientRef, RedraftRequest};
use redraft_core::ports::PortError;
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::web::state::AppState;

/// Wall-clock ceiling on a single generation, matching the upstream
/// service's own request limit.
pub const GENERATION_TIME_LIMIT: Duration = Duration::from_secs(30);

//=========================================================================================
// Request Payload
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedraftPayload {
    #[serde(default)]
    pub original_email: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub client: Option<ClientRefPayload>,
    #[serde(default)]
    pub bilingual_output: bool,
}

/// The selected recipient, passed by value: the server never re-resolves
/// the profile by id.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientRefPayload {
    pub name: String,
    pub technical_knowledge: i32,
}

//=========================================================================================
// Handler
//=========================================================================================

/// Redraft an email and stream the result back as plain text.
#[utoipa::path(
    post,
    path = "/redraft",
    request_body = RedraftPayload,
    responses(
        (status = 200, description = "The redrafted email, streamed as plain text", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing email content or prompt", body = String, content_type = "text/plain"),
        (status = 500, description = "The generation service rejected the request", body = String, content_type = "text/plain")
    )
)]
pub async fn redraft_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RedraftPayload>,
) -> Result<Response, (StatusCode, String)> {
    // Validation happens before any upstream call.
    if payload.original_email.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No email content provided".to_string()));
    }
    if payload.prompt.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No prompt provided".to_string()));
    }

    let request = RedraftRequest {
        original_email: payload.original_email,
        context: payload.context,
        prompt: payload.prompt,
        client: payload.client.map(|client| ClientRef {
            name: client.name,
            technical_knowledge: client.technical_knowledge,
        }),
        bilingual_output: payload.bilingual_output,
    };

    let mut upstream = state.redraft.redraft_stream(&request).await.map_err(|e| {
        error!("Redraft generation failed to start: {}", e);
        upstream_error_body(e)
    })?;

    let deadline = Instant::now() + GENERATION_TIME_LIMIT;

    // Await the first item before committing the response: an upstream
    // stream that errors (or stalls) before producing anything still has
    // the 500 path available at this point.
    let first = match timeout_at(deadline, upstream.next()).await {
        Ok(Some(Ok(chunk))) => Some(chunk),
        Ok(Some(Err(e))) => {
            error!("Redraft generation failed before any content: {}", e);
            return Err(upstream_error_body(e));
        }
        Ok(None) => None,
        Err(_) => {
            warn!(
                "Redraft generation produced nothing within {:?}",
                GENERATION_TIME_LIMIT
            );
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server Error: redraft generation timed out".to_string(),
            ));
        }
    };

    let body = async_stream::stream! {
        if let Some(chunk) = first {
            yield Ok::<Bytes, io::Error>(Bytes::from(chunk));
            loop {
                match timeout_at(deadline, upstream.next()).await {
                    Ok(Some(Ok(chunk))) => yield Ok(Bytes::from(chunk)),
                    Ok(Some(Err(e))) => {
                        // Headers are already on the wire at this point, so
                        // the forwarded prefix stands and the body ends.
                        warn!("Upstream redraft stream failed mid-generation: {}", e);
                        break;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        warn!(
                            "Redraft generation exceeded {:?}; terminating the stream",
                            GENERATION_TIME_LIMIT
                        );
                        break;
                    }
                }
            }
        }
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// Maps an upstream failure onto the plain-text 500 body, surfacing the
/// upstream message verbatim.
fn upstream_error_body(e: PortError) -> (StatusCode, String) {
    let message = match e {
        PortError::Upstream(message) => message,
        other => other.to_string(),
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Server Error: {}", message),
    )
}
