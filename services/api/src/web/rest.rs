//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the client-profile REST endpoints and the
//! master definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use redraft_core::domain::{
    ClientProfile, ClientProfilePatch, NewClientProfile, TECHNICAL_KNOWLEDGE_RANGE,
};
use redraft_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::web::state::AppState;
use crate::web::ErrorBody;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::verify_handler,
        crate::web::auth::logout_handler,
        list_clients_handler,
        create_client_handler,
        get_client_handler,
        update_client_handler,
        delete_client_handler,
        crate::web::redraft::redraft_handler,
    ),
    components(
        schemas(
            crate::web::auth::LoginRequest,
            crate::web::auth::LoginResponse,
            crate::web::auth::VerifyResponse,
            crate::web::auth::LogoutResponse,
            crate::web::redraft::RedraftPayload,
            crate::web::redraft::ClientRefPayload,
            ClientResponse,
            CreateClientRequest,
            UpdateClientRequest,
            MessageResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Email Redraft API", description = "API endpoints for the email redraft assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A client profile as returned to the browser.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: String,
    pub name: String,
    pub technical_knowledge: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientProfile> for ClientResponse {
    fn from(profile: ClientProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            technical_knowledge: profile.technical_knowledge,
            description: profile.description,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: Option<String>,
    pub technical_knowledge: Option<i32>,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub technical_knowledge: Option<i32>,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Error Mapping Helpers
//=========================================================================================

fn bad_request(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Maps a store failure onto the HTTP surface. Internals are logged but
/// never returned to the caller.
fn store_failure(generic_message: &str, e: PortError) -> (StatusCode, Json<ErrorBody>) {
    match e {
        PortError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "Client not found".to_string(),
            }),
        ),
        PortError::Validation(message) => (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })),
        other => {
            error!("{}: {:?}", generic_message, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: generic_message.to_string(),
                }),
            )
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every client profile, ordered by name.
#[utoipa::path(
    get,
    path = "/clients",
    responses(
        (status = 200, description = "All client profiles, name ascending", body = [ClientResponse]),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn list_clients_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let clients = state
        .clients
        .list()
        .await
        .map_err(|e| store_failure("Failed to fetch clients", e))?;

    let response: Vec<ClientResponse> = clients.into_iter().map(ClientResponse::from).collect();
    Ok(Json(response))
}

/// Create a new client profile.
#[utoipa::path(
    post,
    path = "/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn create_client_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    let Some(technical_knowledge) = req.technical_knowledge else {
        return Err(bad_request("Name and technical knowledge are required"));
    };
    if name.is_empty() {
        return Err(bad_request("Name and technical knowledge are required"));
    }
    if !TECHNICAL_KNOWLEDGE_RANGE.contains(&technical_knowledge) {
        return Err(bad_request("Technical knowledge must be between 1 and 5"));
    }

    let created = state
        .clients
        .create(NewClientProfile {
            name: name.to_string(),
            technical_knowledge,
            description: req.description.unwrap_or_default(),
        })
        .await
        .map_err(|e| store_failure("Failed to create client", e))?;

    Ok((StatusCode::CREATED, Json(ClientResponse::from(created))))
}

/// Fetch a single client profile by id.
#[utoipa::path(
    get,
    path = "/clients/{id}",
    params(("id" = String, Path, description = "The client profile id")),
    responses(
        (status = 200, description = "The client profile", body = ClientResponse),
        (status = 404, description = "No such client", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn get_client_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let client = state
        .clients
        .get_by_id(&id)
        .await
        .map_err(|e| store_failure("Failed to fetch client", e))?;

    Ok(Json(ClientResponse::from(client)))
}

/// Partially update a client profile; only supplied fields change.
#[utoipa::path(
    put,
    path = "/clients/{id}",
    params(("id" = String, Path, description = "The client profile id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "The updated client profile", body = ClientResponse),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 404, description = "No such client", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn update_client_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(bad_request("Name must not be empty"));
        }
    }
    if let Some(technical_knowledge) = req.technical_knowledge {
        if !TECHNICAL_KNOWLEDGE_RANGE.contains(&technical_knowledge) {
            return Err(bad_request("Technical knowledge must be between 1 and 5"));
        }
    }

    let updated = state
        .clients
        .update(
            &id,
            ClientProfilePatch {
                name: req.name,
                technical_knowledge: req.technical_knowledge,
                description: req.description,
            },
        )
        .await
        .map_err(|e| store_failure("Failed to update client", e))?;

    Ok(Json(ClientResponse::from(updated)))
}

/// Delete a client profile. Deleting an id that does not exist succeeds.
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    params(("id" = String, Path, description = "The client profile id")),
    responses(
        (status = 200, description = "Deletion confirmation", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn delete_client_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    state
        .clients
        .delete(&id)
        .await
        .map_err(|e| store_failure("Failed to delete client", e))?;

    Ok(Json(MessageResponse {
        message: "Client deleted successfully".to_string(),
    }))
}
