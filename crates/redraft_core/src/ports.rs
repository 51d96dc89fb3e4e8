//! crates/redraft_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{ClientProfile, ClientProfilePatch, NewClientProfile, RedraftRequest};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A finite, non-restartable sequence of generated text chunks.
pub type RedraftStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Returns every client profile, ordered by name ascending.
    async fn list(&self) -> PortResult<Vec<ClientProfile>>;

    /// Creates a profile with a fresh id and server-assigned timestamps.
    /// Fails with `Validation` when the trimmed name is empty.
    async fn create(&self, new: NewClientProfile) -> PortResult<ClientProfile>;

    async fn get_by_id(&self, id: &str) -> PortResult<ClientProfile>;

    /// Applies only the fields present in the patch and bumps `updated_at`.
    /// Fails with `NotFound` when the id does not exist.
    async fn update(&self, id: &str, patch: ClientProfilePatch) -> PortResult<ClientProfile>;

    /// Deletes a profile. Idempotent: a nonexistent id is not an error.
    async fn delete(&self, id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait RedraftService: Send + Sync {
    /// Starts a redraft generation and returns the model's output as a
    /// stream of incremental text chunks.
    async fn redraft_stream(&self, request: &RedraftRequest) -> PortResult<RedraftStream>;
}
