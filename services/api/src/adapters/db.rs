//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ClientStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redraft_core::domain::{ClientProfile, ClientProfilePatch, NewClientProfile};
use redraft_core::ports::{ClientStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ClientStore` port.
#[derive(Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    /// Creates a new `PgClientStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ClientRecord {
    id: String,
    name: String,
    technical_knowledge: i32,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRecord {
    fn into_domain(self) -> ClientProfile {
        ClientProfile {
            id: self.id,
            name: self.name,
            technical_knowledge: self.technical_knowledge,
            description: self.description.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `ClientStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ClientStore for PgClientStore {
    async fn list(&self) -> PortResult<Vec<ClientProfile>> {
        let records = sqlx::query_as::<_, ClientRecord>(
            "SELECT id, name, technical_knowledge, description, created_at, updated_at \
             FROM clients ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(ClientRecord::into_domain).collect())
    }

    async fn create(&self, new: NewClientProfile) -> PortResult<ClientProfile> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(PortError::Validation(
                "Client name must not be empty".to_string(),
            ));
        }

        let record = sqlx::query_as::<_, ClientRecord>(
            "INSERT INTO clients (id, name, technical_knowledge, description) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, technical_knowledge, description, created_at, updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(new.technical_knowledge)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.into_domain())
    }

    async fn get_by_id(&self, id: &str) -> PortResult<ClientProfile> {
        let record = sqlx::query_as::<_, ClientRecord>(
            "SELECT id, name, technical_knowledge, description, created_at, updated_at \
             FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Client {} not found", id)))?;

        Ok(record.into_domain())
    }

    async fn update(&self, id: &str, patch: ClientProfilePatch) -> PortResult<ClientProfile> {
        // COALESCE keeps every column whose patch field is absent, so the
        // whole patch is a single atomic row update.
        let record = sqlx::query_as::<_, ClientRecord>(
            "UPDATE clients SET \
                 name = COALESCE($2, name), \
                 technical_knowledge = COALESCE($3, technical_knowledge), \
                 description = COALESCE($4, description), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, name, technical_knowledge, description, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.technical_knowledge)
        .bind(patch.description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Client {} not found", id)))?;

        Ok(record.into_domain())
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        // No existence check: deleting an id that is already gone succeeds.
        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
