//! crates/redraft_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;

/// The valid range for a client's technical knowledge level.
pub const TECHNICAL_KNOWLEDGE_RANGE: RangeInclusive<i32> = 1..=5;

/// A saved recipient profile: who the email is for and how technical
/// they are.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub id: String,
    pub name: String,
    pub technical_knowledge: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new client profile. The id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewClientProfile {
    pub name: String,
    pub technical_knowledge: i32,
    pub description: String,
}

/// A presence-aware partial update. Only `Some` fields are applied, so an
/// omitted field is never confused with a cleared one.
#[derive(Debug, Clone, Default)]
pub struct ClientProfilePatch {
    pub name: Option<String>,
    pub technical_knowledge: Option<i32>,
    pub description: Option<String>,
}

/// A by-value snapshot of a client profile carried inside a redraft
/// request. The server never looks the profile up again by id.
#[derive(Debug, Clone)]
pub struct ClientRef {
    pub name: String,
    pub technical_knowledge: i32,
}

/// A single redraft request. Transient: nothing here is ever persisted.
#[derive(Debug, Clone)]
pub struct RedraftRequest {
    pub original_email: String,
    pub context: Option<String>,
    pub prompt: String,
    pub client: Option<ClientRef>,
    pub bilingual_output: bool,
}

/// The guidance tier derived from a recipient's technical knowledge level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechnicalTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl TechnicalTier {
    /// Maps a technical knowledge level onto a guidance tier: 2 and below
    /// is beginner, 3 and 4 are intermediate, 5 and above is advanced.
    pub fn from_level(level: i32) -> Self {
        if level <= 2 {
            TechnicalTier::Beginner
        } else if level <= 4 {
            TechnicalTier::Intermediate
        } else {
            TechnicalTier::Advanced
        }
    }
}
