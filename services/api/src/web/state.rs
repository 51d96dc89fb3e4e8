//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use redraft_core::ports::{ClientStore, RedraftService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<dyn ClientStore>,
    pub redraft: Arc<dyn RedraftService>,
    pub config: Arc<Config>,
}
