//! openvox-noop
//!
//! Fleet-wide noop review for configuration code. The driver walks a commit
//! range, asks every node's agent to dry-run each revision, computes the
//! change delta each commit introduces relative to its parent and groups
//! identical deltas across nodes into a changelog-style report.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{AgentConfig, DriverConfig};

/// Agent state shared across handlers
#[derive(Clone)]
pub struct AgentState {
    /// Agent configuration
    pub config: Arc<AgentConfig>,
    /// Serializes applies; the repository working tree is shared state
    pub apply_lock: Arc<Mutex<()>>,
}

impl AgentState {
    /// Wrap a loaded configuration into shared state
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config: Arc::new(config),
            apply_lock: Arc::new(Mutex::new(())),
        }
    }
}
