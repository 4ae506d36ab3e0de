//! Agent API routes and handlers

use axum::{
    routing::{get, post},
    Router,
};

use crate::AgentState;

mod apply;
mod health;

pub use apply::{apply, last_apply};
pub use health::health_check;

/// All agent routes under `/api/v1`
pub fn routes() -> Router<AgentState> {
    Router::new()
        .route("/apply", post(apply::apply))
        .route("/last-apply", get(apply::last_apply))
        .route("/health", get(health::health_check))
}
