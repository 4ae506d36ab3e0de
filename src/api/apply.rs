//! Apply and last-apply endpoints
//!
//! `apply` is the agent's one real job: pull the code repository, check out
//! the requested revision, run the configuration tool and hand back its
//! report. Applies are serialized behind a lock so concurrent requests can
//! never corrupt the working tree.

use axum::{extract::State, Json};
use tracing::info;

use crate::models::{ApplyRequest, Report};
use crate::services::{git, puppet};
use crate::utils::error::{AgentError, AgentResult};
use crate::utils::validation::validate_rev;
use crate::AgentState;

/// Run the configuration tool at the requested revision
pub async fn apply(
    State(state): State<AgentState>,
    Json(req): Json<ApplyRequest>,
) -> AgentResult<Json<Report>> {
    if !validate_rev(&req.rev) {
        return Err(AgentError::BadRequest(format!(
            "invalid revision '{}'",
            req.rev
        )));
    }

    // One apply at a time; the working tree is shared state
    let _guard = state.apply_lock.lock().await;

    info!("apply requested: rev={} noop={}", req.rev, req.noop);

    let ssh_key = state
        .config
        .ssh_key()
        .map_err(|e| AgentError::Git(format!("{e:#}")))?;
    let repo_dir = state.config.repo_dir();

    let repo = git::clone_or_open(&state.config.repo_url, &repo_dir, ssh_key.as_deref())
        .map_err(|e| AgentError::Git(format!("{e:#}")))?;
    git::fetch(&repo, ssh_key.as_deref()).map_err(|e| AgentError::Git(format!("{e:#}")))?;
    info!("pull complete: {}", req.rev);

    let oid = git::checkout(&repo, &req.rev).map_err(|e| AgentError::Git(format!("{e:#}")))?;
    info!("checkout complete: {}", oid);

    let report = puppet::run(&state.config.puppet, &repo_dir, &oid.to_string(), req.noop)
        .await
        .map_err(|e| AgentError::PuppetRun(format!("{e:#}")))?;

    info!("apply done: {}", req.rev);
    Ok(Json(report))
}

/// Return the report of the most recent non-noop apply
pub async fn last_apply(State(state): State<AgentState>) -> AgentResult<Json<Report>> {
    let report = puppet::last_apply(&state.config.puppet)
        .map_err(|e| AgentError::Report(format!("{e:#}")))?;

    info!("last apply: status@{}", report.configuration_version);
    Ok(Json(report))
}
