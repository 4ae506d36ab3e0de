//! Git operations for the configuration code repository
//!
//! Both binaries keep a local clone of the code repo: the agent checks out
//! the revision it is asked to run, the driver walks the commit range under
//! review. Uses libgit2 via the git2 crate; SSH key authentication is
//! supported for private remotes.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use git2::build::CheckoutBuilder;
use git2::{AutotagOption, Cred, FetchOptions, Oid, RemoteCallbacks, Repository, Sort};
use tracing::{debug, info};

/// Commit metadata used by the rendered review
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: String,
    pub summary: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl CommitInfo {
    /// Abbreviated commit id for display
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Open the repository at `path`, cloning it from `url` first when absent
pub fn clone_or_open(url: &str, path: &Path, ssh_private_key: Option<&str>) -> Result<Repository> {
    if path.exists() {
        debug!("opening existing repository at {:?}", path);
        return Repository::open(path).context("Failed to open existing repository");
    }

    info!("cloning {} into {:?}", url, path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create repository parent directory")?;
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(credential_callbacks(ssh_private_key));
    fetch_options.download_tags(AutotagOption::All);

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);
    builder.clone(url, path).context("Failed to clone repository")
}

/// Fetch all refs and tags from origin
pub fn fetch(repo: &Repository, ssh_private_key: Option<&str>) -> Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .context("Failed to find origin remote")?;

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(credential_callbacks(ssh_private_key));
    fetch_options.download_tags(AutotagOption::All);

    remote
        .fetch(&[] as &[&str], Some(&mut fetch_options), None)
        .context("Failed to fetch from remote")?;

    debug!("fetched updates from origin");
    Ok(())
}

fn credential_callbacks(ssh_private_key: Option<&str>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(key) = ssh_private_key {
        let key_string = key.to_string();
        callbacks.credentials(move |_url, username_from_url, _allowed_types| {
            let username = username_from_url.unwrap_or("git");
            Cred::ssh_key_from_memory(username, None, &key_string, None)
        });
    }
    callbacks
}

/// Resolve a tag-like revision (tag, branch, remote branch or raw id) to a
/// commit id
pub fn resolve_commit(repo: &Repository, rev: &str) -> Result<Oid> {
    let candidates = [
        rev.to_string(),
        format!("refs/tags/{rev}"),
        format!("refs/remotes/origin/{rev}"),
    ];

    for candidate in &candidates {
        if let Ok(object) = repo.revparse_single(candidate) {
            let commit = object
                .peel_to_commit()
                .with_context(|| format!("Revision '{rev}' does not point at a commit"))?;
            return Ok(commit.id());
        }
    }

    bail!("Unknown revision '{rev}'")
}

/// Check out a revision into the working tree, returning the commit id it
/// resolved to
pub fn checkout(repo: &Repository, rev: &str) -> Result<Oid> {
    let oid = resolve_commit(repo, rev)?;

    repo.set_head_detached(oid)
        .with_context(|| format!("Failed to set HEAD to {oid}"))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .with_context(|| format!("Failed to check out {oid}"))?;

    debug!("checked out {} at {}", rev, oid);
    Ok(oid)
}

/// Commit ids reachable from `end_rev` but not from `begin_rev`, in
/// topological order, oldest first. The oldest id is the baseline the rest
/// of the range is differenced against.
pub fn commit_range(repo: &Repository, begin_rev: &str, end_rev: &str) -> Result<Vec<Oid>> {
    let begin = resolve_commit(repo, begin_rev)?;
    let end = resolve_commit(repo, end_rev)?;

    info!("walking commits {}..{}", begin_rev, end_rev);

    let mut walk = repo.revwalk().context("Failed to start revision walk")?;
    walk.set_sorting(Sort::TOPOLOGICAL)
        .context("Failed to set walk sorting")?;
    walk.push(end)
        .with_context(|| format!("Failed to push end revision '{end_rev}'"))?;
    walk.hide(begin)
        .with_context(|| format!("Failed to hide begin revision '{begin_rev}'"))?;

    let mut commit_ids = Vec::new();
    for oid in walk {
        commit_ids.push(oid.context("Revision walk failed")?);
    }
    commit_ids.reverse();

    if commit_ids.is_empty() {
        bail!("Empty commit range {begin_rev}..{end_rev}");
    }

    debug!("walk found {} commits", commit_ids.len());
    Ok(commit_ids)
}

/// Look up display metadata for a commit
pub fn commit_info(repo: &Repository, oid: Oid) -> Result<CommitInfo> {
    let commit = repo
        .find_commit(oid)
        .with_context(|| format!("Could not look up commit {oid}"))?;
    let author = commit.author();

    Ok(CommitInfo {
        id: oid.to_string(),
        summary: commit.summary().unwrap_or_default().to_string(),
        body: commit.body().map(|b| b.trim_end().to_string()),
        author: author.name().map(|s| s.to_string()),
        author_email: author.email().map(|s| s.to_string()),
        date: {
            let time = commit.time();
            Utc.timestamp_opt(time.seconds(), 0).single()
        },
    })
}
