//! Fleet-wide noop review
//!
//! Walks a commit range oldest-first, fans noop requests out to every node's
//! agent within one commit, joins before advancing, computes per-node deltas
//! against the preceding commit and groups identical deltas across nodes.
//! Reports are cached on disk, so a re-run only asks agents for commits that
//! have never been nooped.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use git2::{Oid, Repository};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::models::{DeltaResource, GroupResource, Report};
use crate::services::agent_client::AgentClient;
use crate::services::cache::ReportCache;
use crate::services::delta::{delta_noop, group_commit, CommitDeltas};
use crate::services::git::{self, CommitInfo};
use crate::services::normalize::normalize_report;

/// Grouped noop output for one commit range
pub struct RangeReview {
    /// Commits in the range, oldest first; the first one is the baseline
    /// and carries no groups
    pub commits: Vec<CommitInfo>,
    /// Commit id (hex) to grouped delta resources
    pub grouped: BTreeMap<String, Vec<GroupResource>>,
}

/// Drives noop runs across the fleet
pub struct ReviewService {
    clients: BTreeMap<String, AgentClient>,
    cache_dir: PathBuf,
}

impl ReviewService {
    /// Build a client per host from the driver configuration
    pub fn new(config: &DriverConfig, hosts: &[String]) -> Result<Self> {
        let timeout = Duration::from_secs(config.apply_timeout_secs);
        let mut clients = BTreeMap::new();
        for host in hosts {
            clients.insert(
                host.clone(),
                AgentClient::new(host, config.agent_port, timeout)?,
            );
        }

        Ok(Self {
            clients,
            cache_dir: config.cache_dir.clone(),
        })
    }

    fn hosts(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Noop every commit in `begin_rev..end_rev` on every node and group the
    /// per-commit deltas across nodes
    pub async fn review_range(
        &self,
        repo: &Repository,
        begin_rev: &str,
        end_rev: &str,
    ) -> Result<RangeReview> {
        let commit_ids = git::commit_range(repo, begin_rev, end_rev)?;
        let commits = commit_ids
            .iter()
            .map(|oid| git::commit_info(repo, *oid))
            .collect::<Result<Vec<_>>>()?;

        let cache = ReportCache::open(&self.cache_dir, begin_rev, end_rev, &self.hosts())?;
        let grouped = self.group_range(&commit_ids, &cache).await?;

        Ok(RangeReview { commits, grouped })
    }

    /// Acquire reports commit by commit, then delta and group
    async fn group_range(
        &self,
        commit_ids: &[Oid],
        cache: &ReportCache,
    ) -> Result<BTreeMap<String, Vec<GroupResource>>> {
        // host -> commit -> report / delta map; written only on this task
        let mut reports: BTreeMap<String, HashMap<Oid, Report>> = BTreeMap::new();
        let mut deltas: BTreeMap<String, HashMap<Oid, BTreeMap<String, DeltaResource>>> =
            BTreeMap::new();
        for host in self.hosts() {
            reports.insert(host.clone(), HashMap::new());
            deltas.insert(host, HashMap::new());
        }

        for (i, oid) in commit_ids.iter().enumerate() {
            info!("nooping: {} ({} of {})", oid, i + 1, commit_ids.len());
            self.noop_commit(*oid, cache, &mut reports).await?;

            if i > 0 {
                let prior_oid = commit_ids[i - 1];
                for (host, host_reports) in &reports {
                    debug!("creating delta resources: {}@({} - {})", host, oid, prior_oid);
                    let prior = &host_reports[&prior_oid];
                    let current = &host_reports[oid];
                    deltas
                        .get_mut(host)
                        .expect("delta map per host")
                        .insert(*oid, delta_noop(prior, current));
                }
            }
        }

        let mut grouped = BTreeMap::new();
        for oid in &commit_ids[1..] {
            info!("grouping: {}", oid);
            let mut commit_deltas: CommitDeltas = deltas
                .iter_mut()
                .map(|(host, per_commit)| {
                    (host.clone(), per_commit.remove(oid).unwrap_or_default())
                })
                .collect();
            grouped.insert(oid.to_string(), group_commit(&mut commit_deltas));
        }

        Ok(grouped)
    }

    /// Materialize every node's report for one commit, from cache or by
    /// fanning out noop requests; returns only once all are on disk
    async fn noop_commit(
        &self,
        oid: Oid,
        cache: &ReportCache,
        reports: &mut BTreeMap<String, HashMap<Oid, Report>>,
    ) -> Result<()> {
        let commit = oid.to_string();
        let mut pending = JoinSet::new();

        for (host, client) in &self.clients {
            if let Some(report) = cache.load(host, &commit)? {
                reports.get_mut(host).expect("report map per host").insert(oid, report);
                continue;
            }

            let client = client.clone();
            let rev = commit.clone();
            pending.spawn(async move {
                let report = client.apply(&rev, true).await;
                (client.host().to_string(), report)
            });
        }

        while let Some(joined) = pending.join_next().await {
            let (host, result) = joined.context("noop request task failed")?;
            let mut report = result.with_context(|| format!("noop of {commit} failed on {host}"))?;
            info!("received noop: {}@{}", report.host, report.configuration_version);

            normalize_report(&mut report)
                .with_context(|| format!("normalizing report for {host}@{commit}"))?;
            cache.store(&host, &commit, &report)?;
            reports.get_mut(&host).expect("report map per host").insert(oid, report);
        }

        Ok(())
    }

    /// Fan `Apply(rev, noop)` out to every node, returning each node's
    /// reported configuration version
    pub async fn apply_rev(&self, rev: &str, noop: bool) -> Result<Vec<(String, String)>> {
        let mut pending = JoinSet::new();
        for client in self.clients.values() {
            let client = client.clone();
            let rev = rev.to_string();
            pending.spawn(async move {
                let report = client.apply(&rev, noop).await;
                (client.host().to_string(), report)
            });
        }

        let mut applied = Vec::new();
        while let Some(joined) = pending.join_next().await {
            let (host, result) = joined.context("apply task failed")?;
            let report = result.with_context(|| format!("apply of {rev} failed on {host}"))?;
            info!("applied: {}@{}", report.host, report.configuration_version);
            applied.push((host, report.configuration_version));
        }

        applied.sort();
        Ok(applied)
    }

    /// Ask every node for its most recent non-noop apply report
    pub async fn fleet_status(&self) -> Result<Vec<(String, String)>> {
        let mut pending = JoinSet::new();
        for client in self.clients.values() {
            let client = client.clone();
            pending.spawn(async move {
                let report = client.last_apply().await;
                (client.host().to_string(), report)
            });
        }

        let mut statuses = Vec::new();
        while let Some(joined) = pending.join_next().await {
            let (host, result) = joined.context("status task failed")?;
            let report =
                result.with_context(|| format!("last-apply request failed for {host}"))?;
            statuses.push((host, report.configuration_version));
        }

        statuses.sort();
        Ok(statuses)
    }
}

impl RangeReview {
    /// Groups for a commit, if any
    pub fn groups_for(&self, commit_id: &str) -> &[GroupResource] {
        self.grouped
            .get(commit_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Open (or clone) the driver's copy of the code repository and fetch the
/// latest refs
pub fn fetch_repo(config: &DriverConfig) -> Result<Repository> {
    let ssh_key = config
        .ssh_key()
        .context("Failed to read SSH private key")?;
    let repo = git::clone_or_open(&config.repo_url, &config.repo_dir, ssh_key.as_deref())
        .context("Unable to open code repository")?;
    git::fetch(&repo, ssh_key.as_deref())?;
    Ok(repo)
}
