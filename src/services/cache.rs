//! On-disk noop report cache
//!
//! Reports are cached under `<root>/<begin>..<end>/<host>/<commit>.json` so
//! a re-run of the same range issues no RPC for work already done. Cached
//! reports are stored post-normalization and read back as authoritative.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::models::Report;

/// Report cache for one commit range
pub struct ReportCache {
    root: PathBuf,
}

impl ReportCache {
    /// Open the cache for `begin_rev..end_rev`, creating per-host
    /// directories as needed
    pub fn open(cache_dir: &Path, begin_rev: &str, end_rev: &str, hosts: &[String]) -> Result<Self> {
        let root = cache_dir.join(format!("{begin_rev}..{end_rev}"));
        for host in hosts {
            std::fs::create_dir_all(root.join(host))
                .with_context(|| format!("Failed to create cache directory for {host}"))?;
        }
        Ok(Self { root })
    }

    /// Path of the cached report for `(host, commit)`
    pub fn report_path(&self, host: &str, commit: &str) -> PathBuf {
        self.root.join(host).join(format!("{commit}.json"))
    }

    /// Load the cached report for `(host, commit)` if present.
    ///
    /// A cached report naming a different host is an integrity error, not a
    /// miss: silently accepting it would attribute one node's changes to
    /// another.
    pub fn load(&self, host: &str, commit: &str) -> Result<Option<Report>> {
        let path = self.report_path(host, commit);
        if !path.exists() {
            return Ok(None);
        }

        let data = std::fs::read(&path)
            .with_context(|| format!("Failed to read cached report {:?}", path))?;
        let report: Report = serde_json::from_slice(&data)
            .with_context(|| format!("Cannot deserialize cached report {:?}", path))?;

        if report.host != host {
            bail!(
                "Cached report {:?} is for host '{}', expected '{}'",
                path,
                report.host,
                host
            );
        }

        debug!("found cached noop: {}@{}", report.host, report.configuration_version);
        Ok(Some(report))
    }

    /// Write the report for `(host, commit)`
    pub fn store(&self, host: &str, commit: &str, report: &Report) -> Result<()> {
        let path = self.report_path(host, commit);
        let data = serde_json::to_vec(report).context("Cannot serialize report")?;
        std::fs::write(&path, data)
            .with_context(|| format!("Failed to write cached report {:?}", path))?;
        Ok(())
    }
}
