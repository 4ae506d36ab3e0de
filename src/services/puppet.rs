//! Configuration tool invocation
//!
//! The agent shells out to puppet with a configured argument vector from the
//! working directory of the code repository, so hiera relative paths
//! resolve. The tool's report processor drops a JSON report keyed by the
//! commit id; that file is the RPC's return value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::models::Report;

/// Configuration tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuppetConfig {
    /// Path to the puppet binary
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,
    /// Argument vector; `--noop` is appended for noop runs
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the subprocess
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Directory the report processor writes reports into
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Subprocess timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("puppet")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("/opt/puppetlabs/puppet/cache/reports")
}

fn default_timeout() -> u64 {
    600
}

impl Default for PuppetConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            args: vec!["apply".to_string(), "manifests/site.pp".to_string()],
            env: BTreeMap::new(),
            report_dir: default_report_dir(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl PuppetConfig {
    /// Path of the report the tool drops for a run against `oid`
    pub fn report_path(&self, oid: &str) -> PathBuf {
        self.report_dir.join(format!("noop_{oid}.json"))
    }

    /// Path of the report for the most recent non-noop apply
    pub fn last_apply_path(&self) -> PathBuf {
        self.report_dir.join("last_apply.json")
    }
}

/// Run the configuration tool against the checked-out commit `oid` and
/// return its report.
///
/// A non-zero exit, a timeout, a missing report file or a report that does
/// not echo `oid` all fail the run.
pub async fn run(config: &PuppetConfig, repo_dir: &Path, oid: &str, noop: bool) -> Result<Report> {
    if noop {
        info!("nooping: {}", oid);
    } else {
        info!("applying: {}", oid);
    }

    let mut args = config.args.clone();
    if noop {
        args.push("--noop".to_string());
    }

    debug!("executing {:?} {:?} in {:?}", config.binary_path, args, repo_dir);

    let mut cmd = Command::new(&config.binary_path);
    cmd.args(&args)
        .current_dir(repo_dir)
        .envs(&config.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().context("Failed to spawn puppet process")?;
    let mut stdout = child.stdout.take().expect("stdout was configured");
    let mut stderr = child.stderr.take().expect("stderr was configured");

    let waited = timeout(Duration::from_secs(config.timeout_seconds), async {
        let mut stdout_buf = String::new();
        let mut stderr_buf = String::new();
        let (out, err, status) = tokio::join!(
            stdout.read_to_string(&mut stdout_buf),
            stderr.read_to_string(&mut stderr_buf),
            child.wait()
        );
        out.context("Failed to read puppet stdout")?;
        err.context("Failed to read puppet stderr")?;
        let status = status.context("Failed to wait for puppet process")?;
        Ok::<_, anyhow::Error>((stdout_buf, stderr_buf, status))
    })
    .await;

    let (stdout_str, stderr_str, status) = match waited {
        Ok(result) => result?,
        Err(_) => {
            let _ = child.kill().await;
            bail!("puppet run timed out after {} seconds", config.timeout_seconds);
        }
    };

    debug!("puppet stdout:\n{}", stdout_str);
    if !stderr_str.is_empty() {
        debug!("puppet stderr:\n{}", stderr_str);
    }

    if !status.success() {
        error!("puppet run failed: exit={:?}", status.code());
        bail!(
            "puppet exited with {:?}: {}",
            status.code(),
            last_lines(&stderr_str, 10)
        );
    }

    let report = read_report(&config.report_path(oid))?;
    if report.configuration_version != oid {
        bail!(
            "report at {:?} is for configuration version '{}', expected '{}'",
            config.report_path(oid),
            report.configuration_version,
            oid
        );
    }

    info!("run complete: {}@{}", report.host, report.configuration_version);
    Ok(report)
}

/// Read the report of the most recent non-noop apply
pub fn last_apply(config: &PuppetConfig) -> Result<Report> {
    read_report(&config.last_apply_path())
}

fn read_report(path: &Path) -> Result<Report> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read report {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("Cannot deserialize report {:?}", path))
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
