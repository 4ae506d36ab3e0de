//! HTTP client for the per-node agent
//!
//! The driver talks to each agent over plain HTTP on the management network.
//! Every request carries the apply deadline; a timeout or transport failure
//! surfaces as an error to the caller, never as an empty report.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::models::{ApplyRequest, Report};

/// Client for one node's agent
#[derive(Clone)]
pub struct AgentClient {
    host: String,
    base_url: String,
    client: Client,
}

impl AgentClient {
    /// Build a client for `host`, with `timeout` as the per-request deadline
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build agent HTTP client")?;

        Ok(Self {
            host: host.to_string(),
            base_url: format!("http://{host}:{port}/api/v1"),
            client,
        })
    }

    /// Hostname this client targets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Run the configuration tool at `rev` on the node and return its report
    pub async fn apply(&self, rev: &str, noop: bool) -> Result<Report> {
        let url = format!("{}/apply", self.base_url);
        debug!("requesting apply of {} (noop={}) on {}", rev, noop, self.host);

        let response = self
            .client
            .post(&url)
            .json(&ApplyRequest {
                rev: rev.to_string(),
                noop,
            })
            .send()
            .await
            .with_context(|| format!("Apply request to {} failed", self.host))?;

        self.parse_report(response).await
    }

    /// Fetch the node's most recent non-noop apply report
    pub async fn last_apply(&self) -> Result<Report> {
        let url = format!("{}/last-apply", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Last-apply request to {} failed", self.host))?;

        self.parse_report(response).await
    }

    async fn parse_report(&self, response: reqwest::Response) -> Result<Report> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("agent on {} returned {}: {}", self.host, status, body);
        }

        response
            .json::<Report>()
            .await
            .with_context(|| format!("Cannot deserialize report from {}", self.host))
    }
}
