//! openvox-noop driver
//!
//! Walks a commit range of the configuration code repository, dry-runs every
//! commit on every requested node, and prints the grouped per-commit change
//! deltas as Markdown. Can also fan a single revision out to the fleet
//! (`--rev`) or report each node's last applied version (`--status`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use openvox_noop::config::DriverConfig;
use openvox_noop::services::cm_hooks::ChangeManagementHooks;
use openvox_noop::services::render;
use openvox_noop::services::review::{fetch_repo, ReviewService};
use openvox_noop::utils::validation::{validate_certname, validate_rev};

#[derive(Parser, Debug)]
#[command(
    name = "openvox-noop",
    version,
    about = "Review configuration code commits by nooping them across a fleet"
)]
struct Cli {
    /// Node to include; repeat for each node
    #[arg(long = "node", value_name = "HOST")]
    nodes: Vec<String>,

    /// First revision of the range (exclusive)
    #[arg(long)]
    beginrev: Option<String>,

    /// Last revision of the range (inclusive)
    #[arg(long)]
    endrev: Option<String>,

    /// Single revision to apply or noop on every node
    #[arg(long, conflicts_with_all = ["beginrev", "endrev"])]
    rev: Option<String>,

    /// Run the configuration tool in noop mode (with --rev)
    #[arg(long)]
    noop: bool,

    /// Print each node's last applied configuration version
    #[arg(long, conflicts_with_all = ["beginrev", "endrev", "rev"])]
    status: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap prints its own message; keep the documented exit code
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "openvox_noop=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn run(cli: Cli) -> Result<()> {
    if cli.nodes.is_empty() {
        bail!("You must supply one or more nodes with --node");
    }
    for node in &cli.nodes {
        if !validate_certname(node) {
            bail!("Invalid node name '{node}'");
        }
    }
    for rev in [&cli.rev, &cli.beginrev, &cli.endrev].into_iter().flatten() {
        if !validate_rev(rev) {
            bail!("Invalid revision '{rev}'");
        }
    }

    let config = DriverConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let hooks = ChangeManagementHooks::from_config(&config.hooks)
        .context("Failed to initialize change-management hooks")?;
    let review = ReviewService::new(&config, &cli.nodes)?;

    if cli.status {
        for (host, version) in review.fleet_status().await? {
            println!("{host}: {version}");
        }
        return Ok(());
    }

    if let Some(rev) = &cli.rev {
        return apply_rev(&review, &hooks, rev, cli.noop).await;
    }

    let (begin_rev, end_rev) = match (&cli.beginrev, &cli.endrev) {
        (Some(begin), Some(end)) => (begin.clone(), end.clone()),
        _ => bail!("You must supply --beginrev and --endrev, or --rev"),
    };

    let repo = fetch_repo(&config)?;
    let result = review.review_range(&repo, &begin_rev, &end_rev).await?;
    print!("{}", render::render_range(&result));

    Ok(())
}

/// Fan a single revision out to the fleet, gated by change management for
/// real applies
async fn apply_rev(
    review: &ReviewService,
    hooks: &ChangeManagementHooks,
    rev: &str,
    noop: bool,
) -> Result<()> {
    let mut ticket = None;
    if !noop {
        if hooks.moratorium.in_effect()? {
            bail!("A deployment moratorium is in effect; refusing to apply {rev}");
        }
        ticket = hooks
            .tickets
            .open_ticket(&format!("apply {rev}"))
            .context("Failed to open change ticket")?;
        if let Some(id) = &ticket {
            info!("opened change ticket {id}");
        }
    }

    let outcome = review.apply_rev(rev, noop).await;

    if let Some(id) = &ticket {
        let status = if outcome.is_ok() { "successful" } else { "failed" };
        hooks
            .tickets
            .close_ticket(id, status)
            .context("Failed to close change ticket")?;
    }

    for (host, version) in outcome? {
        println!("{host}: {version}");
    }
    Ok(())
}
