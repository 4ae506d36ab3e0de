//! Change-management hooks
//!
//! Real applies can be gated by operational process: a deployment
//! moratorium check before anything runs, and a change ticket opened and
//! closed around the apply. Each capability is a closed set of providers
//! selected by name in configuration; the default provider does nothing.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Hook provider selection, one entry per capability
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HooksConfig {
    /// Moratorium provider: `none` (default) or `flag-file`
    #[serde(default)]
    pub moratorium: Option<String>,
    /// Flag file checked by the `flag-file` provider
    #[serde(default)]
    pub moratorium_flag_file: Option<PathBuf>,
    /// Ticket lifecycle provider: `none` (default)
    #[serde(default)]
    pub change_management: Option<String>,
}

/// Deployment moratorium providers
#[derive(Debug, Clone)]
pub enum MoratoriumHook {
    /// Never in effect
    None,
    /// In effect while the flag file exists
    FlagFile(PathBuf),
}

impl MoratoriumHook {
    /// Whether deployments are currently blocked
    pub fn in_effect(&self) -> Result<bool> {
        match self {
            MoratoriumHook::None => Ok(false),
            MoratoriumHook::FlagFile(path) => Ok(path.exists()),
        }
    }
}

/// Change ticket lifecycle providers
#[derive(Debug, Clone)]
pub enum TicketHook {
    /// No ticketing; open returns no id
    None,
}

impl TicketHook {
    /// Open a change ticket for an apply, returning its id when the
    /// provider manages tickets
    pub fn open_ticket(&self, _summary: &str) -> Result<Option<String>> {
        match self {
            TicketHook::None => Ok(None),
        }
    }

    /// Close a previously opened ticket with an outcome
    pub fn close_ticket(&self, _ticket_id: &str, _outcome: &str) -> Result<()> {
        match self {
            TicketHook::None => Ok(()),
        }
    }
}

/// Resolved hook providers
#[derive(Debug, Clone)]
pub struct ChangeManagementHooks {
    pub moratorium: MoratoriumHook,
    pub tickets: TicketHook,
}

impl ChangeManagementHooks {
    /// Resolve providers from configuration; an unknown provider name is a
    /// startup error
    pub fn from_config(config: &HooksConfig) -> Result<Self> {
        let moratorium = match config.moratorium.as_deref() {
            None | Some("none") => {
                info!("deployment moratorium hook is not configured");
                MoratoriumHook::None
            }
            Some("flag-file") => match &config.moratorium_flag_file {
                Some(path) => {
                    info!("flag-file moratorium hook registered: {:?}", path);
                    MoratoriumHook::FlagFile(path.clone())
                }
                None => bail!("moratorium 'flag-file' requires moratorium_flag_file"),
            },
            Some(other) => bail!("unknown moratorium provider '{other}'"),
        };

        let tickets = match config.change_management.as_deref() {
            None | Some("none") => {
                info!("change management hooks are not configured");
                TicketHook::None
            }
            Some(other) => bail!("unknown change management provider '{other}'"),
        };

        Ok(Self { moratorium, tickets })
    }
}
