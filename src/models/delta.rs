//! Change-delta data model
//!
//! `DeltaResource` is the per-node view of what a commit newly changes on one
//! resource relative to its parent commit. `GroupResource` is the same delta
//! unioned across every node that produced it identically.

use serde::Serialize;

use super::report::{Event, Log};

/// New-this-commit events and logs for one resource on one node
///
/// Derived `PartialEq` is load-bearing: two delta resources group together
/// iff every field, including event and log order, compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaResource {
    pub title: String,
    pub resource_type: String,
    /// Title of the user-defined type instance this resource belongs to, or
    /// empty when the resource is not contained in one
    pub define_type: String,
    pub events: Vec<Event>,
    pub logs: Vec<Log>,
}

/// A delta resource shared by one or more nodes at a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupResource {
    pub title: String,
    pub resource_type: String,
    pub define_type: String,
    /// Unified diff hunk lifted out of the delta logs, trailing newline
    /// stripped; at most one per group
    pub diff: Option<String>,
    /// Hosts sharing this exact delta, strictly sorted ascending
    pub nodes: Vec<String>,
    pub events: Vec<GroupEvent>,
    pub logs: Vec<GroupLog>,
}

/// A delta event with operator-facing value cleanup applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEvent {
    pub previous_value: String,
    pub desired_value: String,
}

/// A residual delta log, trailing whitespace trimmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupLog {
    pub level: String,
    pub message: String,
}
