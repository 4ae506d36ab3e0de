//! Per-commit change deltas and cross-node grouping
//!
//! `delta_noop` diffs one node's noop report against the preceding commit's
//! report, keeping only the events and logs the newer commit introduces.
//! `group_commit` then partitions every node's delta resources for a commit
//! into `GroupResource` summaries: nodes whose delta for a title compares
//! structurally equal land in the same group.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::debug;

use crate::models::{DeltaResource, GroupEvent, GroupLog, GroupResource, Report};
use crate::services::normalize::RE_DEFINE_TYPE;

/// Delta resources for every node at one commit, host then title ordered
pub type CommitDeltas = BTreeMap<String, BTreeMap<String, DeltaResource>>;

/// Compute the resources whose noop at `current` introduces at least one
/// event or log not present in `prior`.
///
/// Event comparison is per-title: an event is new unless the prior report has
/// a field-equal event on the same resource (a title absent from the prior
/// report contributes all of its events). Log comparison is global over the
/// prior log stream, since normalization may migrate a log's source.
pub fn delta_noop(prior: &Report, current: &Report) -> BTreeMap<String, DeltaResource> {
    let mut deltas = BTreeMap::new();

    for (title, status) in &current.resource_statuses {
        let mut define_type = String::new();
        if status.containment_path.len() > 2 {
            let candidate = &status.containment_path[status.containment_path.len() - 2];
            if RE_DEFINE_TYPE.is_match(candidate) {
                define_type = candidate.clone();
            }
        }

        let delta_events: Vec<_> = match prior.resource_statuses.get(title) {
            Some(prior_status) => status
                .events
                .iter()
                .filter(|e| !prior_status.events.contains(e))
                .cloned()
                .collect(),
            // No prior resource at all, so every event is new
            None => status.events.clone(),
        };

        let delta_logs: Vec<_> = current
            .logs
            .iter()
            .filter(|l| l.source == *title && !prior.logs.contains(l))
            .cloned()
            .collect();

        if delta_events.is_empty() && delta_logs.is_empty() {
            continue;
        }

        deltas.insert(
            title.clone(),
            DeltaResource {
                title: title.clone(),
                resource_type: status.resource_type.clone(),
                define_type,
                events: delta_events,
                logs: delta_logs,
            },
        );
    }

    deltas
}

/// Partition one commit's delta resources across nodes into groups.
///
/// Walks hosts in ascending name order and each host's remaining titles in
/// ascending order; every group formed consumes the matching entry from each
/// cohort member, so each node appears in exactly one group per title and
/// the output order is deterministic.
pub fn group_commit(deltas: &mut CommitDeltas) -> Vec<GroupResource> {
    let hosts: Vec<String> = deltas.keys().cloned().collect();
    let mut groups = Vec::new();

    for host in &hosts {
        loop {
            let target = match deltas.get(host).and_then(|m| m.values().next()) {
                Some(delta) => delta.clone(),
                None => break,
            };
            groups.push(group_resource(&target, deltas));
        }
    }

    groups
}

/// Form one group around `target`, consuming the structurally-equal delta
/// from every node that carries it.
fn group_resource(target: &DeltaResource, deltas: &mut CommitDeltas) -> GroupResource {
    let mut nodes = Vec::new();

    for (host, host_deltas) in deltas.iter_mut() {
        if let Some(candidate) = host_deltas.get(&target.title) {
            if candidate == target {
                nodes.push(host.clone());
                host_deltas.remove(&target.title);
            } else {
                debug!(host = %host, title = %target.title, "delta differs, not grouped");
            }
        }
    }
    nodes.sort();

    let events = target
        .events
        .iter()
        .map(|e| GroupEvent {
            previous_value: strip_value_symbol(&e.previous_value).to_string(),
            desired_value: desired_value(target, &e.property, &e.desired_value),
        })
        .collect();

    let mut diff = None;
    let mut logs = Vec::new();
    for log in &target.logs {
        if diff.is_none() && log.message.starts_with("@@ ") {
            diff = Some(log.message.strip_suffix('\n').unwrap_or(&log.message).to_string());
        } else {
            logs.push(GroupLog {
                level: log.level.clone(),
                message: log.message.trim_end().to_string(),
            });
        }
    }

    GroupResource {
        title: target.title.clone(),
        resource_type: target.resource_type.clone(),
        define_type: target.define_type.clone(),
        diff,
        nodes,
        events,
        logs,
    }
}

/// Strip one leading `:` — old tool versions serialize symbol values with a
/// leading colon.
fn strip_value_symbol(value: &str) -> &str {
    value.strip_prefix(':').unwrap_or(value)
}

/// File content events carry the desired value base64-encoded; everything
/// else is shown verbatim apart from the symbol marker.
///
/// Only a failed base64 decode falls back to the raw string. Decoded bytes
/// that are not valid UTF-8 are still the file's content and are rendered
/// lossily rather than discarded.
fn desired_value(target: &DeltaResource, property: &str, raw: &str) -> String {
    if target.resource_type == "File" && property == "content" {
        match BASE64.decode(raw) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => raw.to_string(),
        }
    } else {
        strip_value_symbol(raw).to_string()
    }
}
