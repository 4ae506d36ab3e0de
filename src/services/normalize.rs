//! Report log normalization
//!
//! A raw noop report carries log chatter that varies between runs and
//! between nodes even when the intended change is identical: property-diff
//! summaries, catalog totals, logs attributed to class/stage/define wrappers,
//! and file diffs whose three-line preamble embeds temp paths. Grouping
//! compares logs byte-for-byte, so everything non-semantic is dropped or
//! rewritten here before a report is cached or diffed.
//!
//! Normalization is idempotent: running it over an already-normalized report
//! returns the same log stream.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::Report;

/// Shape of a user-defined-type (or any bare resource) title, `Name[key]`
pub(crate) static RE_DEFINE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9_:]*\[[^\]]+\]$").unwrap());

/// Trailing `/property` segment of a resource log source
static RE_PROPERTY_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[a-z][a-z0-9_]*$").unwrap());

/// Trailing `Name[key]` token of a resource log source
static RE_RESOURCE_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^/]+\[[^\[\]]+\]$").unwrap());

/// A source ending in a file-content property, whose message may be a diff
static RE_FILE_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"File\[.*content$").unwrap());

/// A unified diff message: one marker character, then the `---` header
static RE_DIFF_PREAMBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^.---").unwrap());

/// Rewrite `report.logs` in place so that two nodes producing the same real
/// change produce byte-equal logs. `resource_statuses` are never modified.
///
/// Fails when a resource log source cannot be reduced to a resource title;
/// silently keeping such an entry would quietly split groups downstream.
pub fn normalize_report(report: &mut Report) -> Result<()> {
    let mut kept = Vec::with_capacity(report.logs.len());

    for mut log in report.logs.drain(..) {
        if log.message.starts_with("current_value") || log.message.starts_with("Applied catalog") {
            debug!(source = %log.source, message = %log.message, "dropping log");
            continue;
        }

        // Already attributed to a managed resource; a second pass must keep
        // it rather than mistake it for define-wrapper chatter below.
        if report.resource_statuses.contains_key(&log.source) {
            kept.push(log);
            continue;
        }

        if log.source.starts_with("Class[")
            || log.source.starts_with("Stage[")
            || RE_DEFINE_TYPE.is_match(&log.source)
        {
            debug!(source = %log.source, message = %log.message, "dropping log");
            continue;
        }

        if !log.source.starts_with("/Stage")
            && log.message.starts_with("Would have triggered 'refresh'")
        {
            debug!(source = %log.source, message = %log.message, "dropping log");
            continue;
        }

        if log.source.starts_with("/Stage") {
            let stripped = RE_PROPERTY_TAIL.replace(&log.source, "");
            let title = RE_RESOURCE_TAIL
                .find(&stripped)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            if title.is_empty() {
                bail!(
                    "unable to extract a resource title from log source '{}' (message: '{}')",
                    log.source,
                    log.message
                );
            }

            if RE_FILE_CONTENT.is_match(&log.source) && RE_DIFF_PREAMBLE.is_match(&log.message) {
                log.message = strip_diff_preamble(&log.message);
            }

            debug!(from = %log.source, to = %title, "rewrote log source");
            log.source = title;
            kept.push(log);
            continue;
        }

        debug!(source = %log.source, message = %log.message, "unaccounted log kept as-is");
        kept.push(log);
    }

    report.logs = kept;
    Ok(())
}

/// Drop the first three lines of a unified diff message: the `---`/`+++`
/// file headers and the hunk line vary between runs while the hunk body is
/// what the operator reviews.
fn strip_diff_preamble(message: &str) -> String {
    let mut out = String::new();
    for line in message.lines().skip(3) {
        out.push_str(line);
        out.push('\n');
    }
    out
}
