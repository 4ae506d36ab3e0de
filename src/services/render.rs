//! Markdown rendering of a range review
//!
//! Produces the changelog-style report the operator reads before approving
//! an apply: one section per commit, one block per grouped resource.

use std::fmt::Write;

use crate::models::GroupResource;
use crate::services::git::CommitInfo;
use crate::services::review::RangeReview;

/// Render the whole review, oldest commit first. The first commit in the
/// range is the comparison baseline and is not shown.
pub fn render_range(review: &RangeReview) -> String {
    let mut out = String::new();

    for info in review.commits.iter().skip(1) {
        let groups = review.groups_for(&info.id);
        out.push_str(&render_commit(info, groups));
    }

    out
}

/// Render one commit header plus its grouped resources
pub fn render_commit(info: &CommitInfo, groups: &[GroupResource]) -> String {
    let mut out = String::new();

    writeln!(out, "## {}: {}", info.short_id(), info.summary).unwrap();
    writeln!(out).unwrap();

    let author = info.author.as_deref().unwrap_or("unknown");
    let email = info.author_email.as_deref().unwrap_or("unknown");
    match info.date {
        Some(date) => writeln!(
            out,
            "*{} <{}> at {}*",
            author,
            email,
            date.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .unwrap(),
        None => writeln!(out, "*{} <{}>*", author, email).unwrap(),
    }
    writeln!(out).unwrap();

    if let Some(body) = info.body.as_deref().filter(|b| !b.is_empty()) {
        writeln!(out, "{}", body).unwrap();
        writeln!(out).unwrap();
    }

    if groups.is_empty() {
        writeln!(out, "No changes.").unwrap();
        writeln!(out).unwrap();
        return out;
    }

    for group in groups {
        out.push_str(&render_group(group));
    }

    out
}

fn render_group(group: &GroupResource) -> String {
    let mut out = String::new();

    writeln!(out, "### {}", group.title).unwrap();
    writeln!(out).unwrap();

    if !group.define_type.is_empty() {
        writeln!(out, "Defined in: {}", group.define_type).unwrap();
    }
    writeln!(out, "Nodes: {}", group.nodes.join(", ")).unwrap();
    writeln!(out).unwrap();

    if !group.events.is_empty() {
        for event in &group.events {
            writeln!(
                out,
                "- `{}` => `{}`",
                event.previous_value, event.desired_value
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }

    if let Some(diff) = &group.diff {
        writeln!(out, "```diff").unwrap();
        writeln!(out, "{}", diff).unwrap();
        writeln!(out, "```").unwrap();
        writeln!(out).unwrap();
    }

    if !group.logs.is_empty() {
        for log in &group.logs {
            writeln!(out, "- {}: {}", log.level, log.message).unwrap();
        }
        writeln!(out).unwrap();
    }

    out
}
