//! Normalization, delta and grouping end to end
//!
//! Feeds raw reports through the full pure pipeline: normalize, delta
//! against the prior commit, group across nodes.

use std::collections::BTreeMap;

use openvox_noop::services::delta::{delta_noop, group_commit, CommitDeltas};
use openvox_noop::services::normalize::normalize_report;

use crate::common::ReportFixtures;

fn deltas_for(hosts_and_reports: Vec<(&str, openvox_noop::models::Report)>) -> CommitDeltas {
    hosts_and_reports
        .into_iter()
        .map(|(host, mut current)| {
            normalize_report(&mut current).expect("normalize");
            let baseline = ReportFixtures::baseline(host, "1111111111111111111111111111111111111111");
            (host.to_string(), delta_noop(&baseline, &current))
        })
        .collect()
}

#[test]
fn test_identical_noops_group_across_nodes() {
    let version = "2222222222222222222222222222222222222222";
    let mut deltas = deltas_for(vec![
        ("web1", ReportFixtures::raw_motd_change("web1", version, "hello fleet")),
        ("web2", ReportFixtures::raw_motd_change("web2", version, "hello fleet")),
    ]);

    let groups = group_commit(&mut deltas);

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.title, "File[/etc/motd]");
    assert_eq!(group.nodes, vec!["web1", "web2"]);
    // The content event decodes to the desired file bytes
    assert_eq!(group.events[0].desired_value, "hello fleet");
    // The diff log was lifted out, preamble already stripped by
    // normalization and trailing newline removed by grouping
    assert_eq!(group.diff.as_deref(), Some("@@ -1 +1 @@\n-old motd\n+hello fleet"));
    assert!(group.logs.is_empty());
}

#[test]
fn test_diverging_nodes_split_into_two_groups() {
    let version = "2222222222222222222222222222222222222222";
    let mut deltas = deltas_for(vec![
        ("web1", ReportFixtures::raw_motd_change("web1", version, "hello fleet")),
        ("web2", ReportFixtures::raw_motd_change("web2", version, "different motd")),
    ]);

    let groups = group_commit(&mut deltas);

    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.title == "File[/etc/motd]"));
    assert_eq!(groups[0].nodes, vec!["web1"]);
    assert_eq!(groups[1].nodes, vec!["web2"]);
    assert_eq!(groups[0].events[0].desired_value, "hello fleet");
    assert_eq!(groups[1].events[0].desired_value, "different motd");
}

#[test]
fn test_unchanged_node_contributes_no_delta() {
    let version = "2222222222222222222222222222222222222222";
    let mut current = ReportFixtures::raw_motd_change("web1", version, "hello fleet");
    normalize_report(&mut current).unwrap();

    // Same report as prior and current: nothing is new
    let deltas = delta_noop(&current.clone(), &current);
    assert!(deltas.is_empty());

    let mut commit_deltas: CommitDeltas = BTreeMap::new();
    commit_deltas.insert("web1".to_string(), deltas);
    assert!(group_commit(&mut commit_deltas).is_empty());
}
