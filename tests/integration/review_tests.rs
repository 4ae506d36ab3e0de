//! Range review against a seeded cache
//!
//! These tests drive `ReviewService::review_range` with every report
//! pre-seeded on disk: a warm cache answers without any agent RPC, so the
//! fleet can be entirely unreachable. A missing report plus an unreachable
//! agent must fail the run rather than degrade to an empty report.

use std::path::PathBuf;

use openvox_noop::config::DriverConfig;
use openvox_noop::services::cache::ReportCache;
use openvox_noop::services::render::render_range;
use openvox_noop::services::review::ReviewService;

use crate::common::{ReportFixtures, TestRepo};

fn driver_config(cache_dir: PathBuf) -> DriverConfig {
    DriverConfig {
        repo_url: "https://git.example.com/ops/puppetcode.git".to_string(),
        repo_dir: PathBuf::from("/nonexistent"),
        ssh_private_key_file: None,
        cache_dir,
        // Nothing listens here; any RPC attempt fails fast
        agent_port: 1,
        apply_timeout_secs: 5,
        hooks: Default::default(),
    }
}

fn hosts() -> Vec<String> {
    vec!["127.0.0.1".to_string(), "127.0.0.2".to_string()]
}

#[tokio::test]
async fn test_warm_cache_reviews_without_any_rpc() {
    let test_repo = TestRepo::new();
    let base = test_repo.commit("node default {}\n", "initial manifests");
    let tip = test_repo.commit("node default { include motd }\n", "add motd");
    test_repo.tag("v1", base);
    test_repo.tag("v2", tip);

    let cache_dir = tempfile::tempdir().unwrap();
    let node_list = hosts();
    let cache = ReportCache::open(cache_dir.path(), "v1", "v2", &node_list).unwrap();
    for host in &node_list {
        cache
            .store(host, &base.to_string(), &ReportFixtures::baseline(host, &base.to_string()))
            .unwrap();
        cache
            .store(
                host,
                &tip.to_string(),
                &ReportFixtures::motd_change(host, &tip.to_string(), "hello fleet"),
            )
            .unwrap();
    }

    let service = ReviewService::new(&driver_config(cache_dir.path().to_path_buf()), &node_list)
        .unwrap();
    let review = service.review_range(&test_repo.repo, "v1", "v2").await.unwrap();

    assert_eq!(review.commits.len(), 2);
    assert_eq!(review.commits[1].summary, "add motd");

    let groups = review.groups_for(&tip.to_string());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].nodes, node_list);
    assert_eq!(groups[0].events[0].desired_value, "hello fleet");

    // The baseline commit carries no groups
    assert!(review.groups_for(&base.to_string()).is_empty());
}

#[tokio::test]
async fn test_repeated_runs_render_identically() {
    let test_repo = TestRepo::new();
    let base = test_repo.commit("node default {}\n", "initial manifests");
    let tip = test_repo.commit("node default { include motd }\n", "add motd");
    test_repo.tag("v1", base);
    test_repo.tag("v2", tip);

    let cache_dir = tempfile::tempdir().unwrap();
    let node_list = hosts();
    let cache = ReportCache::open(cache_dir.path(), "v1", "v2", &node_list).unwrap();
    for host in &node_list {
        cache
            .store(host, &base.to_string(), &ReportFixtures::baseline(host, &base.to_string()))
            .unwrap();
        cache
            .store(
                host,
                &tip.to_string(),
                &ReportFixtures::motd_change(host, &tip.to_string(), "hello fleet"),
            )
            .unwrap();
    }

    let service = ReviewService::new(&driver_config(cache_dir.path().to_path_buf()), &node_list)
        .unwrap();

    let first = render_range(&service.review_range(&test_repo.repo, "v1", "v2").await.unwrap());
    let second = render_range(&service.review_range(&test_repo.repo, "v1", "v2").await.unwrap());

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_report_with_unreachable_agent_fails_the_run() {
    let test_repo = TestRepo::new();
    let base = test_repo.commit("node default {}\n", "initial manifests");
    let tip = test_repo.commit("node default { include motd }\n", "add motd");
    test_repo.tag("v1", base);
    test_repo.tag("v2", tip);

    let cache_dir = tempfile::tempdir().unwrap();
    let node_list = vec!["127.0.0.1".to_string()];
    let cache = ReportCache::open(cache_dir.path(), "v1", "v2", &node_list).unwrap();
    // Baseline present, tip report missing: the driver must go to the agent
    cache
        .store(
            "127.0.0.1",
            &base.to_string(),
            &ReportFixtures::baseline("127.0.0.1", &base.to_string()),
        )
        .unwrap();

    let service = ReviewService::new(&driver_config(cache_dir.path().to_path_buf()), &node_list)
        .unwrap();
    let result = service.review_range(&test_repo.repo, "v1", "v2").await;

    assert!(result.is_err(), "an unreachable agent must fail the run");
}

#[tokio::test]
async fn test_cached_report_for_wrong_host_fails_the_run() {
    let test_repo = TestRepo::new();
    let base = test_repo.commit("node default {}\n", "initial manifests");
    let tip = test_repo.commit("node default { include motd }\n", "add motd");
    test_repo.tag("v1", base);
    test_repo.tag("v2", tip);

    let cache_dir = tempfile::tempdir().unwrap();
    let node_list = vec!["127.0.0.1".to_string()];
    let cache = ReportCache::open(cache_dir.path(), "v1", "v2", &node_list).unwrap();
    // Both reports present, but the baseline claims another host
    cache
        .store(
            "127.0.0.1",
            &base.to_string(),
            &ReportFixtures::baseline("intruder.example.com", &base.to_string()),
        )
        .unwrap();
    cache
        .store(
            "127.0.0.1",
            &tip.to_string(),
            &ReportFixtures::motd_change("127.0.0.1", &tip.to_string(), "hello fleet"),
        )
        .unwrap();

    let service = ReviewService::new(&driver_config(cache_dir.path().to_path_buf()), &node_list)
        .unwrap();
    let result = service.review_range(&test_repo.repo, "v1", "v2").await;

    assert!(result.is_err(), "a host mismatch in the cache must fail the run");
}
