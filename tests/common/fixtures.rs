//! Report fixtures
//!
//! Builders for the noop reports the integration tests feed through the
//! normalizer, delta computation and grouping.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use openvox_noop::models::{Event, Log, Report, ResourceStatus};

/// Build a log entry
pub fn log(level: &str, source: &str, message: &str) -> Log {
    Log {
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    }
}

/// Build an event
pub fn event(property: &str, previous: &str, desired: &str) -> Event {
    Event {
        property: property.to_string(),
        previous_value: previous.to_string(),
        desired_value: desired.to_string(),
        message: format!("{property} changed"),
    }
}

/// Canned report builders
pub struct ReportFixtures;

impl ReportFixtures {
    /// A report with no resource changes, used as the range baseline
    pub fn baseline(host: &str, version: &str) -> Report {
        Report {
            host: host.to_string(),
            configuration_version: version.to_string(),
            resource_statuses: Default::default(),
            logs: vec![],
        }
    }

    /// A normalized report where `/etc/motd` changes content to `desired`
    pub fn motd_change(host: &str, version: &str, desired: &str) -> Report {
        let title = "File[/etc/motd]".to_string();
        let status = ResourceStatus {
            resource_type: "File".to_string(),
            containment_path: vec![
                "Stage[main]".to_string(),
                "Profile::Motd".to_string(),
                title.clone(),
            ],
            events: vec![event("content", "{md5}aaa", &BASE64.encode(desired))],
        };

        let mut statuses = std::collections::BTreeMap::new();
        statuses.insert(title.clone(), status);

        Report {
            host: host.to_string(),
            configuration_version: version.to_string(),
            resource_statuses: statuses,
            logs: vec![log(
                "notice",
                &title,
                &format!("@@ -1 +1 @@\n-old motd\n+{desired}\n"),
            )],
        }
    }

    /// A raw (unnormalized) version of [`Self::motd_change`], with log
    /// sources as the configuration tool emits them
    pub fn raw_motd_change(host: &str, version: &str, desired: &str) -> Report {
        let mut report = Self::motd_change(host, version, desired);
        report.logs = vec![
            log("info", "Class[main]", "noise"),
            log("notice", "Puppet", "Applied catalog in 3.1 seconds"),
            log(
                "notice",
                "/Stage[main]/Profile::Motd/File[/etc/motd]/content",
                &format!("\n--- /etc/motd\n+++ /tmp/puppet-file\n@@ -1 +1 @@\n-old motd\n+{desired}\n"),
            ),
        ];
        report
    }
}
