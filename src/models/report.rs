//! Noop report data model
//!
//! The wire format shared by the agent RPCs and the driver's on-disk report
//! cache. Field names match the JSON the configuration tool's report
//! processor emits; unknown fields are ignored on read so report format
//! bumps do not break cached ranges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single noop (or apply) run on one node at one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Report {
    /// Certname of the node the run executed on
    #[serde(default)]
    pub host: String,

    /// Commit id (hex) the run was executed against
    #[serde(default)]
    pub configuration_version: String,

    /// Resource title (e.g. `File[/etc/foo]`) to status. Ordered so cached
    /// reports serialize deterministically.
    #[serde(default)]
    pub resource_statuses: BTreeMap<String, ResourceStatus>,

    /// Run log stream, in emission order
    #[serde(default)]
    pub logs: Vec<Log>,
}

/// Per-resource outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceStatus {
    /// Resource type, e.g. `File`
    #[serde(default)]
    pub resource_type: String,

    /// Ancestor titles ending at this resource; a user-defined type shows up
    /// as the second-to-last element
    #[serde(default)]
    pub containment_path: Vec<String>,

    /// Property-level intended changes
    #[serde(default)]
    pub events: Vec<Event>,
}

/// One property-level intended change on a resource
///
/// Two events are equal iff all four fields are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Event {
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub previous_value: String,
    #[serde(default)]
    pub desired_value: String,
    #[serde(default)]
    pub message: String,
}

/// One log entry from a run
///
/// Two logs are equal iff all three fields are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Log {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub message: String,
}

/// Request body for the agent's apply endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Revision to check out and run, tag-like or a full commit id
    pub rev: String,
    /// When true the configuration tool runs in noop mode
    #[serde(default)]
    pub noop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_default() {
        let report = Report::default();
        assert!(report.host.is_empty());
        assert!(report.resource_statuses.is_empty());
        assert!(report.logs.is_empty());
    }

    #[test]
    fn test_parse_report_ignores_unknown_fields() {
        let json = r#"{
            "host": "web1.example.com",
            "configuration_version": "9f2d5c1a",
            "kind": "noop",
            "resource_statuses": {
                "File[/etc/motd]": {
                    "resource_type": "File",
                    "containment_path": ["Stage[main]", "Motd", "File[/etc/motd]"],
                    "events": [
                        {
                            "property": "content",
                            "previous_value": "{md5}aaa",
                            "desired_value": "{md5}bbb",
                            "message": "content changed",
                            "status": "noop"
                        }
                    ]
                }
            },
            "logs": [
                {"level": "notice", "source": "Puppet", "message": "done"}
            ]
        }"#;

        let report: Report = serde_json::from_str(json).expect("report should parse");
        assert_eq!(report.host, "web1.example.com");
        assert_eq!(report.resource_statuses.len(), 1);
        let status = &report.resource_statuses["File[/etc/motd]"];
        assert_eq!(status.resource_type, "File");
        assert_eq!(status.events[0].property, "content");
        assert_eq!(report.logs[0].level, "notice");
    }

    #[test]
    fn test_event_equality_is_fieldwise() {
        let a = Event {
            property: "content".to_string(),
            previous_value: "old".to_string(),
            desired_value: "new".to_string(),
            message: "content changed".to_string(),
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.message = "different".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn test_apply_request_noop_defaults_false() {
        let req: ApplyRequest = serde_json::from_str(r#"{"rev": "v1"}"#).unwrap();
        assert_eq!(req.rev, "v1");
        assert!(!req.noop);
    }
}
