//! Data models

pub mod delta;
pub mod report;

pub use delta::{DeltaResource, GroupEvent, GroupLog, GroupResource};
pub use report::{ApplyRequest, Event, Log, Report, ResourceStatus};
