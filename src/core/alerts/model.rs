// Alert model types for events, notifications and filter outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::model::DisasterReport;

/// Kind of event carried on the alert channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// A report was just created in the report store
    #[serde(rename = "new_social")]
    NewSocialReport,
}

impl AlertKind {
    /// Name used in the `type` field of wire frames
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::NewSocialReport => "new_social",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "new_social" => Some(Self::NewSocialReport),
            _ => None,
        }
    }
}

/// Event published once per new report. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    #[serde(rename = "data")]
    pub payload: DisasterReport,
}

impl AlertEvent {
    pub fn new_report(report: DisasterReport) -> Self {
        Self {
            kind: AlertKind::NewSocialReport,
            payload: report,
        }
    }
}

/// A report surfaced to the local user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub report: DisasterReport,
    pub received_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(report: DisasterReport) -> Self {
        Self {
            report,
            received_at: Utc::now(),
        }
    }

    /// Route of the map view focused on this report
    pub fn map_link(&self) -> String {
        format!("/map/{}", self.report.id)
    }
}

/// Why an event did not produce a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// No tag equal to "urgent"
    NotUrgent,
    /// Local client identity unknown
    NoLocalIdentity,
    /// Local client created the report
    OwnReport,
}

/// Outcome of running one event through a client filter
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Notify(Notification),
    Suppressed(SuppressReason),
    /// Not an event this client handles (unknown kind or malformed frame)
    Ignored,
}

impl Delivery {
    pub fn notification(self) -> Option<Notification> {
        match self {
            Self::Notify(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_notify(&self) -> bool {
        matches!(self, Self::Notify(_))
    }
}
