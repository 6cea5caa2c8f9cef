// Client-side filter deciding whether an alert event surfaces to the local user.
//
// The filter is stateless across events: two events about the same report are
// judged independently. Its urgent-tag gate is separate from the keyword-based
// `priority` field and the two are allowed to disagree.

use super::model::{AlertEvent, AlertKind, Delivery, Notification, SuppressReason};
use crate::core::model::ClientId;

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    /// Identity of the locally authenticated user, if known
    local_client_id: Option<ClientId>,
}

impl AlertFilter {
    pub fn new(local_client_id: Option<ClientId>) -> Self {
        Self { local_client_id }
    }

    pub fn for_client(local_client_id: impl Into<ClientId>) -> Self {
        Self::new(Some(local_client_id.into()))
    }

    pub fn local_client_id(&self) -> Option<&str> {
        self.local_client_id.as_deref()
    }

    /// Update the identity (e.g. after login or logout).
    pub fn set_local_client_id(&mut self, local_client_id: Option<ClientId>) {
        self.local_client_id = local_client_id;
    }

    /// Apply the filter steps in order and return at most one notification.
    pub fn on_event(&self, event: &AlertEvent) -> Delivery {
        if event.kind != AlertKind::NewSocialReport {
            return Delivery::Ignored;
        }

        let report = &event.payload;
        if !report.has_urgent_tag() {
            return Delivery::Suppressed(SuppressReason::NotUrgent);
        }

        let local = match self.local_client_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Delivery::Suppressed(SuppressReason::NoLocalIdentity),
        };

        // Never notify users about their own reports
        if report.created_by == local {
            return Delivery::Suppressed(SuppressReason::OwnReport);
        }

        Delivery::Notify(Notification::new(report.clone()))
    }
}
