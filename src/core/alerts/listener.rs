// Client-side consumption of the alert channel.

use super::filter::AlertFilter;
use super::hub::ClientSession;
use super::model::{Delivery, Notification};
use super::wire;

/// Decodes raw frames from a remote transport and runs them through a filter.
pub struct AlertListener {
    filter: AlertFilter,
}

impl AlertListener {
    pub fn new(filter: AlertFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &AlertFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut AlertFilter {
        &mut self.filter
    }

    /// Handle one text frame. Frames that fail to decode are ignored so the
    /// connection can keep going.
    pub fn on_frame(&self, text: &str) -> Delivery {
        match wire::decode(text) {
            Ok(event) => self.filter.on_event(&event),
            Err(e) => {
                log::debug!("Ignoring alert frame: {}", e);
                Delivery::Ignored
            }
        }
    }
}

/// Wait for the next event on `session` that passes `filter`.
/// Returns `None` when the session closes.
pub async fn next_notification(
    session: &mut ClientSession,
    filter: &AlertFilter,
) -> Option<Notification> {
    while let Some(event) = session.recv().await {
        if let Delivery::Notify(notification) = filter.on_event(&event) {
            return Some(notification);
        }
    }
    None
}
