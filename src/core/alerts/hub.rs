// Server-side fan-out of alert events to connected client sessions.
//
// Every session owns an unbounded queue, so publishing never waits on a slow
// consumer and each session sees events in publish order. Nothing is kept for
// sessions that are not connected at publish time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::model::AlertEvent;
use crate::core::model::ClientId;

pub type ConnectionId = Uuid;

struct SessionHandle {
    client_id: Option<ClientId>,
    tx: mpsc::UnboundedSender<AlertEvent>,
}

type SessionMap = HashMap<ConnectionId, SessionHandle>;

#[derive(Clone, Default)]
pub struct AlertHub {
    sessions: Arc<Mutex<SessionMap>>,
}

impl AlertHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. The session only receives events published
    /// after this call.
    pub fn connect(&self, client_id: Option<ClientId>) -> ClientSession {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(
            id,
            SessionHandle {
                client_id: client_id.clone(),
                tx,
            },
        );
        log::info!(
            "Client connected: {} ({})",
            id,
            client_id.as_deref().unwrap_or("anonymous")
        );

        ClientSession {
            id,
            client_id,
            rx,
            sessions: Arc::clone(&self.sessions),
            closed: false,
        }
    }

    /// Deliver `event` once to every connected session.
    /// Returns the number of sessions it was queued for.
    pub fn publish(&self, event: &AlertEvent) -> usize {
        let mut sessions = self.lock();
        let mut delivered = 0;
        sessions.retain(|id, handle| match handle.tx.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                log::debug!("Dropping dead session {}", id);
                false
            }
        });
        log::debug!(
            "Published {} for report {} to {} session(s)",
            event.kind.wire_name(),
            event.payload.id,
            delivered
        );
        delivered
    }

    pub fn connected(&self) -> usize {
        self.lock().len()
    }

    /// Client ids of the connected sessions that announced one.
    pub fn connected_clients(&self) -> Vec<ClientId> {
        self.lock()
            .values()
            .filter_map(|handle| handle.client_id.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionMap> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One client's end of the alert channel. Dropping it closes the session.
pub struct ClientSession {
    id: ConnectionId,
    client_id: Option<ClientId>,
    rx: mpsc::UnboundedReceiver<AlertEvent>,
    sessions: Arc<Mutex<SessionMap>>,
    closed: bool,
}

impl ClientSession {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for the next event. Returns `None` once the session is closed.
    pub async fn recv(&mut self) -> Option<AlertEvent> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Next already-queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        if self.closed {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop receiving and release the connection. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rx.close();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        log::info!("Client session closed: {}", self.id);
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}
