//! Connection registry and fan-out. Each connected socket owns an unbounded
//! channel; the hub pushes serialized frames into it and never waits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::warn;

use crate::types::ServerEvent;

pub type ClientId = u64;

/// Outbound frame for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Where the pipeline sends its events. Calls must not block.
pub trait Transport: Send + Sync + 'static {
    fn broadcast_all(&self, event: &ServerEvent);

    /// Broadcast several events so that every client sees all of them, in
    /// order, or none of them (a client joining mid-sequence gets nothing).
    fn broadcast_seq(&self, events: &[ServerEvent]) {
        for event in events {
            self.broadcast_all(event);
        }
    }

    fn unicast(&self, client: ClientId, event: &ServerEvent);
    fn client_count(&self) -> usize;
}

#[derive(Default)]
pub struct Hub {
    next_id: AtomicU64,
    clients: RwLock<HashMap<ClientId, mpsc::UnboundedSender<Outbound>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection; the caller forwards the receiver to its socket.
    pub fn register(&self) -> (ClientId, OutboundRx) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Ask every connection to close, then forget them all.
    pub fn close_all(&self) {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        for tx in clients.values() {
            let _ = tx.send(Outbound::Close);
        }
        clients.clear();
    }

    fn encode(event: &ServerEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(js) => Some(js),
            Err(e) => {
                warn!(event = event.name(), "failed to serialize event: {e}");
                None
            }
        }
    }
}

impl Transport for Hub {
    fn broadcast_all(&self, event: &ServerEvent) {
        let Some(js) = Self::encode(event) else {
            return;
        };
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        for tx in clients.values() {
            // closed channels are cleaned up when their socket task exits
            let _ = tx.send(Outbound::Text(js.clone()));
        }
    }

    fn broadcast_seq(&self, events: &[ServerEvent]) {
        let frames: Vec<String> = events.iter().filter_map(Self::encode).collect();
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        for tx in clients.values() {
            for js in &frames {
                let _ = tx.send(Outbound::Text(js.clone()));
            }
        }
    }

    fn unicast(&self, client: ClientId, event: &ServerEvent) {
        let Some(js) = Self::encode(event) else {
            return;
        };
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = clients.get(&client) {
            let _ = tx.send(Outbound::Text(js));
        }
    }

    fn client_count(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
