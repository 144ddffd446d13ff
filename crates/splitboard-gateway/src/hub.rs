//! Relay hub: the single task that owns all session state.
//!
//! Connection tasks never touch the registry or the peer table directly.
//! They post `HubEvent`s onto one channel and the hub applies them in
//! arrival order, each to completion, so no locking is needed. Events from a
//! single connection keep their order because its reader posts them in the
//! order they came off the socket.
//!
//! Per-connection lifecycle: `Connected` assigns a side and queues the
//! `assignSide` frame ahead of anything relayed, `Inbound` frames go through
//! the dispatch table, and after `Disconnected` nothing more is accepted
//! from that id.

use serde::Serialize;
use splitboard_core::protocol::{Frame, Side};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::{SessionRegistry, SideCounts};
use crate::relay::{Dispatch, Dispatcher, EventRelay, Outbound};

/// Events funnelled into the hub.
#[derive(Debug)]
pub enum HubEvent {
    Connected {
        conn_id: String,
        outbound: Outbound,
        assigned: Option<oneshot::Sender<Side>>,
    },
    Inbound {
        conn_id: String,
        text: String,
    },
    Disconnected {
        conn_id: String,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Snapshot of the hub for the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub sides: SideCounts,
}

/// Cloneable sender side of the hub. The hub stops once every handle is gone.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    /// Register a connection and wait for its side.
    ///
    /// Returns `None` if the hub has shut down.
    pub async fn connect(&self, conn_id: &str, outbound: Outbound) -> Option<Side> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubEvent::Connected {
                conn_id: conn_id.to_string(),
                outbound,
                assigned: Some(reply),
            })
            .ok()?;
        rx.await.ok()
    }

    pub fn inbound(&self, conn_id: &str, text: String) {
        let _ = self.tx.send(HubEvent::Inbound {
            conn_id: conn_id.to_string(),
            text,
        });
    }

    pub fn disconnect(&self, conn_id: &str) {
        let _ = self.tx.send(HubEvent::Disconnected {
            conn_id: conn_id.to_string(),
        });
    }

    pub async fn stats(&self) -> HubStats {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubEvent::Stats { reply }).is_err() {
            return HubStats::default();
        }
        rx.await.unwrap_or_default()
    }
}

/// Session state owned by the hub task.
#[derive(Default)]
pub struct Hub {
    registry: SessionRegistry,
    relay: EventRelay,
    dispatcher: Dispatcher,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the hub on the current runtime.
    pub fn spawn() -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Hub::new().run(rx));
        (HubHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<HubEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        debug!("Relay hub stopped");
    }

    /// Apply one event to completion.
    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected {
                conn_id,
                outbound,
                assigned,
            } => {
                let side = self.connect(&conn_id, outbound);
                if let Some(reply) = assigned {
                    let _ = reply.send(side);
                }
            }
            HubEvent::Inbound { conn_id, text } => self.inbound(&conn_id, &text),
            HubEvent::Disconnected { conn_id } => self.disconnect(&conn_id),
            HubEvent::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn connect(&mut self, conn_id: &str, outbound: Outbound) -> Side {
        let side = self.registry.on_connect(conn_id);
        self.relay.add_peer(conn_id, outbound);

        match Frame::assign_side(side).encode() {
            Ok(text) => {
                if !self.relay.send_to(conn_id, text) {
                    debug!(conn_id, "Peer gone before side assignment was delivered");
                }
            }
            Err(e) => warn!(conn_id, %e, "Failed to encode assignSide"),
        }

        info!(conn_id, %side, connections = self.registry.len(), "Connection assigned");
        side
    }

    fn inbound(&mut self, conn_id: &str, text: &str) {
        if self.registry.side_of(conn_id).is_none() {
            debug!(conn_id, "Dropping event from unregistered connection");
            return;
        }

        match self.dispatcher.dispatch(&mut self.relay, conn_id, text) {
            Dispatch::Relayed { event, delivered } => {
                debug!(conn_id, event = %event, delivered, "Relayed event");
            }
            Dispatch::Unknown { event } => {
                debug!(conn_id, event = %event, "Ignoring unknown event");
            }
            Dispatch::Malformed { reason } => {
                warn!(conn_id, %reason, "Malformed frame dropped");
            }
        }
    }

    fn disconnect(&mut self, conn_id: &str) {
        self.relay.remove_peer(conn_id);
        match self.registry.on_disconnect(conn_id) {
            Some(side) => {
                info!(conn_id, %side, connections = self.registry.len(), "Connection released");
            }
            None => debug!(conn_id, "Disconnect for unknown connection"),
        }
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.len(),
            sides: self.registry.counts(),
        }
    }

    #[cfg(test)]
    fn side_of(&self, conn_id: &str) -> Option<Side> {
        self.registry.side_of(conn_id)
    }
}
