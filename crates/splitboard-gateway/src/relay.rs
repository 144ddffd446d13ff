//! Event relay: forwards participant events to every other participant.
//!
//! Frames are forwarded as the exact text the sender produced. The relay never
//! interprets payloads: side restrictions and clear semantics are for the
//! receiving clients to apply.

use std::collections::HashMap;

use splitboard_core::protocol::{events, Frame};
use tokio::sync::mpsc;

/// Outbound queue of a single connection.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Live peers and their outbound queues.
#[derive(Debug, Default)]
pub struct EventRelay {
    peers: HashMap<String, Outbound>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_peer(&mut self, conn_id: &str, outbound: Outbound) {
        self.peers.insert(conn_id.to_string(), outbound);
    }

    pub fn remove_peer(&mut self, conn_id: &str) -> bool {
        self.peers.remove(conn_id).is_some()
    }

    #[cfg(test)]
    fn contains(&self, conn_id: &str) -> bool {
        self.peers.contains_key(conn_id)
    }

    #[cfg(test)]
    fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Queue `text` for a single peer. Returns false if the peer is gone.
    pub fn send_to(&self, conn_id: &str, text: String) -> bool {
        self.peers
            .get(conn_id)
            .is_some_and(|tx| tx.send(text).is_ok())
    }

    /// Queue `text` for every peer except `sender`, returning how many peers
    /// accepted it. Peers whose queue has closed are dropped silently.
    pub fn broadcast_except(&mut self, sender: &str, text: &str) -> usize {
        let mut delivered = 0;
        self.peers.retain(|conn_id, tx| {
            if conn_id == sender {
                return true;
            }
            if tx.send(text.to_string()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        delivered
    }
}

/// Handler for one inbound event: `(relay, sender, raw frame) -> deliveries`.
pub type EventHandler = fn(&mut EventRelay, &str, &str) -> usize;

fn on_draw(relay: &mut EventRelay, sender: &str, raw: &str) -> usize {
    relay.broadcast_except(sender, raw)
}

// A bare `clear` wipes the whole board; `{side}` only that half. Receivers decide.
fn on_clear(relay: &mut EventRelay, sender: &str, raw: &str) -> usize {
    relay.broadcast_except(sender, raw)
}

fn on_message(relay: &mut EventRelay, sender: &str, raw: &str) -> usize {
    relay.broadcast_except(sender, raw)
}

/// Result of dispatching one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Relayed { event: String, delivered: usize },
    Unknown { event: String },
    Malformed { reason: String },
}

/// Dispatch table keyed by event name.
pub struct Dispatcher {
    handlers: HashMap<&'static str, EventHandler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, EventHandler> = HashMap::new();
        handlers.insert(events::DRAW, on_draw);
        handlers.insert(events::CLEAR, on_clear);
        handlers.insert(events::MESSAGE, on_message);
        Self { handlers }
    }

    #[cfg(test)]
    fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Route a raw inbound frame from `sender` to its handler.
    pub fn dispatch(&self, relay: &mut EventRelay, sender: &str, raw: &str) -> Dispatch {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                return Dispatch::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        match self.handlers.get(frame.event.as_str()) {
            Some(handler) => Dispatch::Relayed {
                delivered: handler(relay, sender, raw),
                event: frame.event,
            },
            None => Dispatch::Unknown { event: frame.event },
        }
    }
}
