//! Session registry: maps the two connection slots to player identities.
//!
//! Identity allocation is a tiny free list seeded with ids 1 and 2, kept
//! sorted on reclaim so a reconnecting player always receives the lowest
//! available id. Each registered connection holds the sender side of its
//! writer task's channel; delivering a message never blocks on the socket.

use log::{debug, info};
use shared::protocol::Message;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Delivery target for an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    Except(u32),
    Only(u32),
}

#[derive(Debug)]
struct ConnectionHandle {
    sender: mpsc::UnboundedSender<Message>,
    addr: SocketAddr,
}

#[derive(Debug)]
pub struct SessionRegistry {
    connections: BTreeMap<u32, ConnectionHandle>,
    available_ids: Vec<u32>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
            available_ids: vec![1, 2],
        }
    }

    /// Claims the lowest free id for a connection, or `None` when both slots
    /// are occupied.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<Message>, addr: SocketAddr) -> Option<u32> {
        if self.available_ids.is_empty() {
            return None;
        }
        let id = self.available_ids.remove(0);
        info!("Player {} registered from {}", id, addr);
        self.connections.insert(id, ConnectionHandle { sender, addr });
        Some(id)
    }

    /// Frees a connection slot and returns its id to the pool.
    pub fn unregister(&mut self, id: u32) -> bool {
        if let Some(handle) = self.connections.remove(&id) {
            if !self.available_ids.contains(&id) {
                self.available_ids.push(id);
                self.available_ids.sort_unstable();
            }
            info!("Player {} from {} unregistered", id, handle.addr);
            true
        } else {
            false
        }
    }

    /// Hands a message to one connection's writer task.
    pub fn send_to(&self, id: u32, message: Message) -> bool {
        match self.connections.get(&id) {
            Some(handle) => {
                if handle.sender.send(message).is_err() {
                    // Writer task already gone; the disconnect event follows.
                    debug!("Dropping message for player {}: writer closed", id);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    /// Fans a message out to the targeted connections.
    pub fn deliver(&self, recipients: Recipients, message: &Message) {
        for (&id, handle) in &self.connections {
            let wanted = match recipients {
                Recipients::All => true,
                Recipients::Except(excluded) => id != excluded,
                Recipients::Only(target) => id == target,
            };
            if wanted && handle.sender.send(message.clone()).is_err() {
                debug!("Dropping broadcast for player {}: writer closed", id);
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
