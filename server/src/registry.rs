//! Connection registry for the hub
//!
//! This module tracks every live WebSocket connection, including:
//! - Connection lifecycle (register, unregister, shutdown drain)
//! - Session binding state and which connection currently holds each token
//! - Point-in-time snapshots that fanout pipelines iterate over
//!
//! The registry itself is a plain struct; the hub wraps it in
//! [`SharedRegistry`] so every add, remove, bind and snapshot happens under
//! one lock.

use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::outbox::Outbox;

pub type ConnectionId = u64;

/// The registry as shared between connection tasks and pipelines.
pub type SharedRegistry = Arc<RwLock<ConnectionRegistry>>;

/// Whether a connection has completed the session handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Unbound,
    Bound { token: String, username: String },
}

impl Binding {
    pub fn username(&self) -> Option<&str> {
        match self {
            Binding::Unbound => None,
            Binding::Bound { username, .. } => Some(username),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound { .. })
    }
}

/// A live connection and its registry-side state
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier assigned at registration
    pub id: ConnectionId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    pub connected_at: Instant,
    pub binding: Binding,
    /// Outbound buffer drained by the connection's writer task
    pub outbox: Arc<Outbox>,
}

/// What a fanout round needs to reach one connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub outbox: Arc<Outbox>,
}

/// Result of [`ConnectionRegistry::bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindResult {
    /// The connection now holds the session. `orphaned` is the connection
    /// that held it before, if any; it has been reset to unbound.
    Bound { orphaned: Option<ConnectionId> },
    /// The connection is no longer registered.
    Missing,
}

/// Tracks live connections and session ownership.
///
/// Invariant: `holders[token] == id` exactly when connection `id` is
/// registered and bound to `token`.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    /// Session token -> connection currently bound to it
    holders: HashMap<String, ConnectionId>,
    next_connection_id: ConnectionId,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry; ids start at 1
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            holders: HashMap::new(),
            next_connection_id: 1,
        }
    }

    /// Creates an empty registry behind a shared lock
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Adds a new, unbound connection and returns its id.
    pub fn register(&mut self, addr: SocketAddr, outbox: Arc<Outbox>) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;

        let connection = Connection {
            id,
            addr,
            connected_at: Instant::now(),
            binding: Binding::Unbound,
            outbox,
        };
        info!("Connection {} registered from {}", id, addr);
        self.connections.insert(id, connection);

        id
    }

    /// Removes a connection, releasing any session it holds.
    ///
    /// Returns `None` if it was already gone; calling this twice is harmless.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        if let Binding::Bound { token, .. } = &connection.binding {
            self.release(token, *id);
        }
        info!(
            "Connection {} unregistered after {:?}",
            id,
            connection.connected_at.elapsed()
        );
        Some(connection)
    }

    /// Binds a connection to a session, taking the session away from whichever
    /// connection held it before.
    pub fn bind(&mut self, id: ConnectionId, token: &str, username: &str) -> BindResult {
        let previous_token = match self.connections.get(&id) {
            Some(connection) => match &connection.binding {
                Binding::Bound { token, .. } => Some(token.clone()),
                Binding::Unbound => None,
            },
            None => return BindResult::Missing,
        };
        if let Some(previous_token) = previous_token {
            self.release(&previous_token, id);
        }

        let orphaned = self
            .holders
            .insert(token.to_string(), id)
            .filter(|previous| *previous != id);

        if let Some(orphan_id) = orphaned {
            if let Some(orphan) = self.connections.get_mut(&orphan_id) {
                orphan.binding = Binding::Unbound;
            }
            debug!("Connection {} lost its session to {}", orphan_id, id);
        }

        if let Some(connection) = self.connections.get_mut(&id) {
            connection.binding = Binding::Bound {
                token: token.to_string(),
                username: username.to_string(),
            };
        }

        BindResult::Bound { orphaned }
    }

    fn release(&mut self, token: &str, id: ConnectionId) {
        if self.holders.get(token) == Some(&id) {
            self.holders.remove(token);
        }
    }

    /// Returns a copy of the connection's binding state
    pub fn binding(&self, id: &ConnectionId) -> Option<Binding> {
        self.connections.get(id).map(|c| c.binding.clone())
    }

    /// Connection currently bound to `token`.
    pub fn holder(&self, token: &str) -> Option<ConnectionId> {
        self.holders.get(token).copied()
    }

    /// Gets a live connection by id
    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Checks whether a connection is still registered
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Live connections in registration order.
    ///
    /// The result is detached from the registry, so callers can iterate it
    /// (and await) while other tasks register or remove connections.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self
            .connections
            .values()
            .map(|c| ConnectionHandle {
                id: c.id,
                outbox: Arc::clone(&c.outbox),
            })
            .collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    /// Removes every connection, for shutdown.
    pub fn drain(&mut self) -> Vec<Connection> {
        self.holders.clear();
        let mut drained: Vec<Connection> = self.connections.drain().map(|(_, c)| c).collect();
        drained.sort_by_key(|c| c.id);
        drained
    }

    /// Returns the number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are live
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
