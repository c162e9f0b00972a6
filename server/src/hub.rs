//! The hub instance: registry, sessions, pipelines and their lifecycle.

use bytes::Bytes;
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::{HubConfig, OrphanPolicy};
use crate::error::HubError;
use crate::fanout;
use crate::frame::Frame;
use crate::handshake;
use crate::outbox::Outbox;
use crate::reaper::Reaper;
use crate::registry::{ConnectionId, ConnectionRegistry, SharedRegistry};
use crate::router::{self, ChatMessage, Route};
use crate::session::SessionStore;

const EVENT_CAPACITY: usize = 256;

/// Connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    Connected { id: ConnectionId, addr: SocketAddr },
    Bound { id: ConnectionId, username: String },
    /// The session moved to another connection
    Unbound {
        id: ConnectionId,
        username: String,
        successor: ConnectionId,
    },
    Reaped { id: ConnectionId, reason: String },
}

pub struct Hub {
    config: HubConfig,
    registry: SharedRegistry,
    sessions: SessionStore,
    reaper: Reaper,
    chat_tx: mpsc::Sender<ChatMessage>,
    state_tx: mpsc::Sender<Bytes>,
    events: broadcast::Sender<HubEvent>,
}

/// Owns a running hub and its pipeline tasks.
pub struct HubHandle {
    hub: Arc<Hub>,
    chat_pipeline: JoinHandle<()>,
    state_pipeline: JoinHandle<()>,
}

impl Hub {
    /// Builds a hub and spawns its chat and state pipelines.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: HubConfig) -> HubHandle {
        let registry = ConnectionRegistry::shared();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let reaper = Reaper::new(Arc::clone(&registry), events.clone());

        let (chat_tx, chat_rx) = mpsc::channel(config.pipeline_depth.max(1));
        let (state_tx, state_rx) = mpsc::channel(config.pipeline_depth.max(1));

        let chat_pipeline = tokio::spawn(fanout::run_chat_pipeline(chat_rx, reaper.clone()));
        let state_pipeline = tokio::spawn(fanout::run_state_pipeline(state_rx, reaper.clone()));

        let hub = Arc::new(Hub {
            config,
            registry,
            sessions: SessionStore::new(),
            reaper,
            chat_tx,
            state_tx,
            events,
        });

        HubHandle {
            hub,
            chat_pipeline,
            state_pipeline,
        }
    }

    /// Returns the settings this hub was started with
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Returns the session store backing the login endpoint
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the registry of live connections
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Subscribes to connection lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: HubEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Session issuer entry point. Always succeeds.
    pub fn authenticate(&self, username: &str, password: &str) -> String {
        self.sessions.authenticate(username, password)
    }

    /// Registers a new unbound connection and returns its outbox.
    pub async fn connect(&self, addr: SocketAddr) -> (ConnectionId, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::new(
            self.config.outbox_capacity,
            self.config.overflow,
        ));
        let id = self
            .registry
            .write()
            .await
            .register(addr, Arc::clone(&outbox));
        self.emit(HubEvent::Connected { id, addr });
        (id, outbox)
    }

    /// Routes one inbound frame from connection `id`.
    ///
    /// Failed handshakes come back as `UnknownToken`; the connection stays
    /// usable.
    pub async fn dispatch(&self, id: ConnectionId, frame: Frame) -> Result<(), HubError> {
        let binding = self
            .registry
            .read()
            .await
            .binding(&id)
            .ok_or(HubError::Reaped)?;

        // The lock is released here, so a frame racing a rebind is routed
        // with the binding as it was when read.
        match router::route(&binding, frame) {
            Route::Chat(message) => self.submit_chat(message).await,
            Route::State(bytes) => self.submit_state(bytes).await,
            Route::Handshake(token) => self.handshake(id, &token).await,
        }
    }

    async fn handshake(&self, id: ConnectionId, token: &str) -> Result<(), HubError> {
        let handshake = handshake::complete(&self.registry, &self.sessions, id, token).await?;
        info!("Connection {} bound to {}", id, handshake.username);
        self.emit(HubEvent::Bound {
            id,
            username: handshake.username.clone(),
        });

        if let Some(orphan) = handshake.orphaned {
            info!(
                "Session for {} moved from connection {} to {}",
                handshake.username, orphan, id
            );
            self.emit(HubEvent::Unbound {
                id: orphan,
                username: handshake.username,
                successor: id,
            });
            if self.config.orphans == OrphanPolicy::Close {
                self.reaper.reap(orphan, &HubError::Orphaned(id)).await;
            }
        }
        Ok(())
    }

    /// Queues a chat message for every live connection.
    pub async fn submit_chat(&self, message: ChatMessage) -> Result<(), HubError> {
        debug!("Chat from {}: {} bytes", message.sender, message.text.len());
        self.chat_tx
            .send(message)
            .await
            .map_err(|_| HubError::PipelineClosed)
    }

    /// Queues a state snapshot for every live connection.
    ///
    /// Also the entry point for producers outside any connection.
    pub async fn submit_state(&self, bytes: Bytes) -> Result<(), HubError> {
        self.state_tx
            .send(bytes)
            .await
            .map_err(|_| HubError::PipelineClosed)
    }

    /// Closes and removes a connection; false if it was already gone
    pub async fn reap(&self, id: ConnectionId, cause: &HubError) -> bool {
        self.reaper.reap(id, cause).await
    }

    /// Returns the number of live connections
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.len()
    }
}

impl HubHandle {
    /// Returns a shared reference to the running hub
    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    /// Stops the pipelines and closes every connection.
    pub async fn shutdown(self) {
        self.chat_pipeline.abort();
        self.state_pipeline.abort();
        // Wait for the queues to actually be dropped
        let _ = self.chat_pipeline.await;
        let _ = self.state_pipeline.await;

        let drained = self.hub.registry.write().await.drain();
        info!("Hub shutting down, closing {} connections", drained.len());
        for connection in drained {
            connection.outbox.close();
            self.hub.emit(HubEvent::Reaped {
                id: connection.id,
                reason: HubError::Shutdown.to_string(),
            });
        }
    }
}
