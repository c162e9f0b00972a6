use log::info;
use tokio::sync::broadcast;

use crate::error::HubError;
use crate::hub::HubEvent;
use crate::registry::{ConnectionId, SharedRegistry};

/// Closes and deregisters connections after an unrecoverable failure.
///
/// Reaping is terminal for the connection but leaves its session valid, so
/// the same token can be presented again on a new connection.
#[derive(Debug, Clone)]
pub struct Reaper {
    registry: SharedRegistry,
    events: broadcast::Sender<HubEvent>,
}

impl Reaper {
    /// Creates a reaper over `registry`, reporting to `events`
    pub fn new(registry: SharedRegistry, events: broadcast::Sender<HubEvent>) -> Self {
        Self { registry, events }
    }

    /// Returns the registry this reaper removes connections from
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Removes `id` from the registry and closes its outbox.
    ///
    /// Returns false if the connection was already gone.
    pub async fn reap(&self, id: ConnectionId, cause: &HubError) -> bool {
        let removed = self.registry.write().await.unregister(&id);
        let Some(connection) = removed else {
            return false;
        };

        // Writer stops and the read loop tears the socket down
        connection.outbox.close();
        info!("Reaped connection {} ({}): {}", id, connection.addr, cause);

        let _ = self.events.send(HubEvent::Reaped {
            id,
            reason: cause.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::outbox::Outbox;
    use crate::registry::ConnectionRegistry;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reap_closes_and_removes() {
        let registry = ConnectionRegistry::shared();
        let (events, mut rx) = broadcast::channel(8);
        let reaper = Reaper::new(Arc::clone(&registry), events);

        let outbox = Arc::new(Outbox::new(4, OverflowPolicy::DropOldest));
        let id = registry
            .write()
            .await
            .register("127.0.0.1:6000".parse().unwrap(), Arc::clone(&outbox));
        registry.write().await.bind(id, "abc123", "alice");

        assert!(reaper.reap(id, &HubError::PeerClosed).await);
        assert!(outbox.is_closed());
        assert!(registry.read().await.is_empty());
        // Session released so another connection can claim it
        assert_eq!(registry.read().await.holder("abc123"), None);

        match rx.try_recv().unwrap() {
            HubEvent::Reaped { id: reaped, reason } => {
                assert_eq!(reaped, id);
                assert_eq!(reason, "peer closed the connection");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reap_twice_is_noop() {
        let registry = ConnectionRegistry::shared();
        let (events, mut rx) = broadcast::channel(8);
        let reaper = Reaper::new(Arc::clone(&registry), events);

        let outbox = Arc::new(Outbox::new(4, OverflowPolicy::DropOldest));
        let id = registry
            .write()
            .await
            .register("127.0.0.1:6000".parse().unwrap(), outbox);

        assert!(reaper.reap(id, &HubError::PeerClosed).await);
        assert!(!reaper.reap(id, &HubError::PeerClosed).await);
        assert!(!reaper.reap(42, &HubError::PeerClosed).await);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
