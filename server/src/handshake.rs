use log::debug;

use crate::error::HubError;
use crate::registry::{BindResult, ConnectionId, SharedRegistry};
use crate::session::SessionStore;

/// A completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub username: String,
    /// Connection that held the session until now
    pub orphaned: Option<ConnectionId>,
}

/// Treats `token` as a session token for connection `id`.
///
/// Returns `UnknownToken` on a miss (the connection stays unbound) and
/// `Reaped` if the connection left the registry in the meantime.
pub async fn complete(
    registry: &SharedRegistry,
    sessions: &SessionStore,
    id: ConnectionId,
    token: &str,
) -> Result<Handshake, HubError> {
    let username = sessions.lookup(token).ok_or(HubError::UnknownToken)?;

    let result = registry.write().await.bind(id, token, &username);
    match result {
        BindResult::Bound { orphaned } => {
            debug!("Connection {} bound to {}", id, username);
            Ok(Handshake { username, orphaned })
        }
        BindResult::Missing => Err(HubError::Reaped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::outbox::Outbox;
    use crate::registry::{Binding, ConnectionRegistry};
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn setup() -> (SharedRegistry, SessionStore) {
        let sessions = SessionStore::new();
        sessions.insert("abc123", "alice");
        (ConnectionRegistry::shared(), sessions)
    }

    async fn connect(registry: &SharedRegistry) -> ConnectionId {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let outbox = Arc::new(Outbox::new(4, OverflowPolicy::DropOldest));
        registry.write().await.register(addr, outbox)
    }

    #[tokio::test]
    async fn test_valid_token_binds() {
        let (registry, sessions) = setup();
        let id = connect(&registry).await;

        let handshake = complete(&registry, &sessions, id, "abc123").await.unwrap();
        assert_eq!(handshake.username, "alice");
        assert_eq!(handshake.orphaned, None);
        assert_eq!(
            registry.read().await.binding(&id).unwrap().username(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_unknown_token_leaves_connection_unbound() {
        let (registry, sessions) = setup();
        let id = connect(&registry).await;

        for attempt in ["nope", "abc12", "ABC123", ""] {
            let result = complete(&registry, &sessions, id, attempt).await;
            assert!(matches!(result, Err(HubError::UnknownToken)));
        }
        assert_eq!(registry.read().await.binding(&id), Some(Binding::Unbound));

        // Still able to bind after failed attempts
        assert!(complete(&registry, &sessions, id, "abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_second_connection_takes_session() {
        let (registry, sessions) = setup();
        let first = connect(&registry).await;
        let second = connect(&registry).await;

        complete(&registry, &sessions, first, "abc123").await.unwrap();
        let handshake = complete(&registry, &sessions, second, "abc123").await.unwrap();

        assert_eq!(handshake.orphaned, Some(first));
        assert_eq!(registry.read().await.holder("abc123"), Some(second));
    }

    #[tokio::test]
    async fn test_reaped_connection_cannot_bind() {
        let (registry, sessions) = setup();
        let id = connect(&registry).await;
        registry.write().await.unregister(&id);

        let result = complete(&registry, &sessions, id, "abc123").await;
        assert!(matches!(result, Err(HubError::Reaped)));
        assert_eq!(registry.read().await.holder("abc123"), None);
    }
}
