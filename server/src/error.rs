use std::time::Duration;

/// Why a frame could not be queued on a connection's outbox.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbox closed")]
    Closed,
    #[error("outbox full ({capacity} frames)")]
    Overflow { capacity: usize },
}

/// Errors raised while serving a connection.
///
/// Transport-class errors end the connection; the others are logged and the
/// connection keeps going.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    // Terminal
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("session moved to connection {0}")]
    Orphaned(u64),
    #[error("hub shutting down")]
    Shutdown,
    #[error("connection already reaped")]
    Reaped,

    // Non-terminal
    #[error("unsupported frame kind: {0}")]
    Protocol(&'static str),
    #[error("unknown session token")]
    UnknownToken,
    #[error("pipeline closed")]
    PipelineClosed,
}

impl HubError {
    /// Returns true if the connection must be reaped after this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Protocol(_) | Self::UnknownToken | Self::PipelineClosed
        )
    }
}

impl From<axum::Error> for HubError {
    fn from(e: axum::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_terminal() {
        assert!(HubError::Transport("reset".into()).is_terminal());
        assert!(HubError::Timeout(Duration::from_secs(1)).is_terminal());
        assert!(HubError::PeerClosed.is_terminal());
        assert!(HubError::Delivery(DeliveryError::Closed).is_terminal());
        assert!(HubError::Orphaned(4).is_terminal());
        assert!(HubError::Reaped.is_terminal());
    }

    #[test]
    fn test_protocol_and_auth_errors_are_not_terminal() {
        assert!(!HubError::Protocol("ping").is_terminal());
        assert!(!HubError::UnknownToken.is_terminal());
        assert!(!HubError::PipelineClosed.is_terminal());
    }

    #[test]
    fn test_error_messages() {
        let err = HubError::from(DeliveryError::Overflow { capacity: 8 });
        assert_eq!(err.to_string(), "delivery failed: outbox full (8 frames)");
        assert_eq!(HubError::Protocol("pong").to_string(), "unsupported frame kind: pong");
    }
}
