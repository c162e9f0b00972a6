//! Classifies inbound frames by connection binding state.
//!
//! Frame kinds other than text and binary never reach the router; they are
//! rejected as protocol errors when the WebSocket message is decoded.

use bytes::Bytes;

use crate::frame::Frame;
use crate::registry::Binding;

/// A chat line waiting in the chat pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Wire form of the message: `"<username>: <text>"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.sender, self.text)
    }
}

/// Where an inbound frame goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Chat(ChatMessage),
    State(Bytes),
    Handshake(String),
}

/// Decides where a frame from a connection with `binding` goes.
pub fn route(binding: &Binding, frame: Frame) -> Route {
    match (binding, frame) {
        (Binding::Bound { username, .. }, Frame::Text(text)) => {
            Route::Chat(ChatMessage::new(username.as_str(), text))
        }
        (Binding::Unbound, Frame::Text(token)) => Route::Handshake(token),
        // Binary frames are state regardless of binding
        (_, Frame::Binary(bytes)) => Route::State(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(username: &str) -> Binding {
        Binding::Bound {
            token: "abc123".to_string(),
            username: username.to_string(),
        }
    }

    #[test]
    fn test_bound_text_is_chat() {
        let route = route(&bound("alice"), Frame::Text("hi".to_string()));
        assert_eq!(route, Route::Chat(ChatMessage::new("alice", "hi")));
    }

    #[test]
    fn test_unbound_text_is_handshake() {
        let route = route(&Binding::Unbound, Frame::Text("abc123".to_string()));
        assert_eq!(route, Route::Handshake("abc123".to_string()));
    }

    #[test]
    fn test_binary_is_state_when_bound_or_unbound() {
        let payload = Bytes::from_static(&[0x01, 0x02]);

        assert_eq!(
            route(&bound("alice"), Frame::Binary(payload.clone())),
            Route::State(payload.clone())
        );
        assert_eq!(
            route(&Binding::Unbound, Frame::Binary(payload.clone())),
            Route::State(payload)
        );
    }

    #[test]
    fn test_chat_render() {
        assert_eq!(ChatMessage::new("alice", "hi").render(), "alice: hi");
        assert_eq!(ChatMessage::new("bob", "").render(), "bob: ");
        assert_eq!(ChatMessage::new("carol", "a: b").render(), "carol: a: b");
    }
}
