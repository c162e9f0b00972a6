use axum::extract::ws::Message;
use bytes::Bytes;

use crate::error::HubError;

/// One unit of traffic on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Returns "text" or "binary", for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }

    /// Returns the payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the frame into a WebSocket message for sending
    pub fn into_message(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

/// What the read loop makes of one WebSocket message.
#[derive(Debug)]
pub enum Inbound {
    Frame(Frame),
    Close,
}

impl TryFrom<Message> for Inbound {
    type Error = HubError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        match message {
            Message::Text(text) => Ok(Inbound::Frame(Frame::Text(text.as_str().to_owned()))),
            Message::Binary(bytes) => Ok(Inbound::Frame(Frame::Binary(bytes))),
            Message::Close(_) => Ok(Inbound::Close),
            Message::Ping(_) => Err(HubError::Protocol("ping")),
            Message::Pong(_) => Err(HubError::Protocol("pong")),
        }
    }
}
