//! Types shared between the hub server and its clients.
//!
//! - Login request/response bodies exchanged over `POST /login`
//! - The demo card-game snapshot that the hub can inject into the state
//!   pipeline, plus its bincode encoding
//!
//! The hub itself never looks inside state frames; [`GameState`] only exists
//! so the demo generator and the test client agree on a format.

use serde::{Deserialize, Serialize};

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/login";
/// Path of the WebSocket endpoint.
pub const CHAT_PATH: &str = "/chat";

/// Body of `POST /login`. Missing fields read as empty strings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body returned by `POST /login`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(rename = "session-id")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Card {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Deck {
    pub cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub deck: Deck,
}

/// Snapshot of a card game, as produced by the demo state generator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    pub session_id: String,
    pub players: Vec<Player>,
}

impl GameState {
    pub fn new(session_id: impl Into<String>, players: Vec<Player>) -> Self {
        Self {
            session_id: session_id.into(),
            players,
        }
    }

    /// Encodes the snapshot into the bytes sent as a binary frame.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decodes a binary frame produced by [`GameState::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

const CARD_NAMES: [(&str, &str); 6] = [
    ("Foo", "Bringer of Foos"),
    ("Bar", "Keeper of the Bar"),
    ("Baz", "Wanders between turns"),
    ("Qux", "Draws two, discards one"),
    ("Quux", "Blocks the next attack"),
    ("Corge", "Shuffles the graveyard back"),
];

/// Builds a deck of `size` cards cycling through a fixed card list.
pub fn generate_deck(size: usize) -> Deck {
    let cards = CARD_NAMES
        .iter()
        .cycle()
        .take(size)
        .enumerate()
        .map(|(i, (name, description))| Card {
            name: format!("{} #{}", name, i + 1),
            description: description.to_string(),
        })
        .collect();

    Deck { cards }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_uses_dashed_key() {
        let response = LoginResponse {
            session_id: "abc123".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"session-id":"abc123"}"#);
    }

    #[test]
    fn test_login_request_parses() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username":"alice","password":"hunter2"}"#).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.password, "hunter2");
    }

    #[test]
    fn test_login_request_missing_fields_are_empty() {
        let request: LoginRequest = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.password, "");

        let request: LoginRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, LoginRequest::default());
    }

    #[test]
    fn test_generate_deck_cycles_names() {
        let deck = generate_deck(8);
        assert_eq!(deck.cards.len(), 8);
        assert_eq!(deck.cards[0].name, "Foo #1");
        assert_eq!(deck.cards[6].name, "Foo #7");
        assert_eq!(deck.cards[1].description, "Keeper of the Bar");
    }

    #[test]
    fn test_generate_empty_deck() {
        assert!(generate_deck(0).cards.is_empty());
    }

    #[test]
    fn test_game_state_encoding() {
        let state = GameState::new(
            "demo 3",
            vec![Player {
                deck: generate_deck(2),
            }],
        );

        let bytes = state.encode().unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(GameState::decode(&bytes).unwrap(), state);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(GameState::decode(&[0xff]).is_err());
    }
}
