//! Session issuer: hands out opaque tokens at login and resolves them during
//! the WebSocket handshake.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use log::info;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

/// Issued sessions, indexed by token.
///
/// Sessions never expire and there is no logout; a token stays valid for the
/// lifetime of the store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `username`. Credentials are not checked.
    pub fn authenticate(&self, username: &str, _password: &str) -> String {
        let token = generate_token();
        self.insert(&token, username);
        info!("Issued session for {}", username);
        token
    }

    /// Registers a session under a caller-chosen token.
    pub fn insert(&self, token: &str, username: &str) {
        let session = Session {
            token: token.to_string(),
            username: username.to_string(),
        };
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session.token.clone(), session);
    }

    /// Returns the username the token was issued for (exact match).
    pub fn lookup(&self, token: &str) -> Option<String> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .map(|session| session.username.clone())
    }

    /// Returns the number of issued sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}
