//! # Card Hub Server Library
//!
//! This library provides the real-time message hub behind the card demo. It
//! accepts WebSocket connections, lets each one claim a login session through
//! an in-band handshake, and fans chat text and binary game state out to
//! every connected socket.
//!
//! ## Core Responsibilities
//!
//! ### Session Handshake
//! Clients log in over HTTP and receive an opaque token. The first text frames
//! on a new WebSocket are treated as token presentations; a matching token
//! binds the connection to that username. Unknown tokens are ignored without
//! any reply, and the client may simply try again.
//!
//! ### Broadcast
//! Once bound, text frames become chat lines (`"<username>: <text>"`). Binary
//! frames are game state and are forwarded byte for byte, whether or not the
//! sender is bound. Both kinds go to every live connection.
//!
//! ### Failure Isolation
//! A socket that fails to read or write is reaped: closed and removed from
//! the registry. Nobody else notices. The session token stays valid, so the
//! client can reconnect and present it again.
//!
//! ## Architecture Design
//!
//! ### One Hub Instance
//! All shared state (registry, sessions, pipelines) lives in a [`hub::Hub`]
//! created by [`hub::Hub::start`] and torn down with
//! [`hub::HubHandle::shutdown`]. Several hubs can run side by side.
//!
//! ### Two Pipelines
//! Chat and state each have a queue drained by a single task, so every
//! connection sees each pipeline's items in the order they were queued. There
//! is no ordering between the two pipelines.
//!
//! ### Per-Connection Outboxes
//! Pipelines never write to sockets directly. They push onto each
//! connection's bounded [`outbox::Outbox`], and a writer task per connection
//! drains it. A slow client fills its own outbox (dropping its oldest frames
//! or getting disconnected, depending on configuration) instead of stalling
//! everyone else.
//!
//! ## Module Organization
//!
//! - `config`: hub settings and overflow/orphan policies
//! - `error`: error taxonomy shared by all connection code
//! - `frame`: text/binary frames and WebSocket message decoding
//! - `session`: token issuing and lookup
//! - `registry`: live connections and session ownership
//! - `handshake`: binding a connection to a session
//! - `router`: deciding where an inbound frame goes
//! - `outbox`: per-connection outbound buffer
//! - `fanout`: the chat and state broadcast pipelines
//! - `reaper`: closing and removing failed connections
//! - `hub`: the instance tying it all together
//! - `network`: HTTP login, WebSocket upgrade, read and write loops
//! - `demo`: optional generator of demo game state
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::HubConfig;
//! use server::hub::Hub;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = Hub::start(HubConfig::default());
//!
//!     // POST /login issues tokens, GET /chat upgrades to a WebSocket
//!     let server = Server::new("127.0.0.1:4444", handle.hub()).await?;
//!     server.run().await?;
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod fanout;
pub mod frame;
pub mod handshake;
pub mod hub;
pub mod network;
pub mod outbox;
pub mod reaper;
pub mod registry;
pub mod router;
pub mod session;
