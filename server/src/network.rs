//! Server network layer: the HTTP login endpoint and WebSocket connections
//!
//! Every upgraded socket is split in two:
//! - the read loop (on the upgrade task) decodes frames and hands them to
//!   the hub, until the peer goes away, a deadline passes or the connection
//!   is reaped from elsewhere
//! - a writer task drains the connection's outbox onto the socket with a
//!   per-frame write deadline
//!
//! Either side failing reaps the connection, which closes the outbox and
//! thereby stops the other side.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use shared::{LoginRequest, LoginResponse, CHAT_PATH, LOGIN_PATH};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep_until, timeout, Instant};

use crate::error::HubError;
use crate::frame::{Frame, Inbound};
use crate::hub::Hub;
use crate::outbox::Outbox;
use crate::registry::ConnectionId;

/// How long the writer keeps trying to send a close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// HTTP front door for a hub
pub struct Server {
    listener: TcpListener,
    hub: Arc<Hub>,
}

impl Server {
    pub async fn new(addr: &str, hub: Arc<Hub>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, hub })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves login and WebSocket requests until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        let router = build_router(self.hub);
        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

pub fn build_router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route(LOGIN_PATH, post(login_handler))
        .route(CHAT_PATH, get(chat_handler))
        .with_state(hub)
}

/// Issues a session for any JSON body, whatever its content type.
async fn login_handler(
    State(hub): State<Arc<Hub>>,
    body: Bytes,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let credentials: LoginRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Error parsing login body as JSON: {}", e);
        (StatusCode::BAD_REQUEST, format!("invalid login body: {}", e))
    })?;
    let session_id = hub.authenticate(&credentials.username, &credentials.password);
    debug!("Sending session ID to {}", credentials.username);
    Ok(Json(LoginResponse { session_id }))
}

async fn chat_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(hub): State<Arc<Hub>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, hub))
}

/// Runs one WebSocket connection to completion.
pub async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: Arc<Hub>) {
    let (sink, stream) = socket.split();
    serve_connection(sink, stream, addr, hub).await;
}

async fn serve_connection<Si, St, E>(sink: Si, stream: St, addr: SocketAddr, hub: Arc<Hub>)
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Display,
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let (id, outbox) = hub.connect(addr).await;
    info!("Chat connection {} from {}", id, addr);

    let writer = tokio::spawn(write_loop(
        sink,
        Arc::clone(&outbox),
        Arc::clone(&hub),
        id,
    ));

    let cause = read_loop(stream, &outbox, &hub, id).await;
    info!("Chat connection {} disconnected: {}", id, cause);

    hub.reap(id, &cause).await;
    outbox.close();
    let _ = writer.await;
}

/// Resolves at `deadline`, or never.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn read_message<St, E>(stream: &mut St, limit: Option<Duration>) -> Result<Message, HubError>
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let next = match limit {
        Some(limit) => timeout(limit, stream.next())
            .await
            .map_err(|_| HubError::Timeout(limit))?,
        None => stream.next().await,
    };

    match next {
        Some(Ok(message)) => Ok(message),
        Some(Err(e)) => Err(HubError::Transport(e.to_string())),
        None => Err(HubError::PeerClosed),
    }
}

/// Reads until the connection has to end and returns why.
async fn read_loop<St, E>(mut stream: St, outbox: &Outbox, hub: &Hub, id: ConnectionId) -> HubError
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let config = hub.config();
    let mut handshake_deadline = config
        .handshake_timeout
        .map(|window| (Instant::now() + window, window));

    loop {
        let next = tokio::select! {
            _ = outbox.closed() => return HubError::Reaped,
            _ = wait_until(handshake_deadline.map(|(at, _)| at)) => {
                let window = handshake_deadline.map(|(_, w)| w).unwrap_or_default();
                return HubError::HandshakeTimeout(window);
            }
            next = read_message(&mut stream, config.read_timeout) => next,
        };

        let message = match next {
            Ok(message) => message,
            Err(e) => return e,
        };

        let frame = match Inbound::try_from(message) {
            Ok(Inbound::Frame(frame)) => frame,
            Ok(Inbound::Close) => return HubError::PeerClosed,
            Err(e) => {
                debug!("Connection {}: dropped frame: {}", id, e);
                continue;
            }
        };

        match hub.dispatch(id, frame).await {
            Ok(()) => {}
            Err(HubError::UnknownToken) => {
                debug!("Connection {}: handshake with unknown token", id);
            }
            Err(e) if e.is_terminal() => return e,
            Err(e) => warn!("Connection {}: {}", id, e),
        }

        if handshake_deadline.is_some() {
            let bound = hub
                .registry()
                .read()
                .await
                .binding(&id)
                .is_some_and(|binding| binding.is_bound());
            if bound {
                handshake_deadline = None;
            }
        }
    }
}

async fn write_frame<Si>(sink: &mut Si, frame: Frame, limit: Option<Duration>) -> Result<(), HubError>
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let send = sink.send(frame.into_message());
    let result = match limit {
        Some(limit) => timeout(limit, send)
            .await
            .map_err(|_| HubError::Timeout(limit))?,
        None => send.await,
    };
    result.map_err(|e| HubError::Transport(e.to_string()))
}

/// Drains the outbox onto the socket until it is closed or a write fails.
async fn write_loop<Si>(mut sink: Si, outbox: Arc<Outbox>, hub: Arc<Hub>, id: ConnectionId)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let limit = hub.config().write_timeout;

    while let Some(frame) = outbox.pop().await {
        if let Err(e) = write_frame(&mut sink, frame, limit).await {
            warn!("Write to connection {} failed: {}", id, e);
            hub.reap(id, &e).await;
            break;
        }
    }

    // Best effort; the peer may already be gone
    let _ = timeout(CLOSE_GRACE, async {
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    })
    .await;
}
