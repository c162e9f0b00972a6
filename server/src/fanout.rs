//! Broadcast fanout pipelines
//!
//! The hub runs two pipelines, one for chat and one for binary state. Each is
//! a single task that pops the next item off its queue and delivers it to
//! every connection in a fresh registry snapshot. Because there is exactly
//! one consumer per pipeline, every connection sees that pipeline's items in
//! enqueue order. The two pipelines are not ordered relative to each other.
//!
//! "Delivering" means pushing onto the connection's outbox, which never
//! blocks. A connection that cannot take the frame is reaped and the round
//! carries on with the remaining connections.

use bytes::Bytes;
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::error::HubError;
use crate::frame::Frame;
use crate::reaper::Reaper;
use crate::registry::ConnectionId;
use crate::router::ChatMessage;

/// Outcome of delivering one frame to a registry snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// Connections the frame was queued on
    pub delivered: Vec<ConnectionId>,
    /// Connections that had to evict an older frame to take this one
    pub evicted: Vec<ConnectionId>,
    /// Connections reaped because delivery failed
    pub reaped: Vec<ConnectionId>,
}

/// Delivers `frame` once to every live connection.
pub async fn broadcast(reaper: &Reaper, frame: Frame) -> RoundReport {
    let targets = reaper.registry().read().await.snapshot();
    let mut report = RoundReport::default();

    for target in targets {
        match target.outbox.push(frame.clone()) {
            Ok(evicted) => {
                if let Some(old) = evicted {
                    warn!(
                        "Connection {} outbox full, dropped oldest {} frame",
                        target.id,
                        old.kind()
                    );
                    report.evicted.push(target.id);
                }
                report.delivered.push(target.id);
            }
            Err(e) => {
                warn!("Delivery to connection {} failed: {}", target.id, e);
                reaper.reap(target.id, &HubError::Delivery(e)).await;
                report.reaped.push(target.id);
            }
        }
    }

    report
}

async fn run_pipeline<T, F>(
    name: &'static str,
    mut rx: mpsc::Receiver<T>,
    reaper: Reaper,
    to_frame: F,
) where
    F: Fn(T) -> Frame,
{
    while let Some(item) = rx.recv().await {
        let frame = to_frame(item);
        let size = frame.len();
        let report = broadcast(&reaper, frame).await;
        debug!(
            "{} pipeline: {} bytes to {} connections ({} reaped)",
            name,
            size,
            report.delivered.len(),
            report.reaped.len()
        );
    }
    debug!("{} pipeline stopped", name);
}

/// Drains the chat queue, rendering each message as `"<user>: <text>"`.
pub async fn run_chat_pipeline(rx: mpsc::Receiver<ChatMessage>, reaper: Reaper) {
    run_pipeline("chat", rx, reaper, |message| Frame::Text(message.render())).await;
}

/// Drains the state queue, forwarding bytes verbatim.
pub async fn run_state_pipeline(rx: mpsc::Receiver<Bytes>, reaper: Reaper) {
    run_pipeline("state", rx, reaper, Frame::Binary).await;
}
