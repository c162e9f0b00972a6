//! Per-connection outbound buffer
//!
//! Fanout pipelines push into a connection's outbox and move on; the
//! connection's own writer task drains it onto the socket. A slow peer can
//! only fill its own outbox, never stall the pipeline that feeds everyone
//! else. When the outbox is full the configured [`OverflowPolicy`] decides
//! between evicting the oldest frame and giving up on the connection.
//!
//! Closing an outbox is how the rest of the hub closes a connection: the
//! writer stops, and the reader (waiting on [`Outbox::closed`]) tears the
//! socket down.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Notify};

use crate::config::OverflowPolicy;
use crate::error::DeliveryError;
use crate::frame::Frame;

#[derive(Debug, Default)]
struct OutboxState {
    frames: VecDeque<Frame>,
    closed: bool,
}

#[derive(Debug)]
pub struct Outbox {
    state: Mutex<OutboxState>,
    ready: Notify,
    closed_tx: watch::Sender<bool>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl Outbox {
    /// Creates an open outbox holding at most `capacity` frames (minimum one)
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(OutboxState::default()),
            ready: Notify::new(),
            closed_tx,
            capacity: capacity.max(1),
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a frame for the writer.
    ///
    /// Returns the evicted frame when the outbox was full and the policy is
    /// [`OverflowPolicy::DropOldest`].
    pub fn push(&self, frame: Frame) -> Result<Option<Frame>, DeliveryError> {
        let mut state = self.lock();
        if state.closed {
            return Err(DeliveryError::Closed);
        }

        let mut evicted = None;
        if state.frames.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => evicted = state.frames.pop_front(),
                OverflowPolicy::Disconnect => {
                    return Err(DeliveryError::Overflow {
                        capacity: self.capacity,
                    })
                }
            }
        }
        state.frames.push_back(frame);
        drop(state);

        self.ready.notify_one();
        Ok(evicted)
    }

    /// Waits for the next frame. Returns `None` once the outbox is closed.
    pub async fn pop(&self) -> Option<Frame> {
        loop {
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
            }
            // Single consumer: notify_one keeps a permit if we are not parked yet.
            self.ready.notified().await;
        }
    }

    /// Closes the outbox and discards anything still queued.
    ///
    /// Returns false if it was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        state.frames.clear();
        drop(state);

        self.closed_tx.send_replace(true);
        self.ready.notify_one();
        true
    }

    /// Checks whether the outbox has been closed
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Resolves once [`Outbox::close`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Returns the number of frames waiting for the writer
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
