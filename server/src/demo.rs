//! Demo state producer.
//!
//! Periodically injects a bincode-encoded [`GameState`] into the state
//! pipeline, standing in for a real game engine.

use bytes::Bytes;
use log::{debug, error, info};
use shared::{generate_deck, GameState, Player};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::hub::Hub;

const DEMO_DECK_SIZE: usize = 10;

/// Builds the `counter`-th demo snapshot.
pub fn demo_snapshot(counter: u64) -> GameState {
    GameState::new(
        format!("demo {}", counter),
        vec![Player {
            deck: generate_deck(DEMO_DECK_SIZE),
        }],
    )
}

/// Spawns a task submitting a demo snapshot every `period`.
pub fn spawn_demo_state(hub: Arc<Hub>, period: Duration) -> JoinHandle<()> {
    info!("Demo state generator running every {:?}", period);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        ticker.tick().await;

        let mut counter: u64 = 0;
        loop {
            ticker.tick().await;
            counter += 1;

            let bytes = match demo_snapshot(counter).encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Could not encode demo state: {}", e);
                    continue;
                }
            };

            debug!("Submitting demo state #{} ({} bytes)", counter, bytes.len());
            if let Err(e) = hub.submit_state(Bytes::from(bytes)).await {
                error!("Demo state generator stopping: {}", e);
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::frame::Frame;
    use tokio::time::timeout;

    #[test]
    fn test_demo_snapshot_label() {
        let state = demo_snapshot(3);
        assert_eq!(state.session_id, "demo 3");
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.players[0].deck.cards.len(), DEMO_DECK_SIZE);
    }

    #[tokio::test]
    async fn test_generator_reaches_connections() {
        let handle = Hub::start(HubConfig::default());
        let hub = handle.hub();
        let (_, outbox) = hub.connect("127.0.0.1:4444".parse().unwrap()).await;

        let generator = spawn_demo_state(Arc::clone(&hub), Duration::from_millis(20));

        let frame = timeout(Duration::from_secs(1), outbox.pop())
            .await
            .expect("demo state should arrive")
            .unwrap();
        match frame {
            Frame::Binary(bytes) => {
                let state = GameState::decode(&bytes).unwrap();
                assert_eq!(state.session_id, "demo 1");
            }
            other => panic!("Unexpected frame: {:?}", other),
        }

        generator.abort();
        handle.shutdown().await;
    }
}
