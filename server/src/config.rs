use std::str::FromStr;
use std::time::Duration;

/// What a connection's outbox does when a frame arrives and it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the oldest queued frame to make room.
    DropOldest,
    /// Treat the connection as dead and reap it.
    Disconnect,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop-oldest" => Ok(Self::DropOldest),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(format!(
                "unknown overflow policy '{}' (expected drop-oldest or disconnect)",
                other
            )),
        }
    }
}

/// What happens to a connection whose session was claimed by a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Reap the previous holder.
    Close,
    /// Leave it registered and unbound; it keeps receiving broadcasts.
    Keep,
}

/// Runtime settings for a [`crate::hub::Hub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Frames buffered per connection before the overflow policy kicks in
    pub outbox_capacity: usize,
    pub overflow: OverflowPolicy,
    pub orphans: OrphanPolicy,
    /// Depth of the chat and state pipeline queues
    pub pipeline_depth: usize,
    /// Reap a connection that sends nothing for this long
    pub read_timeout: Option<Duration>,
    /// Reap a connection whose socket write takes longer than this
    pub write_timeout: Option<Duration>,
    /// Reap a connection still unbound after this long
    pub handshake_timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 256,
            overflow: OverflowPolicy::DropOldest,
            orphans: OrphanPolicy::Close,
            pipeline_depth: 1000,
            read_timeout: None,
            write_timeout: Some(Duration::from_secs(10)),
            handshake_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.outbox_capacity, 256);
        assert_eq!(config.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.orphans, OrphanPolicy::Close);
        assert_eq!(config.write_timeout, Some(Duration::from_secs(10)));
        assert!(config.read_timeout.is_none());
        assert!(config.handshake_timeout.is_none());
    }

    #[test]
    fn test_overflow_policy_parsing() {
        assert_eq!(
            "drop-oldest".parse::<OverflowPolicy>(),
            Ok(OverflowPolicy::DropOldest)
        );
        assert_eq!(
            "disconnect".parse::<OverflowPolicy>(),
            Ok(OverflowPolicy::Disconnect)
        );
        assert!("drop-newest".parse::<OverflowPolicy>().is_err());
    }
}
