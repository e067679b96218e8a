// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named broadcast channels between emitters and presentation surfaces.
//!
//! Publishing never blocks and never waits for a subscriber. A send with no
//! subscribers is dropped, and a subscriber that falls behind loses the oldest
//! messages, so the newest scene always wins.

use crate::protocol::ProtocolMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Well-known channel presentation surfaces subscribe to
pub const PRESENTATION_CHANNEL: &str = "tttree_presentation_channel";

/// Messages buffered per subscriber before the oldest are dropped
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Receiving end of a presentation channel
pub type Subscription = broadcast::Receiver<ProtocolMessage>;

/// Registry of presentation channels, cheap to clone and share
#[derive(Clone)]
pub struct PresentationHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ProtocolMessage>>>>,
    capacity: usize,
}

impl PresentationHub {
    /// Hub with the default per-subscriber capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Hub buffering up to `capacity` messages per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to `channel`, creating it on first use
    pub fn subscribe(&self, channel: &str) -> Subscription {
        if let Some(sender) = self.channels.read().get(channel) {
            return sender.subscribe();
        }
        self.channels
            .write()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish to every current subscriber of `channel`.
    ///
    /// Returns how many subscribers the message reached.
    pub fn publish(&self, channel: &str, message: ProtocolMessage) -> usize {
        let channels = self.channels.read();
        let Some(sender) = channels.get(channel) else {
            return 0;
        };
        // send() only fails when nobody is listening
        sender.send(message).unwrap_or(0)
    }

    /// Current subscriber count of `channel`
    pub fn receiver_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for PresentationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresentationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationHub")
            .field("channels", &self.channels.read().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
