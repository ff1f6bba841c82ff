//! The seam between the capture pipeline and whatever carries its
//! messages to the device.

use std::fmt;

use async_trait::async_trait;

use crate::error::ArlinkError;
use crate::message::Message;

/// Identifies one enqueued message. Tags increase in enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageTag(pub u64);

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reliable, ordered, asynchronous channel to a single remote peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Enqueue `message` and return immediately.
    ///
    /// Never blocks and never reports failure; delivery problems are the
    /// transport's own concern.
    fn send(&self, message: Message) -> MessageTag;

    /// Resolve once every message up to and including `tag` has been
    /// handed to the network.
    async fn flush_and_wait(&self, tag: MessageTag) -> Result<(), ArlinkError>;
}
