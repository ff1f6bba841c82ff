//! In-process transport.
//!
//! Delivers messages to a local channel instead of a socket. Used for
//! dry runs of the sender and by tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ArlinkError;
use crate::message::Message;
use crate::network::transport::{MessageTag, Transport};

#[derive(Debug)]
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<(MessageTag, Message)>,
    next_tag: AtomicU64,
}

impl LoopbackTransport {
    /// Create the transport and the receiving end of its queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(MessageTag, Message)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_tag: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Number of messages enqueued so far.
    pub fn sent_count(&self) -> u64 {
        self.next_tag.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn send(&self, message: Message) -> MessageTag {
        let tag = MessageTag(self.next_tag.fetch_add(1, Ordering::SeqCst));
        // A dropped receiver just discards.
        let _ = self.tx.send((tag, message));
        tag
    }

    async fn flush_and_wait(&self, tag: MessageTag) -> Result<(), ArlinkError> {
        // Delivery is immediate; only the tag needs checking.
        if tag.0 >= self.next_tag.load(Ordering::SeqCst) {
            return Err(ArlinkError::UnknownTag(tag.0));
        }
        Ok(())
    }
}
