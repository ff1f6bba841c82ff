//! Framed TCP connection to the peer device.
//!
//! A background writer task drains an unbounded queue so that
//! [`Transport::send`] never blocks the frame loop. Flush requests travel
//! through the same queue, which is what makes `flush_and_wait` cover
//! every message enqueued before it.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, error, warn};

use crate::codec::PacketCodec;
use crate::error::ArlinkError;
use crate::message::Message;
use crate::network::transport::{MessageTag, Transport};
use crate::packet::Packet;

/// Capacity of the inbound packet channel.
const INBOUND_CAPACITY: usize = 100;

enum Outbound {
    Packet(Packet),
    Flush(oneshot::Sender<()>),
}

// ── ConnectionSender ─────────────────────────────────────────────

/// Cloneable sending half of a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionSender {
    tx: mpsc::UnboundedSender<Outbound>,
    next_tag: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Packet(p) => f.debug_tuple("Packet").field(p).finish(),
            Outbound::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl ConnectionSender {
    /// Total bytes written to the socket so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Whether the writer task is still running.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[async_trait]
impl Transport for ConnectionSender {
    fn send(&self, message: Message) -> MessageTag {
        let tag = MessageTag(self.next_tag.fetch_add(1, Ordering::SeqCst));
        let kind = message.kind();
        match message.into_packet(tag.0) {
            Ok(packet) => {
                if self.tx.send(Outbound::Packet(packet)).is_err() {
                    warn!("connection closed; dropping {kind} message {tag}");
                }
            }
            Err(e) => error!("failed to serialise {kind} message {tag}: {e}"),
        }
        tag
    }

    async fn flush_and_wait(&self, tag: MessageTag) -> Result<(), ArlinkError> {
        if tag.0 >= self.next_tag.load(Ordering::SeqCst) {
            return Err(ArlinkError::UnknownTag(tag.0));
        }
        let (done_tx, done_rx) = oneshot::channel();
        self.tx.send(Outbound::Flush(done_tx))?;
        done_rx.await.map_err(|_| ArlinkError::ChannelClosed)?;
        debug!("flushed up to {tag}");
        Ok(())
    }
}

// ── Connection ───────────────────────────────────────────────────

/// A connection to a single peer.
#[derive(Debug)]
pub struct Connection {
    sender: ConnectionSender,
    rx: mpsc::Receiver<Packet>,
    peer: Option<SocketAddr>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {e}");
        }
        let (mut net_writer, mut net_reader) = Framed::new(stream, PacketCodec).split();

        // User -> Network
        let (user_tx, mut network_rx) = mpsc::unbounded_channel::<Outbound>();

        // Network -> User
        let (network_tx, user_rx) = mpsc::channel(INBOUND_CAPACITY);

        let bytes_sent = Arc::new(AtomicU64::new(0));

        let written = Arc::clone(&bytes_sent);
        tokio::spawn(async move {
            while let Some(item) = network_rx.recv().await {
                match item {
                    Outbound::Packet(packet) => {
                        let len = packet.wire_len() as u64;
                        if let Err(e) = net_writer.send(packet).await {
                            warn!("network write error: {e}");
                            break;
                        }
                        written.fetch_add(len, Ordering::Relaxed);
                    }
                    Outbound::Flush(done) => {
                        if let Err(e) = net_writer.flush().await {
                            warn!("network flush error: {e}");
                            break;
                        }
                        let _ = done.send(());
                    }
                }
            }
            // Every sender is gone; shut down our write half so the peer sees EOF.
            let _ = net_writer.close().await;
        });

        tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(packet) => {
                        if network_tx.send(packet).await.is_err() {
                            // Receiver dropped, stop reading.
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("network read error: {e}");
                        break;
                    }
                }
            }
        });

        Self {
            sender: ConnectionSender {
                tx: user_tx,
                next_tag: Arc::new(AtomicU64::new(0)),
                bytes_sent,
            },
            rx: user_rx,
            peer,
        }
    }

    pub async fn connect(info: &ConnectionInfo) -> Result<Self, ArlinkError> {
        let stream = TcpStream::connect(info.to_string()).await?;
        Ok(Self::new(stream))
    }

    /// Next packet from the peer, or `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<Packet> {
        self.rx.recv().await
    }

    /// Next packet decoded into a [`Message`].
    pub async fn recv_message(&mut self) -> Option<Result<Message, ArlinkError>> {
        let packet = self.rx.recv().await?;
        Some(Message::from_packet(&packet))
    }

    pub fn sender(&self) -> ConnectionSender {
        self.sender.clone()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Split into a sending half and the inbound packet stream.
    pub fn into_split(self) -> (ConnectionSender, mpsc::Receiver<Packet>) {
        (self.sender, self.rx)
    }
}

#[async_trait]
impl Transport for Connection {
    fn send(&self, message: Message) -> MessageTag {
        self.sender.send(message)
    }

    async fn flush_and_wait(&self, tag: MessageTag) -> Result<(), ArlinkError> {
        self.sender.flush_and_wait(tag).await
    }
}

// ── ConnectionInfo ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
