pub mod connection;
pub mod loopback;
pub mod transport;

pub use connection::{Connection, ConnectionInfo, ConnectionSender};
pub use loopback::LoopbackTransport;
pub use transport::{MessageTag, Transport};
