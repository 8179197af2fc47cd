//! Transport seam between the handshake and the network.
//!
//! The handshake only ever hands complete packages to [`Transport::send_package`].
//! Inbound packages arrive as [`TransportEvent`]s on a channel owned by
//! whoever drives the handshake, one event per server message, in order.

pub mod tcp;

pub use tcp::TcpTransport;

/// Errors raised by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport is closed")]
    Closed,

    #[error("Framing error: {0}")]
    Framing(String),
}

/// Something the transport observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete inbound package.
    PackageReady(Vec<u8>),
    /// The peer went away or the stream broke.
    Closed,
}

/// Outbound half of a transport.
pub trait Transport {
    /// Queue one fully built package for sending.
    fn send_package(&mut self, package: Vec<u8>) -> Result<(), TransportError>;
}

/// Transport that just records what it was asked to send.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Vec<u8>>,
    /// When set, every send fails with [`TransportError::Closed`].
    pub closed: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl Transport for RecordingTransport {
    fn send_package(&mut self, package: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(package);
        Ok(())
    }
}
