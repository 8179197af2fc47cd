//! mtkey client library.
//!
//! Drives the unauthenticated auth-key handshake against a server:
//!
//! - [`handshake`]: the state machine (`Idle → AwaitingPqResponse →
//!   PqValidated → AwaitingDhResponse`)
//! - [`transport`]: the transport seam plus a TCP implementation
//! - [`driver`]: glue that runs a handshake over a transport with timeouts
//! - [`keys`]: building the trusted key ring from configuration

pub mod driver;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod transport;

pub use driver::{HandshakeOutcome, drive, run_handshake};
pub use error::{DriverError, HandshakeError};
pub use handshake::{Handshake, HandshakeEvent, HandshakeState};
pub use transport::{TcpTransport, Transport, TransportError, TransportEvent};
