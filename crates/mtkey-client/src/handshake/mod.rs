//! The auth-key handshake state machine.

mod orchestrator;
mod state;

pub use orchestrator::Handshake;
pub use state::{HandshakeEvent, HandshakeState};
