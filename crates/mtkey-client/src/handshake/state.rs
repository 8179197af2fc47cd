//! Handshake states and observable events.

use std::fmt;

/// Where a handshake instance is. Transitions only go forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Constructed, nothing sent yet.
    #[default]
    Idle,
    /// `req_pq` sent, waiting for `resPQ`.
    AwaitingPqResponse,
    /// `resPQ` accepted, composite factored, server key selected.
    PqValidated,
    /// `req_DH_params` sent.
    AwaitingDhResponse,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingPqResponse => "awaiting_pq_response",
            Self::PqValidated => "pq_validated",
            Self::AwaitingDhResponse => "awaiting_dh_response",
        };
        f.write_str(name)
    }
}

/// Notifications a subscriber can observe while the handshake runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// The server's composite passed validation and was factored. Fired
    /// before the advertised fingerprint is matched against the key ring.
    PqReceived { pq: u64, p: u32, q: u32 },
    /// A package arrived after `req_DH_params` and was retained.
    DhResponseReceived { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(HandshakeState::default(), HandshakeState::Idle);
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(
            HandshakeState::AwaitingPqResponse.to_string(),
            "awaiting_pq_response"
        );
        assert_eq!(HandshakeState::PqValidated.to_string(), "pq_validated");
    }
}
