//! Runs a handshake over a transport.
//!
//! The orchestrator is purely event-driven; this module supplies the loop
//! around it: start, wait for `resPQ` with a timeout, feed it in, then send
//! `req_DH_params`.

use std::time::Duration;

use mtkey_core::ServerConfig;
use mtkey_crypto::{KeyRing, TmpAesKeys};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{DriverError, HandshakeError};
use crate::handshake::{Handshake, HandshakeState};
use crate::transport::{TcpTransport, Transport, TransportEvent};

/// What a handshake established before the DH parameters response.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub state: HandshakeState,
    pub pq: u64,
    pub p: u32,
    pub q: u32,
    pub fingerprint: u64,
    /// Server clock taken from the `resPQ` envelope, in Unix ms.
    pub server_time_ms: Option<u64>,
    pub tmp_keys: TmpAesKeys,
}

impl HandshakeOutcome {
    fn from_handshake(handshake: &Handshake) -> Result<Self, HandshakeError> {
        match (
            handshake.pq(),
            handshake.factors(),
            handshake.fingerprint(),
            handshake.tmp_aes_keys(),
        ) {
            (Some(pq), Some((p, q)), Some(fingerprint), Some(tmp_keys)) => Ok(Self {
                state: handshake.state(),
                pq,
                p,
                q,
                fingerprint,
                server_time_ms: handshake.server_time_ms(),
                tmp_keys: tmp_keys.clone(),
            }),
            _ => Err(HandshakeError::InvalidState {
                expected: HandshakeState::AwaitingDhResponse,
                actual: handshake.state(),
            }),
        }
    }
}

async fn next_package(
    events: &mut mpsc::Receiver<TransportEvent>,
    response_timeout: Duration,
) -> Result<Vec<u8>, DriverError> {
    match tokio::time::timeout(response_timeout, events.recv()).await {
        Ok(Some(TransportEvent::PackageReady(package))) => Ok(package),
        Ok(Some(TransportEvent::Closed) | None) => Err(DriverError::ConnectionClosed),
        Err(_) => Err(DriverError::Timeout {
            secs: response_timeout.as_secs(),
        }),
    }
}

/// Drive `handshake` from `Idle` to `AwaitingDhResponse`.
pub async fn drive<T: Transport>(
    handshake: &mut Handshake,
    transport: &mut T,
    events: &mut mpsc::Receiver<TransportEvent>,
    response_timeout: Duration,
) -> Result<HandshakeOutcome, DriverError> {
    handshake.start(transport)?;
    let package = next_package(events, response_timeout).await?;
    handshake.on_package(&package)?;
    handshake.request_dh_params(transport)?;
    Ok(HandshakeOutcome::from_handshake(handshake)?)
}

/// Connect to the configured server and run one handshake attempt.
pub async fn run_handshake(
    server: &ServerConfig,
    keys: KeyRing,
) -> Result<HandshakeOutcome, DriverError> {
    info!(addr = %server.address, keys = keys.len(), "Starting handshake");
    let (mut transport, mut events) = TcpTransport::connect(&server.address).await?;
    let mut handshake = Handshake::new(keys);

    let result = drive(
        &mut handshake,
        &mut transport,
        &mut events,
        Duration::from_secs(server.response_timeout_secs),
    )
    .await;

    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "Transport shutdown failed");
    }
    result
}
