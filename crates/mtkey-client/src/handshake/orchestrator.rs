//! Handshake orchestrator.
//!
//! One [`Handshake`] owns the nonces and state of a single attempt. It
//! never touches the network itself: outbound packages go through a
//! [`Transport`] and inbound packages are fed in with
//! [`Handshake::on_package`] by whoever owns the event channel.

use std::time::{SystemTime, UNIX_EPOCH};

use mtkey_crypto::{KeyRing, PaddedBlock, TmpAesKeys, derive_tmp_aes_keys, factorize};
use mtkey_proto::{
    Int128, Message, PlainEnvelope, PqInnerData, Reader, ReqDhParams, ReqPq, ResPq,
    decode_timestamp, encode_timestamp,
};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::state::{HandshakeEvent, HandshakeState};
use crate::error::HandshakeError;
use crate::transport::Transport;

/// State and secrets of one handshake attempt.
pub struct Handshake {
    state: HandshakeState,
    aborted: bool,
    keys: KeyRing,
    client_nonce: Int128,
    server_nonce: Option<Int128>,
    pq: Option<u64>,
    factors: Option<(u32, u32)>,
    fingerprint: Option<u64>,
    server_time_ms: Option<u64>,
    dh_response: Option<Vec<u8>>,
    tmp_keys: Option<TmpAesKeys>,
    events: Option<mpsc::UnboundedSender<HandshakeEvent>>,
    #[cfg(any(test, feature = "test-utils"))]
    last_plaintext: Option<PaddedBlock>,
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("state", &self.state)
            .field("aborted", &self.aborted)
            .field("keys", &self.keys.len())
            .field("factors", &self.factors)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl Handshake {
    /// New handshake with a fresh random client nonce.
    pub fn new(keys: KeyRing) -> Self {
        let mut client_nonce = [0u8; 16];
        OsRng.fill_bytes(&mut client_nonce);
        Self::from_parts(keys, client_nonce)
    }

    /// New handshake with a caller-chosen client nonce.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_client_nonce(keys: KeyRing, client_nonce: Int128) -> Self {
        Self::from_parts(keys, client_nonce)
    }

    fn from_parts(keys: KeyRing, client_nonce: Int128) -> Self {
        Self {
            state: HandshakeState::Idle,
            aborted: false,
            keys,
            client_nonce,
            server_nonce: None,
            pq: None,
            factors: None,
            fingerprint: None,
            server_time_ms: None,
            dh_response: None,
            tmp_keys: None,
            events: None,
            #[cfg(any(test, feature = "test-utils"))]
            last_plaintext: None,
        }
    }

    /// Receive [`HandshakeEvent`]s from now on. A second call replaces the
    /// previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<HandshakeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub const fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether an earlier error made this instance unusable.
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub const fn client_nonce(&self) -> &Int128 {
        &self.client_nonce
    }

    pub const fn server_nonce(&self) -> Option<&Int128> {
        self.server_nonce.as_ref()
    }

    /// The composite the server asked us to factor.
    pub const fn pq(&self) -> Option<u64> {
        self.pq
    }

    /// `(p, q)` with `p < q`.
    pub const fn factors(&self) -> Option<(u32, u32)> {
        self.factors
    }

    /// The fingerprint the server advertised.
    pub const fn fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    /// Server clock from the most recent inbound envelope, in Unix ms.
    pub const fn server_time_ms(&self) -> Option<u64> {
        self.server_time_ms
    }

    /// Raw payload of the response to `req_DH_params`, if one arrived.
    pub fn dh_response(&self) -> Option<&[u8]> {
        self.dh_response.as_deref()
    }

    /// Temporary key and IV, available once `req_DH_params` is sent.
    pub const fn tmp_aes_keys(&self) -> Option<&TmpAesKeys> {
        self.tmp_keys.as_ref()
    }

    /// The 255-byte block that was RSA-encrypted into `req_DH_params`.
    #[cfg(any(test, feature = "test-utils"))]
    pub const fn last_plaintext(&self) -> Option<&PaddedBlock> {
        self.last_plaintext.as_ref()
    }

    /// `Idle → AwaitingPqResponse`: send `req_pq`.
    pub fn start(&mut self, transport: &mut impl Transport) -> Result<(), HandshakeError> {
        self.ensure(HandshakeState::Idle)?;
        let result = self.send_req_pq(transport);
        self.settle(result)
    }

    /// Feed one inbound package from the transport.
    ///
    /// In `AwaitingPqResponse` this validates `resPQ` and moves to
    /// `PqValidated`. In `AwaitingDhResponse` the envelope is checked and the
    /// payload kept for the caller.
    pub fn on_package(&mut self, package: &[u8]) -> Result<(), HandshakeError> {
        if self.aborted {
            return Err(HandshakeError::Aborted);
        }
        let result = match self.state {
            HandshakeState::AwaitingPqResponse => self.handle_res_pq(package),
            HandshakeState::AwaitingDhResponse => self.handle_dh_response(package),
            actual => {
                return Err(HandshakeError::InvalidState {
                    expected: HandshakeState::AwaitingPqResponse,
                    actual,
                });
            }
        };
        self.settle(result)
    }

    /// `PqValidated → AwaitingDhResponse`: generate the new nonce, encrypt
    /// the inner data under the selected server key and send
    /// `req_DH_params`.
    pub fn request_dh_params(&mut self, transport: &mut impl Transport) -> Result<(), HandshakeError> {
        self.ensure(HandshakeState::PqValidated)?;
        let result = self.send_req_dh_params(transport);
        self.settle(result)
    }

    fn ensure(&self, expected: HandshakeState) -> Result<(), HandshakeError> {
        if self.aborted {
            return Err(HandshakeError::Aborted);
        }
        if self.state != expected {
            return Err(HandshakeError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Mark the instance aborted if `result` is a failure of the step itself.
    fn settle<T>(&mut self, result: Result<T, HandshakeError>) -> Result<T, HandshakeError> {
        match &result {
            Ok(_) | Err(HandshakeError::InvalidState { .. } | HandshakeError::Aborted) => {}
            Err(e) => {
                warn!(state = %self.state, error = %e, "Handshake aborted");
                self.aborted = true;
            }
        }
        result
    }

    fn emit(&self, event: HandshakeEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn send(transport: &mut impl Transport, payload: Vec<u8>) -> Result<(), HandshakeError> {
        let package = PlainEnvelope::new(encode_timestamp(now_ms()), payload).encode()?;
        transport.send_package(package)?;
        Ok(())
    }

    fn send_req_pq(&mut self, transport: &mut impl Transport) -> Result<(), HandshakeError> {
        let payload = ReqPq {
            nonce: self.client_nonce,
        }
        .to_bytes()?;
        Self::send(transport, payload)?;

        self.state = HandshakeState::AwaitingPqResponse;
        debug!(client_nonce = %hex::encode(self.client_nonce), "Sent req_pq");
        Ok(())
    }

    fn handle_res_pq(&mut self, package: &[u8]) -> Result<(), HandshakeError> {
        let envelope = PlainEnvelope::decode(package)?;
        self.server_time_ms = Some(decode_timestamp(envelope.message_id));

        let mut reader = Reader::new(&envelope.payload);
        let tag = reader.read_u32()?;
        if tag != ResPq::TAG {
            return Err(HandshakeError::UnexpectedResponseTag {
                expected: ResPq::TAG,
                actual: tag,
            });
        }
        // Fields are read one at a time so each check fails before any
        // later field is parsed.
        let nonce = reader.read_int128()?;
        if !bool::from(nonce[..].ct_eq(&self.client_nonce[..])) {
            return Err(HandshakeError::NonceMismatch);
        }
        let server_nonce = reader.read_int128()?;
        self.server_nonce = Some(server_nonce);
        debug!(server_nonce = %hex::encode(server_nonce), "Accepted resPQ nonce");

        let pq_bytes = reader.read_bytes()?;
        let pq_bytes: [u8; 8] = pq_bytes
            .as_slice()
            .try_into()
            .map_err(|_| HandshakeError::InvalidCompositeLength {
                actual: pq_bytes.len(),
            })?;
        let pq = u64::from_be_bytes(pq_bytes);
        self.pq = Some(pq);

        let (p, q) = factorize(pq).ok_or(HandshakeError::FactorizationFailed { pq })?;
        let (Ok(p), Ok(q)) = (u32::try_from(p), u32::try_from(q)) else {
            return Err(HandshakeError::FactorizationFailed { pq });
        };
        self.factors = Some((p, q));

        let fingerprints = reader.read_vector_u64()?;
        let &[fingerprint] = fingerprints.as_slice() else {
            return Err(HandshakeError::UnsupportedFingerprintCount {
                count: fingerprints.len(),
            });
        };
        self.fingerprint = Some(fingerprint);

        self.emit(HandshakeEvent::PqReceived { pq, p, q });

        if !self.keys.contains(fingerprint) {
            return Err(HandshakeError::FingerprintMismatch { fingerprint });
        }

        self.state = HandshakeState::PqValidated;
        info!(pq, p, q, fingerprint = %format!("{fingerprint:016x}"), "resPQ validated");
        Ok(())
    }

    fn send_req_dh_params(&mut self, transport: &mut impl Transport) -> Result<(), HandshakeError> {
        let (Some(server_nonce), Some(pq), Some((p, q)), Some(fingerprint)) =
            (self.server_nonce, self.pq, self.factors, self.fingerprint)
        else {
            return Err(HandshakeError::InvalidState {
                expected: HandshakeState::PqValidated,
                actual: self.state,
            });
        };
        let key = self
            .keys
            .get(fingerprint)
            .ok_or(HandshakeError::FingerprintMismatch { fingerprint })?;

        let mut new_nonce = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut new_nonce[..]);

        let mut inner = PqInnerData {
            pq: pq.to_be_bytes().to_vec(),
            p: p.to_be_bytes().to_vec(),
            q: q.to_be_bytes().to_vec(),
            nonce: self.client_nonce,
            server_nonce,
            new_nonce: *new_nonce,
        };
        let encoded = inner.to_bytes();
        inner.new_nonce.zeroize();
        let inner_bytes = Zeroizing::new(encoded?);
        let block = PaddedBlock::build(&inner_bytes, &mut OsRng)?;
        let encrypted_data = block.seal(key)?;

        let request = ReqDhParams {
            nonce: self.client_nonce,
            server_nonce,
            p: p.to_be_bytes().to_vec(),
            q: q.to_be_bytes().to_vec(),
            public_key_fingerprint: fingerprint,
            encrypted_data,
        }
        .to_bytes()?;
        let tmp_keys = derive_tmp_aes_keys(&server_nonce, &new_nonce[..])?;

        Self::send(transport, request)?;

        self.tmp_keys = Some(tmp_keys);
        #[cfg(any(test, feature = "test-utils"))]
        {
            self.last_plaintext = Some(block);
        }
        self.state = HandshakeState::AwaitingDhResponse;
        info!(fingerprint = %format!("{fingerprint:016x}"), "Sent req_DH_params");
        Ok(())
    }

    fn handle_dh_response(&mut self, package: &[u8]) -> Result<(), HandshakeError> {
        let envelope = PlainEnvelope::decode(package)?;
        self.server_time_ms = Some(decode_timestamp(envelope.message_id));

        let len = envelope.payload.len();
        if self.dh_response.replace(envelope.payload).is_some() {
            debug!("Replacing earlier DH response");
        }
        self.emit(HandshakeEvent::DhResponseReceived { len });
        debug!(len, "Retained DH response");
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
