//! TCP transport with "intermediate" framing.
//!
//! The client opens the stream with the 4-byte preamble `ee ee ee ee`.
//! After that every packet in either direction is a little-endian `u32`
//! length followed by that many bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{Transport, TransportError, TransportEvent};

/// Sent once by the client before the first packet.
pub const INTERMEDIATE_PREAMBLE: [u8; 4] = [0xee; 4];

/// Upper bound on an inbound packet.
pub const MAX_PACKET_LEN: usize = 1 << 24;

/// Capacity of the outbound and inbound queues.
const QUEUE_CAPACITY: usize = 16;

/// Write one length-prefixed packet.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    package: &[u8],
) -> Result<(), TransportError> {
    let len = u32::try_from(package.len())
        .map_err(|_| TransportError::Framing(format!("packet of {} bytes", package.len())))?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(package).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed packet. `Ok(None)` on a clean EOF at a packet boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, TransportError> {
    let len = match reader.read_u32_le().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_PACKET_LEN {
        return Err(TransportError::Framing(format!(
            "inbound packet of {len} bytes exceeds {MAX_PACKET_LEN}"
        )));
    }
    let mut package = vec![0u8; len];
    reader.read_exact(&mut package).await?;
    Ok(Some(package))
}

/// Read and check the client preamble (server side).
pub async fn read_preamble<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(), TransportError> {
    let mut preamble = [0u8; 4];
    reader.read_exact(&mut preamble).await?;
    if preamble != INTERMEDIATE_PREAMBLE {
        return Err(TransportError::Framing(format!(
            "unexpected preamble {}",
            hex::encode(preamble)
        )));
    }
    Ok(())
}

/// A connected TCP transport.
///
/// Sending only queues the package; a writer task does the IO. A reader
/// task turns inbound frames into [`TransportEvent`]s.
pub struct TcpTransport {
    outbound: mpsc::Sender<Vec<u8>>,
    writer: JoinHandle<Result<(), TransportError>>,
    reader: JoinHandle<()>,
}

impl TcpTransport {
    /// Connect to `addr` and start the IO tasks.
    pub async fn connect(
        addr: &str,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr, "Connected");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (mut read_half, mut write_half) = stream.into_split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(QUEUE_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);

        let writer = tokio::spawn(async move {
            write_half.write_all(&INTERMEDIATE_PREAMBLE).await?;
            while let Some(package) = outbound_rx.recv().await {
                trace!(len = package.len(), "Writing frame");
                write_frame(&mut write_half, &package).await?;
            }
            write_half.shutdown().await?;
            Ok(())
        });

        let reader = tokio::spawn(async move {
            loop {
                match read_frame(&mut read_half).await {
                    Ok(Some(package)) => {
                        trace!(len = package.len(), "Read frame");
                        if event_tx
                            .send(TransportEvent::PackageReady(package))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Inbound stream failed");
                        break;
                    }
                }
            }
            let _ = event_tx.send(TransportEvent::Closed).await;
        });

        (
            Self {
                outbound: outbound_tx,
                writer,
                reader,
            },
            event_rx,
        )
    }

    /// Flush everything queued, close the write side and stop reading.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        drop(self.outbound);
        let result = self
            .writer
            .await
            .map_err(|e| TransportError::Framing(format!("writer task failed: {e}")))?;
        self.reader.abort();
        result
    }
}

impl Transport for TcpTransport {
    fn send_package(&mut self, package: Vec<u8>) -> Result<(), TransportError> {
        self.outbound
            .try_send(package)
            .map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn frames_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, &[1, 2, 3]).await.unwrap();
        write_frame(&mut a, &[]).await.unwrap();
        drop(a);

        assert_eq!(read_frame(&mut b).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(read_frame(&mut b).await.unwrap(), Some(vec![]));
        assert_eq!(read_frame(&mut b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_le_bytes()).await.unwrap();
        assert!(matches!(
            read_frame(&mut b).await,
            Err(TransportError::Framing(_))
        ));
    }

    #[tokio::test]
    async fn preamble_is_checked() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[0xef, 0, 0, 0]).await.unwrap();
        assert!(read_preamble(&mut b).await.is_err());
    }

    #[tokio::test]
    async fn tcp_transport_sends_preamble_and_delivers_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_preamble(&mut socket).await.unwrap();
            let request = read_frame(&mut socket).await.unwrap().unwrap();
            write_frame(&mut socket, &request).await.unwrap();
        });

        let (mut transport, mut events) = TcpTransport::connect(&addr).await.unwrap();
        transport.send_package(b"ping".to_vec()).unwrap();

        assert_eq!(
            events.recv().await,
            Some(TransportEvent::PackageReady(b"ping".to_vec()))
        );
        server.await.unwrap();
        assert_eq!(events.recv().await, Some(TransportEvent::Closed));
        let _ = transport.shutdown().await;
    }
}
