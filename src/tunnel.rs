//! Per-session tunnel: one inbound connection paired with one outbound
//! connection, relayed through per-direction cipher streams.
//!
//! Session header on the hop-to-hop link, per direction:
//!
//! ```text
//! local → remote:  nonce (12 bytes, clear) + target address (clear),
//!                  then the encrypted payload stream
//! remote → local:  nonce (12 bytes, clear), sent only once the
//!                  destination connection is up, then the encrypted
//!                  payload stream
//! ```
//!
//! The remote hop's nonce doubles as the connect acknowledgement: the
//! link closing before it arrives means the destination was unreachable.
//!
//! All session functions are generic over `AsyncRead + AsyncWrite`
//! streams and take the outbound connection as an injected future, so
//! the whole session machinery runs over in-memory pipes in tests.

use std::future::Future;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::address::Address;
use crate::cipher::{CipherKey, CipherStream, Nonce, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::protocol::{self, Handshake};

/// Relay copy buffer size per direction.
const RELAY_BUF_SIZE: usize = 16 * 1024;

/// One session's paired connections and cipher state.
///
/// Move-only: a tunnel is exclusively owned by the task driving it and
/// is consumed by [`Tunnel::relay`].
pub struct Tunnel<I, O> {
    inbound: I,
    outbound: O,
    /// Applied to bytes flowing inbound → outbound
    tx: CipherStream,
    /// Applied to bytes flowing outbound → inbound
    rx: CipherStream,
}

impl<I, O> Tunnel<I, O>
where
    I: AsyncRead + AsyncWrite + Unpin,
    O: AsyncRead + AsyncWrite + Unpin,
{
    /// Pair an inbound and an outbound connection with their cipher streams.
    pub fn new(inbound: I, outbound: O, tx: CipherStream, rx: CipherStream) -> Self {
        Self {
            inbound,
            outbound,
            tx,
            rx,
        }
    }

    /// Pump bytes in both directions until either side closes or errors.
    ///
    /// Each direction is an independent FIFO copy loop; when one side
    /// reaches EOF or errors, the peer's write half is shut down so its
    /// outstanding writes drain. Returns the byte counts relayed
    /// (inbound → outbound, outbound → inbound).
    pub async fn relay(self) -> Result<(u64, u64)> {
        let Tunnel {
            inbound,
            outbound,
            mut tx,
            mut rx,
        } = self;

        let (mut in_read, mut in_write) = tokio::io::split(inbound);
        let (mut out_read, mut out_write) = tokio::io::split(outbound);

        let forward = async {
            let mut buf = vec![0u8; RELAY_BUF_SIZE];
            let mut total = 0u64;
            loop {
                let n = match in_read.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(_) => break,
                };
                tx.encrypt(&mut buf[..n]);
                if out_write.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                total += n as u64;
            }
            let _ = out_write.shutdown().await;
            total
        };

        let backward = async {
            let mut buf = vec![0u8; RELAY_BUF_SIZE];
            let mut total = 0u64;
            loop {
                let n = match out_read.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(_) => break,
                };
                rx.decrypt(&mut buf[..n]);
                if in_write.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                total += n as u64;
            }
            let _ = in_write.shutdown().await;
            total
        };

        let (sent, received) = tokio::join!(forward, backward);
        Ok((sent, received))
    }
}

/// Drive one client session on the local (client-facing) hop.
///
/// Runs the SOCKS5 handshake on `client`, then opens the link to the
/// remote hop via `connect` (a single attempt), exchanges the session
/// header, answers the client, and relays until either side closes.
pub async fn run_local_session<C, L, F, Fut>(
    mut client: C,
    key: &CipherKey,
    connect: F,
) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    L: AsyncRead + AsyncWrite + Unpin,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::io::Result<L>>,
{
    let mut handshake = Handshake::new();
    let target = handshake.run(&mut client).await?;
    tracing::debug!("CONNECT {}", target);

    let mut link = match connect().await {
        Ok(link) => link,
        Err(e) => {
            let _ = protocol::send_reply(&mut client, protocol::REPLY_HOST_UNREACHABLE).await;
            return Err(Error::Connect(e));
        }
    };

    // Session header: our nonce, then the target in the clear.
    // Everything after the header is encrypted. The remote hop answers
    // with its own nonce once the destination connection is up; the link
    // dying anywhere in this exchange means it never got there.
    let tx_nonce = Nonce::random();
    let mut rx_nonce = [0u8; NONCE_SIZE];
    let setup = async {
        let target_wire = target.to_wire();
        let mut header = BytesMut::with_capacity(NONCE_SIZE + target_wire.len());
        header.put_slice(tx_nonce.as_bytes());
        header.put_slice(&target_wire);
        link.write_all(&header).await?;
        link.read_exact(&mut rx_nonce).await?;
        Ok::<_, std::io::Error>(())
    };
    if let Err(e) = setup.await {
        let _ = protocol::send_reply(&mut client, protocol::REPLY_CONNECTION_REFUSED).await;
        return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Closed
        } else {
            Error::Network(e)
        });
    }

    protocol::send_reply(&mut client, protocol::REPLY_SUCCEEDED).await?;

    let tx = CipherStream::new(key, &tx_nonce);
    let rx = CipherStream::new(key, &Nonce::from_bytes(rx_nonce));
    let (sent, received) = Tunnel::new(client, link, tx, rx).relay().await?;
    tracing::debug!("session closed: {} bytes out, {} bytes in", sent, received);
    Ok(())
}

/// Drive one session on the remote (destination-facing) hop.
///
/// Reads the session header from the link, connects to the decoded
/// target (a single attempt; on failure the link is dropped without a
/// nonce, which the local hop reads as connect failure), then relays.
pub async fn run_remote_session<L, T, F, Fut>(mut link: L, key: &CipherKey, connect: F) -> Result<()>
where
    L: AsyncRead + AsyncWrite + Unpin,
    T: AsyncRead + AsyncWrite + Unpin,
    F: FnOnce(Address) -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    let mut peer_nonce = [0u8; NONCE_SIZE];
    if let Err(e) = link.read_exact(&mut peer_nonce).await {
        return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Closed
        } else {
            Error::Network(e)
        });
    }
    let target = Address::read_from(&mut link).await?;
    tracing::debug!("outbound connect to {}", target);

    let destination = connect(target).await.map_err(Error::Connect)?;

    let tx_nonce = Nonce::random();
    link.write_all(tx_nonce.as_bytes()).await?;

    // link → destination decrypts the client's stream; destination →
    // link encrypts ours. Both are the same XOR transform, keyed by the
    // respective direction nonce.
    let tx = CipherStream::new(key, &Nonce::from_bytes(peer_nonce));
    let rx = CipherStream::new(key, &tx_nonce);
    let (sent, received) = Tunnel::new(link, destination, tx, rx).relay().await?;
    tracing::debug!("session closed: {} bytes in, {} bytes out", sent, received);
    Ok(())
}
