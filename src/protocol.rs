//! SOCKS5 handshake state machine, inbound side.
//!
//! Negotiates the no-authentication method and reads the CONNECT request
//! (RFC 1928 subset: no-auth only, CONNECT only). One [`Handshake`] per
//! session; once it reaches [`HandshakeState::Established`] the byte
//! stream belongs to the relay and is never interpreted again.
//!
//! The final CONNECT reply is not sent here: its outcome depends on the
//! outbound connection, so the tunnel sends it (see `tunnel`).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::address::{Address, ATYP_IPV4};
use crate::error::{Error, Result};

/// SOCKS protocol version supported by both hops.
pub const SOCKS_VERSION: u8 = 0x05;
/// Method octet: no authentication required.
pub const METHOD_NO_AUTH: u8 = 0x00;
/// Method octet: no acceptable methods, client must close.
pub const METHOD_NO_ACCEPTABLE: u8 = 0xFF;
/// Command octet: CONNECT. BIND and UDP ASSOCIATE are not supported.
pub const CMD_CONNECT: u8 = 0x01;

/// Reply octet: succeeded.
pub const REPLY_SUCCEEDED: u8 = 0x00;
/// Reply octet: host unreachable.
pub const REPLY_HOST_UNREACHABLE: u8 = 0x04;
/// Reply octet: connection refused.
pub const REPLY_CONNECTION_REFUSED: u8 = 0x05;
/// Reply octet: command not supported.
pub const REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
/// Reply octet: address type not supported.
pub const REPLY_ADDRESS_NOT_SUPPORTED: u8 = 0x08;

/// Handshake progress. Transitions are monotonic; `Established` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the client's version/method-list greeting
    AwaitingGreeting,
    /// Method selected; waiting for the CONNECT request
    AwaitingRequest,
    /// Target address decoded; the stream now belongs to the relay
    Established,
    /// Handshake failed; the inbound connection must be closed
    Failed,
}

/// The inbound-side handshake state machine for one session.
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    /// Create a handshake in the initial state.
    pub fn new() -> Self {
        Self {
            state: HandshakeState::AwaitingGreeting,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Drive the handshake to completion on the inbound stream.
    ///
    /// On success returns the decoded target [`Address`] and leaves the
    /// state at `Established`. On any failure the state is `Failed`; a
    /// best-effort error reply has already been written where SOCKS5
    /// defines one, and the caller drops the connection.
    pub async fn run<S>(&mut self, stream: &mut S) -> Result<Address>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.drive(stream).await {
            Ok(target) => {
                self.state = HandshakeState::Established;
                Ok(target)
            }
            Err(e) => {
                self.state = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    async fn drive<S>(&mut self, stream: &mut S) -> Result<Address>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // === Greeting: VER NMETHODS METHODS... ===
        let mut head = [0u8; 2];
        stream.read_exact(&mut head).await?;
        if head[0] != SOCKS_VERSION {
            return Err(Error::protocol(format!(
                "unsupported SOCKS version 0x{:02x}",
                head[0]
            )));
        }
        let mut methods = vec![0u8; head[1] as usize];
        stream.read_exact(&mut methods).await?;

        if !methods.contains(&METHOD_NO_AUTH) {
            // Best effort; the connection drops either way
            let _ = stream
                .write_all(&[SOCKS_VERSION, METHOD_NO_ACCEPTABLE])
                .await;
            return Err(Error::protocol("no acceptable authentication method"));
        }
        stream.write_all(&[SOCKS_VERSION, METHOD_NO_AUTH]).await?;
        self.state = HandshakeState::AwaitingRequest;

        // === Request: VER CMD RSV ATYP ADDR PORT ===
        let mut req = [0u8; 3];
        stream.read_exact(&mut req).await?;
        if req[0] != SOCKS_VERSION {
            return Err(Error::protocol(format!(
                "unsupported SOCKS version 0x{:02x} in request",
                req[0]
            )));
        }
        if req[1] != CMD_CONNECT {
            let _ = send_reply(stream, REPLY_COMMAND_NOT_SUPPORTED).await;
            return Err(Error::protocol(format!(
                "unsupported command 0x{:02x}",
                req[1]
            )));
        }

        match Address::read_from(stream).await {
            Ok(target) => Ok(target),
            Err(e) => {
                let _ = send_reply(stream, REPLY_ADDRESS_NOT_SUPPORTED).await;
                Err(e)
            }
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a SOCKS5 CONNECT reply with the given reply octet.
///
/// BND.ADDR/BND.PORT are zeroed; clients ignore them for CONNECT.
pub async fn send_reply<S>(stream: &mut S, reply: u8) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream
        .write_all(&[
            SOCKS_VERSION,
            reply,
            0x00,
            ATYP_IPV4,
            0,
            0,
            0,
            0,
            0,
            0,
        ])
        .await?;
    Ok(())
}
