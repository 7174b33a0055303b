//! SOCKS5 endpoint addresses.
//!
//! An [`Address`] names a connection target as either an IP socket address
//! or a domain name plus port. It travels in SOCKS5 wire form (RFC 1928
//! §5) in two places: the client's CONNECT request and the session header
//! on the hop-to-hop link.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Address type octet: IPv4, 4-byte body.
pub const ATYP_IPV4: u8 = 0x01;
/// Address type octet: domain name, length-prefixed body.
pub const ATYP_DOMAIN: u8 = 0x03;
/// Address type octet: IPv6, 16-byte body.
pub const ATYP_IPV6: u8 = 0x04;

/// A connection target: IP socket address or domain name plus port.
///
/// Immutable once constructed; two addresses are equal iff kind, host,
/// and port all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// IPv4 or IPv6 socket address
    Ip(SocketAddr),
    /// Domain name and port, resolved by whoever connects
    Domain(String, u16),
}

impl Address {
    /// Build an address from a human-supplied host and a host-byte-order
    /// port. Numeric hosts become [`Address::Ip`]; anything else is kept
    /// as a domain name. Used at configuration time, not on the wire path.
    pub fn from_host_order(host: &str, port: u16) -> Result<Self> {
        if host.is_empty() {
            return Err(Error::malformed("empty host"));
        }
        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(Address::Ip(SocketAddr::new(ip, port))),
            Err(_) => {
                if host.len() > 255 {
                    return Err(Error::malformed("domain name longer than 255 bytes"));
                }
                Ok(Address::Domain(host.to_string(), port))
            }
        }
    }

    /// The port component.
    pub fn port(&self) -> u16 {
        match self {
            Address::Ip(sa) => sa.port(),
            Address::Domain(_, port) => *port,
        }
    }

    /// Decode an address from its full SOCKS5 wire form:
    /// type octet, address body, big-endian port.
    ///
    /// The buffer must contain exactly one address; trailing bytes are
    /// rejected so that `parse(to_wire(a)) == a` is an exact round trip.
    pub fn parse(wire: &[u8]) -> Result<Self> {
        if wire.is_empty() {
            return Err(Error::malformed("empty address"));
        }
        let (addr, consumed) = match wire[0] {
            ATYP_IPV4 => {
                if wire.len() < 7 {
                    return Err(Error::malformed("IPv4 address too short"));
                }
                let ip = Ipv4Addr::new(wire[1], wire[2], wire[3], wire[4]);
                let port = u16::from_be_bytes([wire[5], wire[6]]);
                (Address::Ip(SocketAddr::new(IpAddr::V4(ip), port)), 7)
            }
            ATYP_DOMAIN => {
                if wire.len() < 2 {
                    return Err(Error::malformed("domain address too short"));
                }
                let len = wire[1] as usize;
                if len == 0 {
                    return Err(Error::malformed("empty domain name"));
                }
                if wire.len() < 2 + len + 2 {
                    return Err(Error::malformed("domain address truncated"));
                }
                let host = String::from_utf8(wire[2..2 + len].to_vec())
                    .map_err(|_| Error::malformed("domain name is not UTF-8"))?;
                let port = u16::from_be_bytes([wire[2 + len], wire[2 + len + 1]]);
                (Address::Domain(host, port), 2 + len + 2)
            }
            ATYP_IPV6 => {
                if wire.len() < 19 {
                    return Err(Error::malformed("IPv6 address too short"));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&wire[1..17]);
                let port = u16::from_be_bytes([wire[17], wire[18]]);
                (
                    Address::Ip(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port)),
                    19,
                )
            }
            atyp => {
                return Err(Error::malformed(format!(
                    "unknown address type: 0x{:02x}",
                    atyp
                )))
            }
        };
        if consumed != wire.len() {
            return Err(Error::malformed("trailing bytes after address"));
        }
        Ok(addr)
    }

    /// Decode an address from a byte stream. Streaming counterpart of
    /// [`Address::parse`], used where the address arrives mid-stream.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let atyp = reader.read_u8().await?;
        match atyp {
            ATYP_IPV4 => {
                let mut body = [0u8; 6];
                reader.read_exact(&mut body).await?;
                let ip = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
                let port = u16::from_be_bytes([body[4], body[5]]);
                Ok(Address::Ip(SocketAddr::new(IpAddr::V4(ip), port)))
            }
            ATYP_DOMAIN => {
                let len = reader.read_u8().await? as usize;
                if len == 0 {
                    return Err(Error::malformed("empty domain name"));
                }
                let mut body = vec![0u8; len + 2];
                reader.read_exact(&mut body).await?;
                let host = String::from_utf8(body[..len].to_vec())
                    .map_err(|_| Error::malformed("domain name is not UTF-8"))?;
                let port = u16::from_be_bytes([body[len], body[len + 1]]);
                Ok(Address::Domain(host, port))
            }
            ATYP_IPV6 => {
                let mut body = [0u8; 18];
                reader.read_exact(&mut body).await?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&body[..16]);
                let port = u16::from_be_bytes([body[16], body[17]]);
                Ok(Address::Ip(SocketAddr::new(
                    IpAddr::V6(Ipv6Addr::from(octets)),
                    port,
                )))
            }
            atyp => Err(Error::malformed(format!(
                "unknown address type: 0x{:02x}",
                atyp
            ))),
        }
    }

    /// Encode the address into SOCKS5 wire form. Inverse of [`Address::parse`].
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(19);
        match self {
            Address::Ip(SocketAddr::V4(sa)) => {
                buf.put_u8(ATYP_IPV4);
                buf.put_slice(&sa.ip().octets());
                buf.put_u16(sa.port());
            }
            Address::Ip(SocketAddr::V6(sa)) => {
                buf.put_u8(ATYP_IPV6);
                buf.put_slice(&sa.ip().octets());
                buf.put_u16(sa.port());
            }
            Address::Domain(host, port) => {
                buf.put_u8(ATYP_DOMAIN);
                buf.put_u8(host.len() as u8);
                buf.put_slice(host.as_bytes());
                buf.put_u16(*port);
            }
        }
        buf.freeze()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ip(sa) => write!(f, "{}", sa),
            Address::Domain(host, port) => write!(f, "{}:{}", host, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_roundtrip() {
        let addr = Address::from_host_order("93.184.216.34", 80).unwrap();
        let wire = addr.to_wire();
        assert_eq!(&wire[..], &[0x01, 93, 184, 216, 34, 0x00, 0x50]);
        assert_eq!(Address::parse(&wire).unwrap(), addr);
    }

    #[test]
    fn test_ipv6_roundtrip() {
        let addr = Address::from_host_order("2001:db8::1", 443).unwrap();
        let wire = addr.to_wire();
        assert_eq!(wire.len(), 19);
        assert_eq!(wire[0], ATYP_IPV6);
        assert_eq!(Address::parse(&wire).unwrap(), addr);
    }

    #[test]
    fn test_domain_roundtrip() {
        let addr = Address::from_host_order("example.com", 8080).unwrap();
        let wire = addr.to_wire();
        assert_eq!(wire[0], ATYP_DOMAIN);
        assert_eq!(wire[1], 11);
        assert_eq!(Address::parse(&wire).unwrap(), addr);
    }

    #[test]
    fn test_port_zero_is_valid() {
        let addr = Address::from_host_order("0.0.0.0", 0).unwrap();
        assert_eq!(addr.port(), 0);
        assert_eq!(Address::parse(&addr.to_wire()).unwrap(), addr);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = Address::parse(&[0x02, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::MalformedAddress(_)));
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(Address::parse(&[]).is_err());
        assert!(Address::parse(&[0x01, 127, 0, 0, 1]).is_err());
        assert!(Address::parse(&[0x04, 0, 0, 0]).is_err());
        // domain claims 11 bytes but carries 3
        assert!(Address::parse(&[0x03, 11, b'f', b'o', b'o']).is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let mut wire = Address::from_host_order("127.0.0.1", 80)
            .unwrap()
            .to_wire()
            .to_vec();
        wire.push(0xAA);
        assert!(Address::parse(&wire).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_domain() {
        assert!(Address::parse(&[0x03, 0, 0x00, 0x50]).is_err());
    }

    #[tokio::test]
    async fn test_read_from_stream() {
        let addr = Address::from_host_order("example.com", 443).unwrap();
        let mut wire = addr.to_wire().to_vec();
        // relay payload following the address must be left unread
        wire.extend_from_slice(b"payload");

        let mut cursor = std::io::Cursor::new(wire);
        let decoded = Address::read_from(&mut cursor).await.unwrap();
        assert_eq!(decoded, addr);
        assert_eq!(cursor.position(), 15);
    }

    #[test]
    fn test_from_host_order_detects_kind() {
        assert!(matches!(
            Address::from_host_order("127.0.0.1", 80).unwrap(),
            Address::Ip(SocketAddr::V4(_))
        ));
        assert!(matches!(
            Address::from_host_order("::1", 80).unwrap(),
            Address::Ip(SocketAddr::V6(_))
        ));
        assert!(matches!(
            Address::from_host_order("localhost", 80).unwrap(),
            Address::Domain(_, _)
        ));
        assert!(Address::from_host_order("", 80).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Address::from_host_order("10.0.0.1", 5050).unwrap().to_string(),
            "10.0.0.1:5050"
        );
        assert_eq!(
            Address::from_host_order("::1", 6060).unwrap().to_string(),
            "[::1]:6060"
        );
        assert_eq!(
            Address::from_host_order("example.com", 80).unwrap().to_string(),
            "example.com:80"
        );
    }
}
