//! SOCKS5 reply codec
//!
//! Constructs, sends and decodes SOCKS5 reply messages.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::socks::consts::*;
use crate::socks::types::AddressType;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Server reply to a connection request
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The bound address is always a concrete IP; domain names never appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionReply {
    /// Reply status
    pub code: Socks5ReplyCode,
    /// Bound address reported to the client
    pub bound: SocketAddr,
}

impl ConnectionReply {
    /// Success reply carrying the upstream's local endpoint
    ///
    /// IPv4-mapped IPv6 addresses are reported as plain IPv4.
    pub fn success(bound: SocketAddr) -> Self {
        let bound = match bound {
            SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
                Some(v4) => SocketAddr::new(IpAddr::V4(v4), v6.port()),
                None => bound,
            },
            v4 => v4,
        };

        ConnectionReply {
            code: Socks5ReplyCode::Succeeded,
            bound,
        }
    }

    /// Failure reply: IPv4 type, zero address, port 0
    pub fn failure(code: Socks5ReplyCode) -> Self {
        ConnectionReply {
            code,
            bound: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        }
    }

    /// Encode to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut reply = vec![SOCKS5_VERSION, self.code.into(), SOCKS5_RESERVED];

        match self.bound {
            SocketAddr::V4(addr) => {
                reply.push(SOCKS5_ADDR_TYPE_IPV4);
                reply.extend_from_slice(&addr.ip().octets());
                reply.extend_from_slice(&addr.port().to_be_bytes());
            }
            SocketAddr::V6(addr) => {
                reply.push(SOCKS5_ADDR_TYPE_IPV6);
                reply.extend_from_slice(&addr.ip().octets());
                reply.extend_from_slice(&addr.port().to_be_bytes());
            }
        }

        reply
    }

    /// Encode and flush
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Decode a reply
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; 4];
        reader.read_exact(&mut header).await?;

        let [version, rep, reserved, atyp] = header;

        if version != SOCKS5_VERSION {
            return Err(Socks5Error::VersionNotSupported(version));
        }
        let code = Socks5ReplyCode::try_from(rep)?;
        if reserved != SOCKS5_RESERVED {
            return Err(Socks5Error::ReservedNotSupported(reserved));
        }

        let ip = match AddressType::from_byte(atyp) {
            Some(AddressType::Ipv4) => {
                let mut addr = [0u8; 4];
                reader.read_exact(&mut addr).await?;
                IpAddr::V4(Ipv4Addr::from(addr))
            }
            Some(AddressType::Ipv6) => {
                let mut addr = [0u8; 16];
                reader.read_exact(&mut addr).await?;
                IpAddr::V6(Ipv6Addr::from(addr))
            }
            _ => return Err(Socks5Error::AddressTypeNotSupported(atyp)),
        };

        let mut port = [0u8; 2];
        reader.read_exact(&mut port).await?;

        Ok(ConnectionReply {
            code,
            bound: SocketAddr::new(ip, u16::from_be_bytes(port)),
        })
    }
}

/// Send a success reply
pub async fn send_success<S>(stream: &mut S, bound: SocketAddr) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    ConnectionReply::success(bound).write_to(stream).await
}

/// Send a failure reply
pub async fn send_failure<S>(stream: &mut S, code: Socks5ReplyCode) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    ConnectionReply::failure(code).write_to(stream).await
}
