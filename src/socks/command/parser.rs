//! SOCKS5 request codec
//!
//! Decodes and encodes the client's connection request.

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::{AddressType, SocksCommand, TargetAddr};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Client connection request
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// Requested command
    pub command: SocksCommand,
    /// Requested destination
    pub target: TargetAddr,
}

impl ConnectionRequest {
    /// Create a request
    pub fn new(command: SocksCommand, target: TargetAddr) -> Self {
        ConnectionRequest { command, target }
    }

    /// Decode a request
    ///
    /// Header fields are checked in wire order, each with its own error.
    /// Domain names are returned unresolved.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        // Read: VER CMD RSV ATYP
        let mut header = [0u8; 4];
        reader.read_exact(&mut header).await?;

        let [version, cmd_byte, reserved, atyp] = header;

        if version != SOCKS5_VERSION {
            return Err(Socks5Error::VersionNotSupported(version));
        }

        let command =
            SocksCommand::from_byte(cmd_byte).ok_or(Socks5Error::CommandNotSupported(cmd_byte))?;

        if reserved != SOCKS5_RESERVED {
            return Err(Socks5Error::ReservedNotSupported(reserved));
        }

        let addr_type =
            AddressType::from_byte(atyp).ok_or(Socks5Error::AddressTypeNotSupported(atyp))?;

        let target = read_address(reader, addr_type).await?;

        tracing::debug!("Parsed SOCKS5 command: {} to {}", command, target);

        Ok(ConnectionRequest { command, target })
    }

    /// Encode a request
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![
            SOCKS5_VERSION,
            self.command.to_byte(),
            SOCKS5_RESERVED,
            self.target.addr_type().to_byte(),
        ];

        match &self.target {
            TargetAddr::Ip(SocketAddr::V4(addr)) => buf.extend_from_slice(&addr.ip().octets()),
            TargetAddr::Ip(SocketAddr::V6(addr)) => buf.extend_from_slice(&addr.ip().octets()),
            TargetAddr::Domain(domain, _) => {
                if domain.len() > MAX_DOMAIN_LEN {
                    return Err(Socks5Error::Malformed(format!(
                        "domain name too long: {}",
                        domain.len()
                    )));
                }
                buf.push(domain.len() as u8);
                buf.extend_from_slice(domain.as_bytes());
            }
        }
        buf.extend_from_slice(&self.target.port().to_be_bytes());

        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Read the address payload and port for the given address type
async fn read_address<R>(reader: &mut R, addr_type: AddressType) -> Result<TargetAddr, Socks5Error>
where
    R: AsyncRead + Unpin,
{
    let target = match addr_type {
        AddressType::Ipv4 => {
            let mut addr = [0u8; 4];
            reader.read_exact(&mut addr).await?;
            TargetAddr::ipv4(Ipv4Addr::from(addr), read_port(reader).await?)
        }

        AddressType::Domain => {
            let mut len_buf = [0u8; 1];
            reader.read_exact(&mut len_buf).await?;

            let mut domain_buf = vec![0u8; len_buf[0] as usize];
            reader.read_exact(&mut domain_buf).await?;
            // Not validated here; a bad name fails at dial time
            let domain = String::from_utf8_lossy(&domain_buf).into_owned();

            TargetAddr::domain(domain, read_port(reader).await?)
        }

        AddressType::Ipv6 => {
            let mut addr = [0u8; 16];
            reader.read_exact(&mut addr).await?;
            TargetAddr::ipv6(Ipv6Addr::from(addr), read_port(reader).await?)
        }
    };

    Ok(target)
}

async fn read_port<R>(reader: &mut R) -> Result<u16, Socks5Error>
where
    R: AsyncRead + Unpin,
{
    let mut port_buf = [0u8; 2];
    reader.read_exact(&mut port_buf).await?;
    Ok(u16::from_be_bytes(port_buf))
}
