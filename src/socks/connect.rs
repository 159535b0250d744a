//! SOCKS5 request resolution
//!
//! Reads the client's connection request, dials the upstream for CONNECT
//! and answers with the matching reply.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::socks::command::{send_failure, send_success, ConnectionRequest};
use crate::socks::consts::SOCKS5_ADDR_TYPE_IPV6;
use crate::socks::types::{AddressType, SocksCommand};
use crate::transport::Dialer;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Resolve one connection request into an open upstream stream
///
/// BIND and UDP ASSOCIATE are answered with "command not supported" and
/// IPv6 targets with "address type not supported"; neither reaches the
/// dialer. A failed dial is answered with a reply code derived from the
/// dial error. Exactly one dial is attempted.
///
/// Framing errors while decoding the request are returned without a reply.
pub async fn resolve_request<S, D>(stream: &mut S, dialer: &D) -> Result<D::Stream, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Dialer,
{
    let request = ConnectionRequest::read_from(stream).await?;

    if request.command != SocksCommand::Connect {
        warn!("SOCKS5 {} command not supported", request.command);
        send_failure(stream, Socks5ReplyCode::CommandNotSupported).await?;
        return Err(Socks5Error::CommandNotSupported(request.command.to_byte()));
    }

    if request.target.addr_type() == AddressType::Ipv6 {
        warn!("IPv6 target not supported: {}", request.target);
        send_failure(stream, Socks5ReplyCode::AddressTypeNotSupported).await?;
        return Err(Socks5Error::AddressTypeNotSupported(SOCKS5_ADDR_TYPE_IPV6));
    }

    debug!("Dialing upstream: {}", request.target);

    let upstream = match dialer.dial(&request.target).await {
        Ok(upstream) => upstream,
        Err(e) => {
            let code = Socks5ReplyCode::from(&e);
            warn!("Failed to connect to {}: {} (reply {:?})", request.target, e, code);
            send_failure(stream, code).await?;
            return Err(Socks5Error::Dial {
                target: request.target.to_string(),
                source: e,
            });
        }
    };

    let Some(bound) = upstream.local_addr else {
        send_failure(stream, Socks5ReplyCode::GeneralFailure).await?;
        return Err(Socks5Error::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("local address unavailable for upstream {}", request.target),
        )));
    };

    send_success(stream, bound).await?;

    info!("SOCKS5 tunnel established to {}", request.target);

    Ok(upstream.stream)
}
