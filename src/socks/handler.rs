//! Main SOCKS5 handler
//!
//! This module provides the entry point for handling one SOCKS5 connection.
//! It sequences authentication, request resolution and the relay.

use crate::error::Socks5Error;
use crate::socks::auth::{negotiate, AuthPolicy};
use crate::socks::connect::resolve_request;
use crate::socks::tcp_relay::relay_tcp;
use crate::transport::Dialer;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Handle SOCKS5 protocol on a stream
///
/// # Protocol Flow
///
/// 1. Method negotiation, plus username/password if the policy requires it
/// 2. Request parsing and upstream dial
/// 3. Bidirectional relay
///
/// The first failing phase ends the pipeline; nothing is retried. The
/// stream is borrowed, so closing it is up to the caller.
pub async fn handle_socks5_on_stream<S, D>(
    stream: &mut S,
    auth: &AuthPolicy,
    dialer: &D,
) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Dialer,
{
    negotiate(stream, auth).await?;

    let upstream = resolve_request(stream, dialer).await?;

    relay_tcp(stream, upstream).await?;

    Ok(())
}

/// SOCKS5 service shared by all connections of a server
///
/// Holds the read-only state every connection needs.
#[derive(Debug)]
pub struct SocksService<D> {
    auth: AuthPolicy,
    dialer: D,
}

impl<D: Dialer> SocksService<D> {
    /// Create a service
    pub fn new(auth: AuthPolicy, dialer: D) -> Self {
        SocksService { auth, dialer }
    }

    /// Authentication policy in use
    pub fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    /// Serve one connection to completion and close it
    pub async fn serve<S>(&self, mut stream: S) -> Result<(), Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = handle_socks5_on_stream(&mut stream, &self.auth, &self.dialer).await;

        if let Err(e) = stream.shutdown().await {
            debug!("Failed to shut down client stream: {}", e);
        }

        result
    }
}
