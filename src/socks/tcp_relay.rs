//! TCP relay for SOCKS5 CONNECT command
//!
//! Copies bytes between the client and the upstream until either side
//! finishes.

use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Relay data bidirectionally between client and upstream
///
/// Both directions run concurrently and the relay returns as soon as one of
/// them ends. The upstream is owned by the relay and is shut down and
/// dropped before returning; the client stream is only borrowed and closing
/// it is left to the caller.
///
/// The returned error is the one seen on the upstream-to-client direction.
/// A client-to-upstream failure is logged but not returned.
pub async fn relay_tcp<C, U>(client: &mut C, upstream: U) -> io::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let client_to_upstream = tokio::io::copy(&mut client_read, &mut upstream_write);
    let upstream_to_client = tokio::io::copy(&mut upstream_read, &mut client_write);

    let result = tokio::select! {
        result = upstream_to_client => {
            match result {
                Ok(bytes) => {
                    debug!("Upstream->client finished: {} bytes", bytes);
                    Ok(())
                }
                Err(e) => {
                    debug!("Upstream->client error: {}", e);
                    Err(e)
                }
            }
        }
        result = client_to_upstream => {
            match result {
                Ok(bytes) => debug!("Client->upstream finished: {} bytes", bytes),
                Err(e) => warn!("Client->upstream error: {}", e),
            }
            Ok(())
        }
    };

    let mut upstream = upstream_read.unsplit(upstream_write);
    if let Err(e) = upstream.shutdown().await {
        debug!("Failed to shut down upstream: {}", e);
    }

    result
}
