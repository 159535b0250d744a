//! SOCKS5 server
//!
//! Accepts client connections and serves each one on its own task.

use crate::config::ServerConfig;
use crate::socks::{AuthPolicy, SocksService};
use crate::transport::{Dialer, SocketOpts, TcpDialer};
use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, e.g. when the process is out of descriptors
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Listening SOCKS5 server
pub struct Server<D: Dialer = TcpDialer> {
    /// Bound listener
    listener: TcpListener,
    /// Shared per-connection state
    service: Arc<SocksService<D>>,
    /// Options applied to accepted sockets
    socket_opts: SocketOpts,
}

impl Server<TcpDialer> {
    /// Validate the configuration and bind the listener
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let addr = config.listen_socket_addr().map_err(|e| anyhow!(e))?;
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);
        let dialer = TcpDialer::with_defaults()
            .with_socket_opts(socket_opts.clone())
            .with_connect_timeout(config.connect_timeout());

        Self::with_dialer(addr, config.auth_policy(), dialer, socket_opts).await
    }
}

impl<D: Dialer> Server<D> {
    /// Bind a server using the given dialer for upstream connections
    pub async fn with_dialer(
        addr: SocketAddr,
        auth: AuthPolicy,
        dialer: D,
        socket_opts: SocketOpts,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        Ok(Server {
            listener,
            service: Arc::new(SocksService::new(auth, dialer)),
            socket_opts,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to get listener address")
    }

    /// Accept connections until shutdown
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!("SOCKS5 server listening on {}", self.local_addr()?);
        info!("Authentication: {:?}", self.service.auth().method());

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);

                            if let Err(e) = self.socket_opts.apply(&stream) {
                                warn!("Failed to apply socket options for {}: {}", peer, e);
                            }

                            let service = self.service.clone();
                            tokio::spawn(async move {
                                if let Err(e) = service.serve(stream).await {
                                    error!("Connection from {} failed: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            if backoff_or_shutdown(&mut shutdown_rx).await {
                                info!("Shutdown signal received, stopping server");
                                break;
                            }
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Sleep for the accept backoff; returns true if shutdown arrived first
async fn backoff_or_shutdown(shutdown_rx: &mut broadcast::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
        _ = shutdown_rx.recv() => true,
    }
}
