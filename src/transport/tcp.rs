//! TCP dialer implementation
//!
//! Opens plain TCP connections to SOCKS5 targets.

use super::{Dialer, SocketOpts, Upstream};
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP dialer for upstream connections
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpDialer {
    /// Create a new TCP dialer with default options
    pub fn with_defaults() -> Self {
        TcpDialer {
            socket_opts: SocketOpts::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve the target to one IPv4 socket address
    async fn resolve(&self, target: &TargetAddr) -> io::Result<SocketAddr> {
        match target {
            TargetAddr::Ip(addr) => pick_ipv4(&target.to_string(), std::iter::once(*addr)),
            TargetAddr::Domain(domain, port) => {
                let addrs = tokio::net::lookup_host((domain.as_str(), *port)).await?;
                pick_ipv4(domain, addrs)
            }
        }
    }
}

/// First IPv4 address of a lookup
///
/// A host with only IPv6 addresses fails with `Unsupported`, which is
/// answered as "address type not supported".
fn pick_ipv4<I>(host: &str, addrs: I) -> io::Result<SocketAddr>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let mut saw_ipv6 = false;
    for addr in addrs {
        match addr {
            SocketAddr::V4(_) => return Ok(addr),
            SocketAddr::V6(_) => saw_ipv6 = true,
        }
    }

    if saw_ipv6 {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("only IPv6 addresses found for {}", host),
        ))
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for domain: {}", host),
        ))
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &TargetAddr) -> io::Result<Upstream<TcpStream>> {
        let resolved = self.resolve(target).await?;

        tracing::debug!("Connecting to target: {} ({})", target, resolved);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(resolved))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connection timeout to {}", resolved),
                )
            })??;

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        let local_addr = match stream.local_addr() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!("Failed to read local address for {}: {}", target, e);
                None
            }
        };

        Ok(Upstream { stream, local_addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_dialer_with_defaults() {
        let dialer = TcpDialer::with_defaults();
        assert!(dialer.socket_opts.nodelay);
        assert_eq!(dialer.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_tcp_dialer_builders() {
        let opts = SocketOpts {
            nodelay: false,
            keepalive_secs: Some(60),
            keepalive_interval: Some(20),
        };
        let dialer = TcpDialer::with_defaults()
            .with_socket_opts(opts.clone())
            .with_connect_timeout(Duration::from_secs(30));
        assert_eq!(dialer.socket_opts, opts);
        assert_eq!(dialer.connect_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_tcp_dialer_connects_and_reports_local_addr() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = TargetAddr::from(listener.local_addr().unwrap());

        let dialer = TcpDialer::with_defaults();
        let (upstream, accepted) = tokio::join!(dialer.dial(&target), listener.accept());
        let upstream = upstream.unwrap();
        let (_, peer) = accepted.unwrap();

        assert_eq!(upstream.local_addr, Some(peer));
        assert_eq!(peer.ip(), Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn test_tcp_dialer_resolves_localhost_to_ipv4() {
        let dialer = TcpDialer::with_defaults();
        let resolved = dialer
            .resolve(&TargetAddr::domain("localhost", 8080))
            .await
            .unwrap();
        assert_eq!(resolved.port(), 8080);
        assert!(resolved.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_tcp_dialer_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dialer = TcpDialer::with_defaults().with_connect_timeout(Duration::from_secs(2));
        let err = dialer.dial(&TargetAddr::from(addr)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_pick_ipv4_prefers_ipv4() {
        let v6: SocketAddr = "[::1]:80".parse().unwrap();
        let v4: SocketAddr = "127.0.0.1:80".parse().unwrap();
        assert_eq!(pick_ipv4("host", vec![v6, v4]).unwrap(), v4);
    }

    #[test]
    fn test_pick_ipv4_rejects_ipv6_only() {
        let v6: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        let err = pick_ipv4("v6only.example", vec![v6]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_eq!(
            crate::error::Socks5ReplyCode::from(&err),
            crate::error::Socks5ReplyCode::AddressTypeNotSupported
        );

        let err = pick_ipv4("nothing.example", Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_tcp_dialer_refuses_ipv6_target() {
        let dialer = TcpDialer::with_defaults();
        let target = TargetAddr::ipv6(std::net::Ipv6Addr::LOCALHOST, 80);
        let err = dialer.dial(&target).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_tcp_dialer_unresolvable_domain() {
        let dialer = TcpDialer::with_defaults();
        let target = TargetAddr::domain("this-domain-does-not-exist-12345.invalid", 80);
        assert!(dialer.dial(&target).await.is_err());
    }
}
