//! Test utilities for Socksd
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksd::config::{AuthMethodConfig, ServerConfig, UserConfig};
use socksd::Server;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a loopback echo server and return its address
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Address with nothing listening on it
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Running server plus the handle that stops it
pub struct TestServer {
    /// Server address
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl TestServer {
    /// Bind and run a server with the given configuration
    pub async fn start(config: ServerConfig) -> Self {
        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tokio::spawn(server.run(shutdown_rx));

        TestServer { addr, shutdown_tx }
    }

    /// Open a client connection to the server
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Test configuration builder
pub struct TestConfigBuilder {
    users: Vec<UserConfig>,
    connect_timeout: u64,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        TestConfigBuilder {
            users: Vec::new(),
            connect_timeout: 5,
        }
    }
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Require password authentication and accept this user
    pub fn user(mut self, username: &str, password: &str) -> Self {
        self.users.push(UserConfig {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = secs;
        self
    }

    /// Build the configuration, listening on an ephemeral loopback port
    pub fn build(self) -> ServerConfig {
        let auth_method = if self.users.is_empty() {
            AuthMethodConfig::None
        } else {
            AuthMethodConfig::Password
        };

        ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            auth_method,
            connect_timeout: self.connect_timeout,
            users: self.users,
            ..Default::default()
        }
    }
}

/// Negotiate "no authentication" on a fresh client connection
pub async fn handshake_no_auth(stream: &mut TcpStream) {
    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut selection = [0u8; 2];
    stream.read_exact(&mut selection).await.unwrap();
    assert_eq!(selection, [0x05, 0x00]);
}

/// Send a request and read the 10-byte IPv4-typed reply
pub async fn request(stream: &mut TcpStream, request: &[u8]) -> [u8; 10] {
    stream.write_all(request).await.unwrap();
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use socksd::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a password auth method selection request
    pub fn create_auth_request_password() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_PASSWORD]
    }

    /// Create a username/password sub-negotiation request
    pub fn create_password_request(username: &str, password: &str) -> Vec<u8> {
        let mut req = vec![SOCKS5_AUTH_VERSION, username.len() as u8];
        req.extend_from_slice(username.as_bytes());
        req.push(password.len() as u8);
        req.extend_from_slice(password.as_bytes());
        req
    }

    /// Create a command to an IPv4 address
    pub fn create_command_ipv4(cmd: u8, ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut req = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED, SOCKS5_ADDR_TYPE_IPV4];
        req.extend_from_slice(&ip);
        req.extend_from_slice(&port.to_be_bytes());
        req
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        create_command_ipv4(SOCKS5_CMD_TCP_CONNECT, ip, port)
    }

    /// Create a connect command to IPv6 address
    pub fn create_connect_ipv6(ip: [u8; 16], port: u16) -> Vec<u8> {
        let mut req = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV6,
        ];
        req.extend_from_slice(&ip);
        req.extend_from_slice(&port.to_be_bytes());
        req
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut req = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        req.extend_from_slice(domain.as_bytes());
        req.extend_from_slice(&port.to_be_bytes());
        req
    }
}
