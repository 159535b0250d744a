//! # Socksd - SOCKS5 Proxy Server
//!
//! Socksd is a SOCKS5 (RFC 1928) proxy server with optional
//! username/password authentication (RFC 1929). It accepts client
//! connections, negotiates an authentication method, dials the requested
//! target and relays bytes in both directions.
//!
//! ## Features
//!
//! - **CONNECT only**: BIND and UDP ASSOCIATE are answered with
//!   "command not supported"
//! - **Pluggable credentials**: any [`socks::PasswordVerifier`] can check
//!   usernames and passwords
//! - **Pluggable dialing**: upstream connections go through the
//!   [`transport::Dialer`] trait
//! - **Stream agnostic core**: the protocol runs over any
//!   `AsyncRead + AsyncWrite` stream
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksd::config::load_config;
//! use socksd::server::Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     Server::bind(&config.server).await?.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! Each accepted connection runs three phases in order, on its own task:
//!
//! ```text
//! negotiate -> resolve request (dial) -> relay
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{Socks5Error, Socks5ReplyCode};
pub use server::Server;

/// Version of the Socksd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
