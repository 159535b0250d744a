//! SOCKS5 module for Socksd
//!
//! This module implements the server side of the SOCKS5 protocol over any
//! async byte stream: method negotiation, request resolution and the relay.

mod auth;
mod command;
mod connect;
mod consts;
mod handler;
mod tcp_relay;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{
    authenticate_password, negotiate, AuthMethod, AuthNegotiation, AuthPolicy, AuthSelection,
    PasswordAuthReply, PasswordAuthRequest, PasswordVerifier, StaticCredentials,
};
pub use command::{send_failure, send_success, ConnectionReply, ConnectionRequest};
pub use connect::resolve_request;
pub use consts::*;
pub use handler::{handle_socks5_on_stream, SocksService};
pub use tcp_relay::relay_tcp;
pub use types::{AddressType, SocksCommand, TargetAddr};
