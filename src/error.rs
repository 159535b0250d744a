//! Error types for Socksd
//!
//! This module defines the SOCKS5 error taxonomy and the reply code table.

use std::io;
use thiserror::Error;

/// SOCKS5 specific errors
///
/// Every failure of a single connection's pipeline is one of these. None of
/// them is fatal to the server.
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Stream ended before a declared field was fully read
    #[error("Short read: stream ended before message was complete")]
    ShortRead,

    /// A field holds a value that cannot be decoded
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Unsupported SOCKS version
    #[error("Protocol version not supported: {0}")]
    VersionNotSupported(u8),

    /// Unsupported username/password sub-negotiation version
    #[error("Method version not supported: {0}")]
    MethodVersionNotSupported(u8),

    /// Command not supported
    #[error("Request command not supported: {0}")]
    CommandNotSupported(u8),

    /// Reserved byte is not zero
    #[error("Request reserved byte not supported: {0}")]
    ReservedNotSupported(u8),

    /// Address type not supported
    #[error("Request address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Credentials were rejected by the verifier
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Upstream connection could not be established
    #[error("Failed to connect to {target}: {source}")]
    Dial {
        /// Requested target
        target: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Socks5Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Socks5Error::ShortRead
        } else {
            Socks5Error::Io(err)
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = Socks5Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            other => Err(Socks5Error::Malformed(format!("unknown reply code {other}"))),
        }
    }
}

/// Classify a dial error. Anything the OS does not report more precisely
/// is answered as "connection refused".
impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NetworkUnreachable => Socks5ReplyCode::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            io::ErrorKind::Unsupported => Socks5ReplyCode::AddressTypeNotSupported,
            _ => Socks5ReplyCode::ConnectionRefused,
        }
    }
}
