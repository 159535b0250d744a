//! SOCKS5 authentication module
//!
//! Method negotiation messages and the negotiation phase itself.

mod password;

pub use password::{
    authenticate_password, PasswordAuthReply, PasswordAuthRequest, PasswordVerifier,
    StaticCredentials,
};

use super::consts::*;
use crate::error::Socks5Error;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse from SOCKS5 method byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::Password),
            _ => None,
        }
    }
}

/// The single method a server requires, with the verifier it needs
#[derive(Clone)]
pub enum AuthPolicy {
    /// Accept clients offering "no authentication"
    NoAuth,
    /// Require username/password checked by the given verifier
    Password(Arc<dyn PasswordVerifier>),
}

impl AuthPolicy {
    /// Method this policy selects
    pub fn method(&self) -> AuthMethod {
        match self {
            AuthPolicy::NoAuth => AuthMethod::None,
            AuthPolicy::Password(_) => AuthMethod::Password,
        }
    }
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPolicy::NoAuth => write!(f, "NoAuth"),
            AuthPolicy::Password(_) => write!(f, "Password(..)"),
        }
    }
}

/// Client method offer
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthNegotiation {
    /// Offered method bytes, in client order
    pub methods: Vec<u8>,
}

impl AuthNegotiation {
    /// Decode a method offer
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; 2];
        reader.read_exact(&mut header).await?;

        let version = header[0];
        let num_methods = header[1];

        if version != SOCKS5_VERSION {
            return Err(Socks5Error::VersionNotSupported(version));
        }

        let mut methods = vec![0u8; num_methods as usize];
        reader.read_exact(&mut methods).await?;

        Ok(AuthNegotiation { methods })
    }

    /// Encode a method offer
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        let count = u8::try_from(self.methods.len())
            .map_err(|_| Socks5Error::Malformed("more than 255 methods".to_string()))?;

        let mut buf = Vec::with_capacity(2 + self.methods.len());
        buf.push(SOCKS5_VERSION);
        buf.push(count);
        buf.extend_from_slice(&self.methods);

        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Whether the client offered the given method
    pub fn offers(&self, method: AuthMethod) -> bool {
        self.methods.contains(&method.to_byte())
    }
}

/// Server method selection
///
/// ```text
/// +----+--------+
/// |VER | METHOD |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSelection {
    /// Selected method byte, `0xFF` when nothing was acceptable
    pub method: u8,
}

impl AuthSelection {
    /// Selection of a concrete method
    pub fn selected(method: AuthMethod) -> Self {
        AuthSelection {
            method: method.to_byte(),
        }
    }

    /// The "no acceptable methods" selection
    pub fn not_acceptable() -> Self {
        AuthSelection {
            method: SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE,
        }
    }

    /// Decode a method selection
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await?;

        if buf[0] != SOCKS5_VERSION {
            return Err(Socks5Error::VersionNotSupported(buf[0]));
        }

        Ok(AuthSelection { method: buf[1] })
    }

    /// Encode a method selection
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&[SOCKS5_VERSION, self.method]).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Run the authentication phase
///
/// Selects the policy's method if the client offered it, otherwise replies
/// with `0xFF` and fails. With the password policy the RFC 1929 exchange
/// follows the selection.
pub async fn negotiate<S>(stream: &mut S, policy: &AuthPolicy) -> Result<AuthMethod, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let offer = AuthNegotiation::read_from(stream).await?;
    let method = policy.method();

    if !offer.offers(method) {
        warn!(
            "Client offered {:?}, required method {:?} not among them",
            offer.methods, method
        );
        AuthSelection::not_acceptable().write_to(stream).await?;
        return Err(Socks5Error::NoAcceptableMethod);
    }

    AuthSelection::selected(method).write_to(stream).await?;

    if let AuthPolicy::Password(verifier) = policy {
        authenticate_password(stream, verifier.as_ref()).await?;
    }

    debug!("Authentication completed with method: {:?}", method);

    Ok(method)
}
