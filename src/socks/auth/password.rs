//! Username/password authentication handler
//!
//! Implements RFC 1929 username/password authentication for SOCKS5.

use crate::error::Socks5Error;
use crate::socks::consts::{
    SOCKS5_AUTH_STATUS_FAILURE, SOCKS5_AUTH_STATUS_SUCCESS, SOCKS5_AUTH_VERSION,
};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Credential check shared by every connection task
pub trait PasswordVerifier: Send + Sync {
    /// Return true when the pair is accepted
    fn verify(&self, username: &str, password: &str) -> bool;
}

impl<F> PasswordVerifier for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn verify(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

/// Fixed user table
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, replacing any previous password
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Number of configured users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<U, P> FromIterator<(U, P)> for StaticCredentials
where
    U: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        StaticCredentials {
            users: iter
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }
}

impl PasswordVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

/// Client credentials
///
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 0 to 255 |  1   | 0 to 255 |
/// +----+------+----------+------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordAuthRequest {
    /// Username bytes, possibly empty
    pub username: Vec<u8>,
    /// Password bytes, possibly empty
    pub password: Vec<u8>,
}

impl PasswordAuthRequest {
    /// Create a request from string credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        PasswordAuthRequest {
            username: username.into().into_bytes(),
            password: password.into().into_bytes(),
        }
    }

    /// Credentials as text, or `None` if either field is not UTF-8
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = std::str::from_utf8(&self.username).ok()?;
        let password = std::str::from_utf8(&self.password).ok()?;
        Some((username, password))
    }

    /// Decode a credentials message
    ///
    /// Both fields are kept as raw bytes.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; 2];
        reader.read_exact(&mut header).await?;

        let version = header[0];
        let username_len = header[1] as usize;

        if version != SOCKS5_AUTH_VERSION {
            return Err(Socks5Error::MethodVersionNotSupported(version));
        }

        // Username followed by the password length byte
        let mut username = vec![0u8; username_len + 1];
        reader.read_exact(&mut username).await?;
        let password_len = username.pop().unwrap_or_default() as usize;

        let mut password = vec![0u8; password_len];
        reader.read_exact(&mut password).await?;

        Ok(PasswordAuthRequest { username, password })
    }

    /// Encode a credentials message
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        let username_len = u8::try_from(self.username.len())
            .map_err(|_| Socks5Error::Malformed("username longer than 255 bytes".to_string()))?;
        let password_len = u8::try_from(self.password.len())
            .map_err(|_| Socks5Error::Malformed("password longer than 255 bytes".to_string()))?;

        let mut buf = Vec::with_capacity(3 + self.username.len() + self.password.len());
        buf.push(SOCKS5_AUTH_VERSION);
        buf.push(username_len);
        buf.extend_from_slice(&self.username);
        buf.push(password_len);
        buf.extend_from_slice(&self.password);

        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Server verdict
///
/// ```text
/// +----+--------+
/// |VER | STATUS |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordAuthReply {
    /// Whether the credentials were accepted
    pub success: bool,
}

impl PasswordAuthReply {
    /// Status byte on the wire
    pub fn status(&self) -> u8 {
        if self.success {
            SOCKS5_AUTH_STATUS_SUCCESS
        } else {
            SOCKS5_AUTH_STATUS_FAILURE
        }
    }

    /// Decode a verdict; any non-zero status is a failure
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await?;

        if buf[0] != SOCKS5_AUTH_VERSION {
            return Err(Socks5Error::MethodVersionNotSupported(buf[0]));
        }

        Ok(PasswordAuthReply {
            success: buf[1] == SOCKS5_AUTH_STATUS_SUCCESS,
        })
    }

    /// Encode a verdict
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Socks5Error>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&[SOCKS5_AUTH_VERSION, self.status()]).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Run the username/password exchange
///
/// The verdict is always written before returning. A rejected pair fails
/// the session; there is no second attempt on the same connection.
/// Credentials that are not UTF-8 never match and are rejected without
/// consulting the verifier.
pub async fn authenticate_password<S, V>(stream: &mut S, verifier: &V) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    V: PasswordVerifier + ?Sized,
{
    let request = PasswordAuthRequest::read_from(stream).await?;
    let success = request
        .credentials()
        .is_some_and(|(username, password)| verifier.verify(username, password));

    PasswordAuthReply { success }.write_to(stream).await?;

    let username = String::from_utf8_lossy(&request.username);
    if success {
        tracing::debug!("Authentication successful for user: {}", username);
        Ok(())
    } else {
        tracing::warn!("Authentication failed for user: {}", username);
        Err(Socks5Error::AuthenticationFailed)
    }
}
