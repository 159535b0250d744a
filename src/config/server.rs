//! Server configuration types
//!
//! Defines the main configuration structures for the Socksd server.

use super::TcpConfig;
use crate::socks::{AuthPolicy, StaticCredentials};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default listen address
fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default upstream connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Authentication method required from every client
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethodConfig {
    /// No authentication
    #[default]
    None,
    /// Username/password authentication
    Password,
}

/// One username/password pair
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:1080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Required authentication method
    #[serde(default)]
    pub auth_method: AuthMethodConfig,

    /// Upstream connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Accepted users when `auth_method = "password"`
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            auth_method: AuthMethodConfig::default(),
            connect_timeout: default_connect_timeout(),
            users: Vec::new(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address
    pub fn listen_socket_addr(&self) -> Result<SocketAddr, String> {
        self.listen_addr
            .parse()
            .map_err(|e| format!("Invalid listen address {:?}: {}", self.listen_addr, e))
    }

    /// Upstream connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.listen_socket_addr()?;

        if self.auth_method == AuthMethodConfig::Password && self.users.is_empty() {
            return Err("Password authentication required but no users configured".to_string());
        }
        Ok(())
    }

    /// Build the authentication policy handed to the negotiator
    pub fn auth_policy(&self) -> AuthPolicy {
        match self.auth_method {
            AuthMethodConfig::None => AuthPolicy::NoAuth,
            AuthMethodConfig::Password => {
                let credentials: StaticCredentials = self
                    .users
                    .iter()
                    .map(|user| (user.username.clone(), user.password.clone()))
                    .collect();
                AuthPolicy::Password(Arc::new(credentials))
            }
        }
    }
}
