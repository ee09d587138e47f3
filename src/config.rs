//! Process configuration read from the environment.
//!
//! | Variable | Required | Meaning |
//! |---|---|---|
//! | `PRODUCTS_STORE_URL` | yes | `memory://` or `redis://host[:port][/db]` (`rediss://` for TLS) |
//! | `PRODUCTS_LISTEN_ADDR` | no | socket address to bind, default `0.0.0.0:3001` |
//! | `PRODUCTS_MAX_BODY_BYTES` | no | largest accepted request body, default 1 MiB |
//!
//! Configuration is resolved once, before the server binds. A missing or
//! unusable value is a startup failure, never a request-time one.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

pub const STORE_URL_VAR: &str = "PRODUCTS_STORE_URL";
pub const LISTEN_ADDR_VAR: &str = "PRODUCTS_LISTEN_ADDR";
pub const MAX_BODY_BYTES_VAR: &str = "PRODUCTS_MAX_BODY_BYTES";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    Missing(&'static str),

    #[error("unsupported store url `{0}`: expected memory:// or redis://")]
    UnsupportedStore(String),

    #[error("`{var}` is not a socket address: `{value}`")]
    ListenAddr {
        var: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("`{var}` is not a byte count: `{value}`")]
    MaxBodyBytes {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Which backend to connect to.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreUrl {
    Memory,
    Redis(String),
}

impl FromStr for StoreUrl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "memory" || s == "memory://" {
            Ok(Self::Memory)
        } else if s.starts_with("redis://") || s.starts_with("rediss://") {
            Ok(Self::Redis(s.to_owned()))
        } else {
            Err(ConfigError::UnsupportedStore(s.to_owned()))
        }
    }
}

/// Redis urls may carry a password; only the scheme is ever printed.
impl fmt::Debug for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory://"),
            Self::Redis(url) => {
                let scheme = url.split_once("://").map_or("redis", |(s, _)| s);
                write!(f, "{scheme}://…")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub store_url: StoreUrl,
    pub max_body_bytes: usize,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_url: StoreUrl = get(STORE_URL_VAR)
            .ok_or(ConfigError::Missing(STORE_URL_VAR))?
            .parse()?;

        let addr = get(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = addr.trim().parse::<SocketAddr>().map_err(|source| ConfigError::ListenAddr {
            var: LISTEN_ADDR_VAR,
            value: addr.clone(),
            source,
        })?;

        let max_body_bytes = match get(MAX_BODY_BYTES_VAR) {
            None => DEFAULT_MAX_BODY_BYTES,
            Some(value) => value.trim().parse().map_err(|source| ConfigError::MaxBodyBytes {
                var: MAX_BODY_BYTES_VAR,
                value: value.clone(),
                source,
            })?,
        };

        Ok(Self { listen_addr, store_url, max_body_bytes })
    }
}
