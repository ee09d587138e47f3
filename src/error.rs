//! Unified error type.

use crate::config::ConfigError;
use crate::store::StoreError;

/// Failures that stop the service from starting or serving.
///
/// Request-level failures (400, 404, …) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup and infrastructure faults: bad configuration, an unreachable
/// store, a port that cannot be bound.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}
