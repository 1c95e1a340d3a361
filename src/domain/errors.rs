use thiserror::Error;

/// Failures on the way to the proxy resolver. The service API is
/// fire-and-forget; these surface in the logs, not in its return values.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("connection to proxy resolver failed: {0}")]
    ConnectFailed(String),

    /// A connect attempt was cancelled. Teardown, not a fault; logged at
    /// debug where `ConnectFailed` warns.
    #[error("connect attempt was cancelled")]
    Cancelled,

    /// The link is up but the remote service is not present on the bus.
    #[error("proxy resolver is not reachable")]
    NotReachable,

    /// The remote service processed the request and refused it.
    #[error("proxy resolver rejected the request: {0}")]
    Rejected(String),

    #[error("bus transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
