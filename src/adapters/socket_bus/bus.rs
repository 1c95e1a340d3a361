use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UnixStream;
use tracing::debug;

use super::client::SocketResolverClient;
use crate::domain::{Result, SyncError};
use crate::ports::{ResolverBusPort, ResolverClient};

/// Reaches the proxy resolver over a Unix-domain socket. The first dial
/// happens on `connect` and its failure fails the connect; from then on
/// the client re-dials on its own whenever the resolver restarts.
pub struct SocketBus {
    path: PathBuf,
}

impl SocketBus {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResolverBusPort for SocketBus {
    async fn connect(&self) -> Result<Arc<dyn ResolverClient>> {
        let stream = UnixStream::connect(&self.path).await.map_err(|err| {
            SyncError::ConnectFailed(format!("{}: {}", self.path.display(), err))
        })?;
        debug!("connected to the resolver socket at {}", self.path.display());
        Ok(Arc::new(SocketResolverClient::start(
            self.path.clone(),
            stream,
        )))
    }
}
