use crate::domain::{ConfigHandle, ConfigPayload, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The resolver registering on or leaving the bus. The link to the bus
/// outlives the resolver; these events track the resolver only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Appeared,
    Vanished,
}

/// Port for establishing a link to the bus the proxy resolver lives on.
#[async_trait]
pub trait ResolverBusPort: Send + Sync {
    /// Connect to the bus and return a client for the resolver.
    ///
    /// A successful connect means the link is up, not that the resolver
    /// is present. Callers check presence through the client.
    async fn connect(&self) -> Result<Arc<dyn ResolverClient>>;
}

/// Client for the proxy resolver's management interface.
#[async_trait]
pub trait ResolverClient: Send + Sync {
    /// Submit a proxy configuration and return the handle the resolver
    /// assigned to it.
    async fn create_config(&self, payload: &ConfigPayload) -> Result<ConfigHandle>;

    /// Revoke a previously submitted configuration.
    async fn destroy_config(&self, handle: &ConfigHandle) -> Result<()>;

    /// Whether the resolver is registered on the bus right now.
    fn is_present(&self) -> bool;

    /// Subscribe to presence changes. Events are delivered from the
    /// moment of subscription onward.
    fn subscribe_presence(&self) -> broadcast::Receiver<PresenceEvent>;
}
