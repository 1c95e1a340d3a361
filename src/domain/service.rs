use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::connection::ConnectionSupervisor;
use super::payload::build_payload;
use super::pending::PendingQueue;
use super::removal::RemovalRegistry;
use super::{ConfigPayload, Ipv4Settings, Ipv6Settings, ProxySettings};
use crate::ports::{ResolverBusPort, ResolverClient};

/// Synchronizes per-interface proxy configuration with the resolver.
///
/// `send` and `remove` are fire-and-forget: callers hand over the
/// configuration and move on, outcomes only show up in the logs. Queued
/// configurations are replayed whenever the resolver becomes reachable,
/// so it can start, crash, and restart without callers noticing.
pub struct ProxySyncService {
    inner: Arc<Inner>,
    reachability: Mutex<Option<mpsc::UnboundedReceiver<bool>>>,
}

struct Inner {
    supervisor: ConnectionSupervisor,
    queue: RwLock<PendingQueue>,
    registry: RwLock<RemovalRegistry>,
}

impl ProxySyncService {
    pub fn new(bus: Arc<dyn ResolverBusPort>) -> Self {
        let (notify, reachability) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                supervisor: ConnectionSupervisor::new(bus, notify),
                queue: RwLock::new(PendingQueue::new()),
                registry: RwLock::new(RemovalRegistry::new()),
            }),
            reachability: Mutex::new(Some(reachability)),
        }
    }

    /// Connect to the bus and begin replaying queued configurations each
    /// time the resolver becomes reachable. Idempotent.
    pub async fn start(&self) {
        if let Some(reachability) = self.reachability.lock().await.take() {
            tokio::spawn(run_replay_loop(Arc::downgrade(&self.inner), reachability));
        }
        self.inner.supervisor.start().await;
    }

    /// Queue the proxy configuration for an interface and deliver it right
    /// away when the resolver is reachable.
    pub async fn send(
        &self,
        interface: Option<&str>,
        proxy: &ProxySettings,
        ip4: Option<&Ipv4Settings>,
        ip6: Option<&Ipv6Settings>,
    ) {
        let payload = build_payload(interface, proxy, ip4, ip6);
        let id = self.inner.queue.write().await.push(payload.clone());

        let Some(client) = self.inner.supervisor.client().await else {
            return;
        };
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            deliver(&inner, client.as_ref(), id, &payload).await;
        });
    }

    /// Ask the resolver to drop the configuration it holds for an
    /// interface. Nothing happens when no delivery was ever confirmed for
    /// it or while the resolver is away; revocations are not queued.
    pub async fn remove(&self, interface: Option<&str>) {
        let handle = match self.inner.registry.read().await.lookup(interface) {
            Some(handle) => handle.clone(),
            None => return,
        };
        let Some(client) = self.inner.supervisor.client().await else {
            return;
        };
        tokio::spawn(async move {
            match client.destroy_config(&handle).await {
                Ok(()) => debug!("removed proxy config {} from the resolver", handle),
                Err(err) => {
                    debug!("could not remove proxy config {} from the resolver: {}", handle, err)
                }
            }
        });
    }

    pub async fn is_reachable(&self) -> bool {
        self.inner.supervisor.is_reachable().await
    }

    /// Cancel any in-flight connect, drop the link, and forget all queued
    /// and delivered configurations. In-flight deliveries finish on their
    /// own and notice the teardown when they report back.
    pub async fn stop(&self) {
        self.inner.supervisor.shutdown().await;
        self.inner.queue.write().await.clear();
        self.inner.registry.write().await.clear();
    }

    #[cfg(test)]
    async fn pending_count(&self) -> usize {
        self.inner.queue.read().await.len()
    }
}

async fn deliver(inner: &Weak<Inner>, client: &dyn ResolverClient, id: Uuid, payload: &ConfigPayload) {
    let interface = payload.interface_key();
    match client.create_config(payload).await {
        Ok(handle) => {
            let Some(inner) = inner.upgrade() else {
                debug!("proxy config accepted after teardown, dropping handle {}", handle);
                return;
            };
            inner.registry.write().await.record(interface, handle);
            inner.queue.write().await.confirm(id);
            debug!("proxy config sent to the resolver");
        }
        Err(err) => {
            debug!("sending proxy config to the resolver failed: {}", err);
        }
    }
}

async fn run_replay_loop(inner: Weak<Inner>, mut reachability: mpsc::UnboundedReceiver<bool>) {
    while let Some(reachable) = reachability.recv().await {
        if !reachable {
            continue;
        }
        let Some(strong) = inner.upgrade() else {
            break;
        };
        let Some(client) = strong.supervisor.client().await else {
            continue;
        };
        let entries = strong.queue.read().await.snapshot();
        if entries.is_empty() {
            continue;
        }
        debug!("resolver reachable, replaying {} queued proxy configurations", entries.len());
        for (id, payload) in entries {
            deliver(&inner, client.as_ref(), id, &payload).await;
        }
    }
}
