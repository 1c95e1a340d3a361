use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tracing::{debug, warn};

use super::SyncError;
use crate::ports::{PresenceEvent, ResolverBusPort, ResolverClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Link {
    state: ConnectionState,
    client: Option<Arc<dyn ResolverClient>>,
}

/// Owns the link to the resolver bus and tracks whether the resolver can
/// currently be reached. Reachability flips are pushed to the owner as
/// booleans over an unbounded channel; `true` means queued work may flow.
///
/// The link outlives the resolver process. After a successful connect the
/// supervisor never re-dials; the transport keeps the link alive and the
/// presence watcher flips the state as the resolver comes and goes.
pub struct ConnectionSupervisor {
    bus: Arc<dyn ResolverBusPort>,
    link: Arc<RwLock<Link>>,
    notify: mpsc::UnboundedSender<bool>,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl ConnectionSupervisor {
    pub fn new(bus: Arc<dyn ResolverBusPort>, notify: mpsc::UnboundedSender<bool>) -> Self {
        Self {
            bus,
            link: Arc::new(RwLock::new(Link {
                state: ConnectionState::Disconnected,
                client: None,
            })),
            notify,
            cancel: Mutex::new(None),
        }
    }

    /// Start connecting to the bus. Idempotent: a second call while a
    /// connect is in flight, while connected, or while an established
    /// link is merely waiting for the resolver to return does nothing.
    pub async fn start(&self) {
        {
            let mut link = self.link.write().await;
            if link.state != ConnectionState::Disconnected || link.client.is_some() {
                return;
            }
            link.state = ConnectionState::Connecting;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self.cancel.lock().await = Some(cancel_tx);

        tokio::spawn(run_connect(
            self.bus.clone(),
            self.link.clone(),
            self.notify.clone(),
            cancel_rx,
        ));
    }

    /// Abort the in-flight connect attempt, if any. Calling this when no
    /// attempt is in flight, or after the attempt already finished, is a
    /// no-op rather than a fault.
    pub async fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            let _ = cancel.send(());
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.link.read().await.state
    }

    pub async fn is_reachable(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// The client for the resolver, available only while it is reachable.
    pub async fn client(&self) -> Option<Arc<dyn ResolverClient>> {
        let link = self.link.read().await;
        match link.state {
            ConnectionState::Connected => link.client.clone(),
            _ => None,
        }
    }

    /// Cancel any in-flight connect and drop the link. The presence
    /// watcher notices the dropped client and winds itself down.
    pub async fn shutdown(&self) {
        self.cancel().await;
        let mut link = self.link.write().await;
        link.client = None;
        link.state = ConnectionState::Disconnected;
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.get_mut().take() {
            let _ = cancel.send(());
        }
    }
}

async fn run_connect(
    bus: Arc<dyn ResolverBusPort>,
    link: Arc<RwLock<Link>>,
    notify: mpsc::UnboundedSender<bool>,
    cancel: oneshot::Receiver<()>,
) {
    let outcome = tokio::select! {
        outcome = bus.connect() => outcome,
        _ = cancel => Err(SyncError::Cancelled),
    };

    match outcome {
        Ok(client) => {
            let mut guard = link.write().await;
            if guard.state != ConnectionState::Connecting {
                debug!("discarding bus link established after teardown");
                return;
            }
            // Subscribe before probing so a presence flip between the two
            // is seen by the watcher instead of lost.
            let events = client.subscribe_presence();
            let present = client.is_present();
            guard.state = if present {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            };
            guard.client = Some(client);
            drop(guard);

            if present {
                debug!("bus link established, proxy resolver is present");
            } else {
                debug!("bus link established, proxy resolver is not present yet");
            }
            let _ = notify.send(present);

            tokio::spawn(watch_presence(link, notify, events));
        }
        Err(SyncError::Cancelled) => {
            debug!("bus connect attempt cancelled");
            link.write().await.state = ConnectionState::Disconnected;
        }
        Err(err) => {
            warn!("connecting to the proxy resolver bus failed: {}", err);
            link.write().await.state = ConnectionState::Disconnected;
        }
    }
}

async fn watch_presence(
    link: Arc<RwLock<Link>>,
    notify: mpsc::UnboundedSender<bool>,
    mut events: broadcast::Receiver<PresenceEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                warn!("missed {} presence events, probing the resolver directly", missed);
                let guard = link.read().await;
                match guard.client.as_ref() {
                    Some(client) if client.is_present() => PresenceEvent::Appeared,
                    Some(_) => PresenceEvent::Vanished,
                    None => break,
                }
            }
            Err(RecvError::Closed) => break,
        };

        let mut guard = link.write().await;
        if guard.client.is_none() {
            break;
        }
        let flipped = match event {
            PresenceEvent::Appeared => {
                let flipped = guard.state != ConnectionState::Connected;
                guard.state = ConnectionState::Connected;
                flipped
            }
            PresenceEvent::Vanished => {
                let flipped = guard.state != ConnectionState::Disconnected;
                guard.state = ConnectionState::Disconnected;
                flipped
            }
        };
        drop(guard);

        if !flipped {
            continue;
        }
        match event {
            PresenceEvent::Appeared => debug!("proxy resolver appeared on the bus"),
            PresenceEvent::Vanished => debug!("proxy resolver vanished from the bus"),
        }
        let reachable = event == PresenceEvent::Appeared;
        if notify.send(reachable).is_err() {
            break;
        }
    }
}
