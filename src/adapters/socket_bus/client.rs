use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::wire::{self, Request, Response};
use crate::domain::{ConfigHandle, ConfigPayload, Result, SyncError};
use crate::ports::{PresenceEvent, ResolverClient};

const REDIAL_INTERVAL: Duration = Duration::from_millis(200);

/// Client half of the socket bus. Requests are correlated to responses by
/// id. A link task owns the read side and keeps re-dialling after the
/// resolver goes away, so one client survives any number of resolver
/// restarts.
pub struct SocketResolverClient {
    shared: Arc<Shared>,
    // Dropping this sender winds the link task down.
    _shutdown: oneshot::Sender<()>,
}

struct Shared {
    present: AtomicBool,
    next_id: AtomicU64,
    presence: broadcast::Sender<PresenceEvent>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>,
}

impl SocketResolverClient {
    /// Take ownership of a freshly dialled stream and keep the link to
    /// `path` alive from here on.
    pub(crate) fn start(path: PathBuf, stream: UnixStream) -> Self {
        let (presence, _) = broadcast::channel(16);
        let (read, write) = stream.into_split();
        let shared = Arc::new(Shared {
            present: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            presence,
            writer: Mutex::new(Some(write)),
            pending: Mutex::new(HashMap::new()),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_link(shared.clone(), path, read, shutdown_rx));
        Self {
            shared,
            _shutdown: shutdown_tx,
        }
    }

    async fn call(&self, method: &str, payload: Option<Value>, handle: Option<&str>) -> Result<Value> {
        if !self.shared.present.load(Ordering::SeqCst) {
            return Err(SyncError::NotReachable);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let mut frame = serde_json::to_string(&Request {
            id,
            method,
            payload,
            handle,
        })
        .map_err(|err| SyncError::Transport(err.to_string()))?;
        frame.push('\n');

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(id, tx);

        {
            let mut writer = self.shared.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                self.shared.pending.lock().await.remove(&id);
                return Err(SyncError::NotReachable);
            };
            if let Err(err) = writer.write_all(frame.as_bytes()).await {
                self.shared.pending.lock().await.remove(&id);
                return Err(SyncError::Transport(err.to_string()));
            }
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SyncError::Transport(
                "link closed before the reply arrived".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ResolverClient for SocketResolverClient {
    async fn create_config(&self, payload: &ConfigPayload) -> Result<ConfigHandle> {
        let result = self
            .call(wire::CREATE_METHOD, Some(wire::payload_to_json(payload)), None)
            .await?;
        match result {
            Value::String(handle) => Ok(ConfigHandle::new(handle)),
            other => Err(SyncError::Transport(format!(
                "expected a handle string, got {}",
                other
            ))),
        }
    }

    async fn destroy_config(&self, handle: &ConfigHandle) -> Result<()> {
        self.call(wire::DESTROY_METHOD, None, Some(handle.as_str()))
            .await?;
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.shared.present.load(Ordering::SeqCst)
    }

    fn subscribe_presence(&self) -> broadcast::Receiver<PresenceEvent> {
        self.shared.presence.subscribe()
    }
}

async fn run_link(
    shared: Arc<Shared>,
    path: PathBuf,
    first: OwnedReadHalf,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut reader = Some(first);
    loop {
        let read = match reader.take() {
            Some(read) => read,
            None => {
                let stream = tokio::select! {
                    stream = redial(&path) => stream,
                    _ = &mut shutdown => break,
                };
                let (read, write) = stream.into_split();
                *shared.writer.lock().await = Some(write);
                shared.present.store(true, Ordering::SeqCst);
                debug!("resolver socket reconnected at {}", path.display());
                let _ = shared.presence.send(PresenceEvent::Appeared);
                read
            }
        };

        tokio::select! {
            _ = read_frames(&shared, read) => {}
            _ = &mut shutdown => break,
        }

        // The resolver side closed. Fail whatever is in flight and tell
        // subscribers before dialling again.
        shared.present.store(false, Ordering::SeqCst);
        *shared.writer.lock().await = None;
        fail_pending(&shared, "link to the resolver was lost").await;
        debug!("resolver socket closed, re-dialling in the background");
        let _ = shared.presence.send(PresenceEvent::Vanished);
    }
}

async fn redial(path: &Path) -> UnixStream {
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => return stream,
            Err(_) => sleep(REDIAL_INTERVAL).await,
        }
    }
}

async fn read_frames(shared: &Shared, read: OwnedReadHalf) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => dispatch_response(shared, &line).await,
            Ok(None) => break,
            Err(err) => {
                warn!("reading from the resolver socket failed: {}", err);
                break;
            }
        }
    }
}

async fn dispatch_response(shared: &Shared, line: &str) {
    let response: Response = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(err) => {
            warn!("discarding an undecodable frame from the resolver: {}", err);
            return;
        }
    };
    let Some(tx) = shared.pending.lock().await.remove(&response.id) else {
        // A reply to a request we already gave up on.
        return;
    };
    let outcome = match response.error {
        Some(error) => Err(SyncError::Rejected(error)),
        None => Ok(response.result.unwrap_or(Value::Null)),
    };
    let _ = tx.send(outcome);
}

async fn fail_pending(shared: &Shared, reason: &str) {
    let mut pending = shared.pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(SyncError::Transport(reason.to_string())));
    }
}
