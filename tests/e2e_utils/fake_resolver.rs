#![cfg(test)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;

static NEXT_SOCKET: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub payload: Option<Value>,
    pub handle: Option<String>,
}

/// A stand-in for the proxy resolver daemon, listening on a Unix socket
/// and speaking the newline-delimited JSON protocol. It can be stopped
/// and started again on the same path to act out resolver crashes; the
/// call log and the handle counter survive restarts.
pub struct FakeResolverDaemon {
    path: PathBuf,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    next_handle: Arc<AtomicUsize>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FakeResolverDaemon {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!(
            "pacsync-test-{}-{}.sock",
            std::process::id(),
            NEXT_SOCKET.fetch_add(1, Ordering::SeqCst)
        ));
        Self {
            path,
            calls: Arc::new(Mutex::new(Vec::new())),
            next_handle: Arc::new(AtomicUsize::new(1)),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let _ = std::fs::remove_file(&self.path);
        let listener = UnixListener::bind(&self.path)?;

        let calls = self.calls.clone();
        let next_handle = self.next_handle.clone();
        let tasks = self.tasks.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let conn = tokio::spawn(serve_connection(
                            stream,
                            calls.clone(),
                            next_handle.clone(),
                        ));
                        tasks.lock().unwrap().push(conn);
                    }
                    Err(_) => break,
                }
            }
        });
        self.tasks.lock().unwrap().push(accept_task);
        Ok(())
    }

    /// Kill the daemon: the listener goes away and every open connection
    /// is dropped, so clients see the socket close.
    pub async fn stop(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        let _ = std::fs::remove_file(&self.path);
    }

    pub fn socket_path(&self) -> &Path {
        &self.path
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `count` calls were recorded and return them.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<RecordedCall> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            if Instant::now() > deadline {
                panic!("expected {} calls, only saw {}", count, calls.len());
            }
            sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for FakeResolverDaemon {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn serve_connection(
    stream: UnixStream,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    next_handle: Arc<AtomicUsize>,
) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(frame) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        let id = frame["id"].as_u64().unwrap_or(0);
        let method = frame["method"].as_str().unwrap_or("").to_string();

        let response = match method.as_str() {
            "CreateProxyConfiguration" => {
                let n = next_handle.fetch_add(1, Ordering::SeqCst);
                let handle = format!("/org/pacrunner/config/{}", n);
                calls.lock().unwrap().push(RecordedCall {
                    method,
                    payload: frame.get("payload").cloned(),
                    handle: Some(handle.clone()),
                });
                json!({ "id": id, "result": handle })
            }
            "DestroyProxyConfiguration" => {
                calls.lock().unwrap().push(RecordedCall {
                    method,
                    payload: None,
                    handle: frame["handle"].as_str().map(str::to_string),
                });
                json!({ "id": id, "result": null })
            }
            other => json!({ "id": id, "error": format!("unknown method {}", other) }),
        };

        let mut out = response.to_string();
        out.push('\n');
        if write.write_all(out.as_bytes()).await.is_err() {
            break;
        }
    }
}
