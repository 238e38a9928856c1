//! Line-delimited JSON framing between the unprivileged bridge and the
//! privileged endpoint. Each request carries an id; replies may arrive in any
//! order and are matched back to the waiting caller by that id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

use crate::db::LocalBridge;
use crate::db::endpoint::SqliteEndpoint;
use crate::db::wire::{BridgeOutput, BridgeRequest, Statement};
use crate::error::{DbError, DbResult};

type Outcome = Result<Vec<BridgeOutput>, String>;
type PendingMap = HashMap<u64, oneshot::Sender<Outcome>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Serialize, Deserialize)]
struct RequestFrame {
    id: u64,
    request: BridgeRequest,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReplyFrame {
    id: u64,
    outcome: Outcome,
}

/// Bridge that speaks to an endpoint over any byte stream.
pub struct StreamBridge {
    writer: tokio::sync::Mutex<BoxedWriter>,
    pending: Arc<Mutex<PendingMap>>,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for StreamBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBridge")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl StreamBridge {
    /// ## Summary
    /// Wraps a connected stream and starts the reply reader.
    ///
    /// ## Side Effects
    /// Spawns a task that reads replies until the stream closes.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let pending: Arc<Mutex<PendingMap>> = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(read_replies(reader, Arc::clone(&pending), Arc::clone(&closed)));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            closed,
        }
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    async fn send(&self, request: BridgeRequest) -> DbResult<Vec<BridgeOutput>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::BridgeClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        // The reader drains pending senders after raising the flag.
        if self.closed.load(Ordering::Acquire) {
            self.forget(id);
            return Err(DbError::BridgeClosed);
        }

        let mut line = serde_json::to_vec(&RequestFrame { id, request })?;
        line.push(b'\n');

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&line).await {
                Ok(()) => writer.flush().await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = written {
            self.forget(id);
            return Err(err.into());
        }

        match rx.await {
            Ok(Ok(outputs)) => Ok(outputs),
            Ok(Err(message)) => Err(DbError::EndpointError(message)),
            Err(_closed) => Err(DbError::BridgeClosed),
        }
    }
}

#[async_trait]
impl LocalBridge for StreamBridge {
    async fn run(&self, statement: Statement) -> DbResult<BridgeOutput> {
        let outputs = self.send(BridgeRequest::Run(statement)).await?;
        outputs
            .into_iter()
            .next()
            .ok_or_else(|| DbError::EndpointError("endpoint returned no output".to_string()))
    }

    async fn run_atomic(&self, statements: Vec<Statement>) -> DbResult<Vec<BridgeOutput>> {
        if statements.is_empty() {
            return Ok(Vec::new());
        }
        self.send(BridgeRequest::Atomic(statements)).await
    }
}

async fn read_replies<R>(reader: R, pending: Arc<Mutex<PendingMap>>, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<ReplyFrame>(&line) {
                Ok(frame) => {
                    let waiter = pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&frame.id);
                    match waiter {
                        Some(waiter) => {
                            if waiter.send(frame.outcome).is_err() {
                                tracing::debug!(id = frame.id, "Caller went away before reply");
                            }
                        }
                        None => tracing::warn!(id = frame.id, "Reply for unknown request"),
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Discarding malformed reply frame"),
            },
            Ok(None) => break,
            Err(err) => {
                tracing::error!(error = %err, "Local store bridge read failed");
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    let orphaned = std::mem::take(&mut *pending.lock().unwrap_or_else(PoisonError::into_inner));
    tracing::debug!(orphaned = orphaned.len(), "Local store bridge closed");
}

/// ## Summary
/// Serves bridge requests from `stream` until it closes. Requests are handled
/// one at a time in arrival order.
///
/// ## Errors
/// Returns an error if reading from or writing to the stream fails.
pub async fn serve_endpoint<S>(stream: S, endpoint: SqliteEndpoint) -> DbResult<()>
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let frame = match serde_json::from_str::<RequestFrame>(&line) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "Discarding malformed request frame");
                continue;
            }
        };

        let outcome = endpoint
            .handle(frame.request)
            .await
            .map_err(|err| err.to_string());
        if let Err(message) = &outcome {
            tracing::debug!(id = frame.id, error = %message, "Statement failed");
        }

        let mut reply = serde_json::to_vec(&ReplyFrame {
            id: frame.id,
            outcome,
        })?;
        reply.push(b'\n');
        writer.write_all(&reply).await?;
        writer.flush().await?;
    }

    tracing::debug!("Local store endpoint input closed");
    Ok(())
}
