//! Log stream management.
//!
//! At most one stream is live at a time. Each stream runs in its own task
//! bound to a cancellation token; `close` cancels that token and waits for
//! the task to finish before any other stream may be opened. Events are
//! tagged with the stream id so late events from a closed stream can be
//! recognised and dropped.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use yoshi_core::{ByteStream, ContainerBackend, Error, LogSource, PodBackend, Result};

/// Identity of one opened stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of the stream slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing was ever opened.
    #[default]
    Idle,
    /// Backend open call in flight.
    Opening,
    /// Bytes are flowing.
    Streaming,
    /// The last stream was closed or ended.
    Closed,
}

/// Raw event emitted by a stream task.
#[derive(Debug)]
pub struct StreamEvent {
    /// Stream that produced the event.
    pub id: StreamId,
    /// What happened.
    pub kind: StreamEventKind,
}

/// Kinds of [`StreamEvent`].
#[derive(Debug)]
pub enum StreamEventKind {
    /// The backend channel is established.
    Opened,
    /// A chunk of log bytes.
    Chunk(Vec<u8>),
    /// Opening or reading failed.
    Failed(Error),
    /// The backend closed the channel.
    Ended,
}

/// An event from the live stream, ready for the UI.
#[derive(Debug)]
pub enum StreamUpdate {
    /// The stream for this source is now live.
    Opened(LogSource),
    /// Bytes to append to the log pane.
    Bytes(Vec<u8>),
    /// The stream could not be opened.
    OpenFailed(LogSource, Error),
    /// The stream ended, optionally with a read error.
    Ended(LogSource, Option<Error>),
}

struct ActiveStream {
    id: StreamId,
    source: LogSource,
    state: StreamState,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the single live log stream.
pub struct StreamManager {
    containers: Arc<dyn ContainerBackend>,
    pods: Option<Arc<dyn PodBackend>>,
    active: Option<ActiveStream>,
    released: StreamState,
    next_id: u64,
    tx: mpsc::UnboundedSender<StreamEvent>,
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl StreamManager {
    /// Create a manager over the given backends.
    pub fn new(containers: Arc<dyn ContainerBackend>, pods: Option<Arc<dyn PodBackend>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            containers,
            pods,
            active: None,
            released: StreamState::Idle,
            next_id: 0,
            tx,
            rx,
        }
    }

    /// Close any live stream, then start opening one for `source`.
    pub async fn open(&mut self, source: LogSource) -> StreamId {
        self.close().await;

        self.next_id += 1;
        let id = StreamId(self.next_id);
        let cancel = CancellationToken::new();

        tracing::info!(stream = %id, source = %source.label(), "opening log stream");

        let task = tokio::spawn(pump(
            id,
            source.clone(),
            Arc::clone(&self.containers),
            self.pods.clone(),
            self.tx.clone(),
            cancel.clone(),
        ));

        self.active = Some(ActiveStream {
            id,
            source,
            state: StreamState::Opening,
            cancel,
            task,
        });
        id
    }

    /// Close the live stream and wait for its task to finish.
    ///
    /// Closing with nothing open is a no-op.
    pub async fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.cancel.cancel();
        if let Err(e) = active.task.await {
            tracing::warn!(stream = %active.id, error = %e, "log stream task did not shut down cleanly");
        }
        self.released = StreamState::Closed;

        tracing::info!(stream = %active.id, source = %active.source.label(), "closed log stream");
    }

    /// Current state of the stream slot.
    pub fn state(&self) -> StreamState {
        self.active.as_ref().map_or(self.released, |a| a.state)
    }

    /// Id of the live stream, if any.
    pub fn active_id(&self) -> Option<StreamId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Source of the live stream, if any.
    pub fn active_source(&self) -> Option<&LogSource> {
        self.active.as_ref().map(|a| &a.source)
    }

    /// Wait for the next raw event from any stream task.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Apply a raw event; events from streams other than the live one are dropped.
    pub fn accept(&mut self, event: StreamEvent) -> Option<StreamUpdate> {
        let Some(active) = self.active.as_mut().filter(|a| a.id == event.id) else {
            tracing::trace!(stream = %event.id, "dropping event from a closed stream");
            return None;
        };

        match event.kind {
            StreamEventKind::Opened => {
                active.state = StreamState::Streaming;
                tracing::debug!(stream = %active.id, "log stream established");
                Some(StreamUpdate::Opened(active.source.clone()))
            }
            StreamEventKind::Chunk(bytes) => Some(StreamUpdate::Bytes(bytes)),
            StreamEventKind::Failed(error) => {
                let opened = active.state == StreamState::Streaming;
                let source = self.release()?;
                tracing::warn!(source = %source.label(), error = %error, "log stream failed");
                Some(if opened {
                    StreamUpdate::Ended(source, Some(error))
                } else {
                    StreamUpdate::OpenFailed(source, error)
                })
            }
            StreamEventKind::Ended => {
                let source = self.release()?;
                tracing::info!(source = %source.label(), "log stream ended by backend");
                Some(StreamUpdate::Ended(source, None))
            }
        }
    }

    /// Free the slot after its task finished on its own.
    fn release(&mut self) -> Option<LogSource> {
        let active = self.active.take()?;
        self.released = StreamState::Closed;
        Some(active.source)
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

async fn pump(
    id: StreamId,
    source: LogSource,
    containers: Arc<dyn ContainerBackend>,
    pods: Option<Arc<dyn PodBackend>>,
    tx: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
) {
    let send = |kind| tx.send(StreamEvent { id, kind }).is_ok();

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = open_channel(&source, containers.as_ref(), pods.as_deref()) => result,
    };

    let mut channel = match opened {
        Ok(channel) => channel,
        Err(e) => {
            send(StreamEventKind::Failed(e));
            return;
        }
    };

    if !send(StreamEventKind::Opened) {
        return;
    }

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = channel.next() => next,
        };

        let (kind, last) = match next {
            Some(Ok(bytes)) => (StreamEventKind::Chunk(bytes), false),
            Some(Err(e)) => (StreamEventKind::Failed(e), true),
            None => (StreamEventKind::Ended, true),
        };

        if !send(kind) || last {
            return;
        }
    }
}

async fn open_channel(
    source: &LogSource,
    containers: &dyn ContainerBackend,
    pods: Option<&dyn PodBackend>,
) -> Result<ByteStream> {
    match source {
        LogSource::Container(container) => containers.attach(&container.id).await,
        LogSource::Pod(pod) => match pods {
            Some(backend) => backend.follow_logs(&pod.namespace, &pod.name).await,
            None => Err(Error::kube("kubernetes support is not enabled")),
        },
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use yoshi_core::{BackendVersion, ContainerRecord, ContainerSource};

    use super::*;

    struct Gone;

    #[async_trait]
    impl ContainerBackend for Gone {
        async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
            Ok(Vec::new())
        }

        async fn version(&self) -> Result<BackendVersion> {
            Ok(BackendVersion::default())
        }

        async fn attach(&self, id: &str) -> Result<ByteStream> {
            Err(Error::EntityVanished(id.to_string()))
        }
    }

    fn web() -> LogSource {
        LogSource::Container(ContainerSource {
            id: "abc".into(),
            name: "web".into(),
            state: "running".into(),
        })
    }

    #[tokio::test]
    async fn test_close_without_stream_is_noop() {
        let mut manager = StreamManager::new(Arc::new(Gone), None);
        assert_eq!(manager.state(), StreamState::Idle);

        manager.close().await;
        manager.close().await;
        assert_eq!(manager.state(), StreamState::Idle);
        assert!(manager.active_source().is_none());
    }

    #[tokio::test]
    async fn test_open_failure_frees_slot() {
        let mut manager = StreamManager::new(Arc::new(Gone), None);
        let id = manager.open(web()).await;
        assert_eq!(manager.state(), StreamState::Opening);
        assert_eq!(manager.active_id(), Some(id));

        let event = manager.recv().await.unwrap();
        match manager.accept(event) {
            Some(StreamUpdate::OpenFailed(source, Error::EntityVanished(_))) => {
                assert_eq!(source, web());
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(manager.state(), StreamState::Closed);
        assert!(manager.active_id().is_none());
    }

    #[tokio::test]
    async fn test_pod_without_backend_fails() {
        let mut manager = StreamManager::new(Arc::new(Gone), None);
        manager
            .open(LogSource::Pod(yoshi_core::PodSource {
                namespace: "prod".into(),
                name: "api-1".into(),
                uid: "u1".into(),
                phase: "Running".into(),
            }))
            .await;

        let event = manager.recv().await.unwrap();
        assert!(matches!(
            manager.accept(event),
            Some(StreamUpdate::OpenFailed(_, Error::BackendUnreachable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_events_from_other_streams_are_dropped() {
        let mut manager = StreamManager::new(Arc::new(Gone), None);
        let stale = StreamEvent {
            id: StreamId(42),
            kind: StreamEventKind::Chunk(b"late".to_vec()),
        };
        assert!(manager.accept(stale).is_none());
    }
}
