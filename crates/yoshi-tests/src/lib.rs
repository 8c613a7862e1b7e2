//! Scriptable backend fakes for exercising yoshi sessions without Docker
//! or a Kubernetes cluster.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, stream};
use tokio::sync::mpsc;
use yoshi_core::{
    BackendVersion, ByteStream, COMPOSE_PROJECT_LABEL, ContainerBackend, ContainerProbe,
    ContainerRecord, Error, PodBackend, PodRecord, Result, SessionOptions,
};
use yoshi_tui::{HeadlessSurface, Session};

/// Something a fake backend was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Containers were listed.
    ListContainers,
    /// Pods were listed, in one namespace or all of them.
    ListPods(Option<String>),
    /// A log channel was requested for this key.
    Attach(String),
    /// The log channel for this key was dropped, opened or not.
    Released(String),
}

/// Shared, ordered record of backend calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Entry>>>);

impl Journal {
    /// An empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    pub fn record(&self, entry: Entry) {
        self.lock().push(entry);
    }

    /// Everything recorded so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    /// Index of the first matching entry.
    pub fn position(&self, entry: &Entry) -> Option<usize> {
        self.lock().iter().position(|e| e == entry)
    }

    /// Whether a matching entry was recorded.
    pub fn contains(&self, entry: &Entry) -> bool {
        self.position(entry).is_some()
    }

    /// Number of pod listings.
    pub fn pod_queries(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, Entry::ListPods(_)))
            .count()
    }
}

/// How a fake answers a log channel request.
#[derive(Debug)]
pub enum Script {
    /// Yield these chunks, then end.
    Chunks(Vec<Vec<u8>>),
    /// Never finish opening.
    Hang,
    /// Fail with [`Error::EntityVanished`].
    Vanished,
    /// Fail as unreachable.
    Unreachable,
    /// Open, then yield whatever is sent until the sender drops.
    Live(mpsc::UnboundedReceiver<Vec<u8>>),
    /// Open, yield these chunks, then fail with the error.
    FailAfter(Vec<Vec<u8>>, Error),
}

impl Script {
    /// Chunks from string slices.
    pub fn lines(chunks: &[&str]) -> Self {
        Self::Chunks(chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }

    /// A live script plus the sender feeding it.
    pub fn live() -> (Self, mpsc::UnboundedSender<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Live(rx), tx)
    }
}

/// Records [`Entry::Released`] when dropped.
struct ReleaseGuard {
    journal: Journal,
    key: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.journal.record(Entry::Released(self.key.clone()));
    }
}

/// Byte stream holding a release guard.
struct Guarded {
    inner: ByteStream,
    _guard: ReleaseGuard,
}

impl Stream for Guarded {
    type Item = Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[derive(Debug, Default)]
struct Scripts(Mutex<HashMap<String, Script>>);

impl Scripts {
    fn insert(&self, key: String, script: Script) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, script);
    }

    fn take(&self, key: &str) -> Script {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .unwrap_or(Script::Chunks(Vec::new()))
    }
}

async fn play(script: Script, journal: &Journal, key: &str, vanished: Error) -> Result<ByteStream> {
    journal.record(Entry::Attach(key.to_string()));
    let guard = ReleaseGuard {
        journal: journal.clone(),
        key: key.to_string(),
    };

    let inner: ByteStream = match script {
        Script::Hang => {
            let _guard = guard;
            return std::future::pending().await;
        }
        Script::Vanished => return Err(vanished),
        Script::Unreachable => return Err(Error::docker("connection refused")),
        Script::Chunks(chunks) => Box::pin(stream::iter(chunks.into_iter().map(Ok))),
        Script::FailAfter(chunks, error) => Box::pin(stream::iter(
            chunks.into_iter().map(Ok).chain(std::iter::once(Err(error))),
        )),
        Script::Live(rx) => Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok(chunk), rx))
        })),
    };

    Ok(Box::pin(Guarded {
        inner,
        _guard: guard,
    }))
}

/// In-memory container engine.
#[derive(Debug, Default)]
pub struct FakeDocker {
    journal: Journal,
    containers: Vec<ContainerRecord>,
    api_version: String,
    unreachable: bool,
    scripts: Scripts,
}

impl FakeDocker {
    /// An engine with no containers, recording into `journal`.
    #[must_use]
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            api_version: "1.45".into(),
            ..Self::default()
        }
    }

    /// Add a container named `/name`.
    #[must_use]
    pub fn with_container(mut self, id: &str, name: &str, state: &str) -> Self {
        self.containers.push(ContainerRecord {
            id: id.into(),
            names: vec![format!("/{name}")],
            state: state.into(),
            labels: HashMap::new(),
        });
        self
    }

    /// Add a container belonging to a Compose project.
    #[must_use]
    pub fn with_compose_container(mut self, id: &str, name: &str, project: &str) -> Self {
        self.containers.push(ContainerRecord {
            id: id.into(),
            names: vec![format!("/{name}")],
            state: "running".into(),
            labels: HashMap::from([(COMPOSE_PROJECT_LABEL.to_string(), project.to_string())]),
        });
        self
    }

    /// Fail every call as unreachable.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Script the attach for a container id.
    #[must_use]
    pub fn script(self, id: &str, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    fn check(&self) -> Result<()> {
        if self.unreachable {
            return Err(Error::docker("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerBackend for FakeDocker {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        self.journal.record(Entry::ListContainers);
        self.check()?;
        Ok(self.containers.clone())
    }

    async fn version(&self) -> Result<BackendVersion> {
        self.check()?;
        Ok(BackendVersion {
            api_version: self.api_version.clone(),
        })
    }

    async fn attach(&self, id: &str) -> Result<ByteStream> {
        let script = self.scripts.take(id);
        play(script, &self.journal, id, Error::EntityVanished(id.to_string())).await
    }
}

/// In-memory Kubernetes API server.
#[derive(Debug, Default)]
pub struct FakeKube {
    journal: Journal,
    pods: Vec<PodRecord>,
    failing: bool,
    scripts: Scripts,
}

impl FakeKube {
    /// A cluster with no pods, recording into `journal`.
    #[must_use]
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }

    /// Add a pod.
    #[must_use]
    pub fn with_pod(mut self, namespace: &str, name: &str, phase: &str) -> Self {
        self.pods.push(PodRecord {
            namespace: namespace.into(),
            name: name.into(),
            uid: format!("uid-{namespace}-{name}"),
            phase: Some(phase.into()),
        });
        self
    }

    /// Fail every listing.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Script the log follow for `namespace/name`.
    #[must_use]
    pub fn script(self, namespace: &str, name: &str, script: Script) -> Self {
        self.scripts.insert(format!("{namespace}/{name}"), script);
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(Error::kube("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl PodBackend for FakeKube {
    async fn list_all_pods(&self) -> Result<Vec<PodRecord>> {
        self.journal.record(Entry::ListPods(None));
        self.check()?;
        Ok(self.pods.clone())
    }

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        self.journal.record(Entry::ListPods(Some(namespace.to_string())));
        self.check()?;
        Ok(self
            .pods
            .iter()
            .filter(|pod| pod.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn follow_logs(&self, namespace: &str, name: &str) -> Result<ByteStream> {
        let key = format!("{namespace}/{name}");
        let script = self.scripts.take(&key);
        play(script, &self.journal, &key, Error::EntityVanished(key.clone())).await
    }
}

/// Probe that never finds container markers.
pub fn host_probe() -> ContainerProbe {
    ContainerProbe::with_paths("/nonexistent/yoshi/.dockerenv", "/nonexistent/yoshi/cgroup")
}

/// A headless session over the given fakes.
pub fn session(
    docker: FakeDocker,
    kube: Option<FakeKube>,
    options: SessionOptions,
) -> Session<HeadlessSurface> {
    session_on(HeadlessSurface::new(120, 30), docker, kube, options)
}

/// A session over the given fakes, drawing on `surface`.
pub fn session_on(
    surface: HeadlessSurface,
    docker: FakeDocker,
    kube: Option<FakeKube>,
    options: SessionOptions,
) -> Session<HeadlessSurface> {
    let pods = kube.map(|k| {
        let pods: Arc<dyn PodBackend> = Arc::new(k);
        pods
    });
    Session::new(surface, Arc::new(docker), pods, options).with_probe(host_probe())
}

/// Apply stream events until `done` holds.
///
/// # Errors
///
/// Returns an error if applying an event fails or `done` does not hold
/// within five seconds.
pub async fn pump_until(
    session: &mut Session<HeadlessSurface>,
    done: impl Fn(&Session<HeadlessSurface>) -> bool,
) -> Result<()> {
    let wait = async {
        while !done(&*session) {
            if !session.process_stream_event().await? {
                break;
            }
        }
        Ok::<(), Error>(())
    };

    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .map_err(|_| Error::Precondition("timed out waiting for stream events".into()))?
}

/// Content of the log pane.
pub fn log_content(session: &Session<HeadlessSurface>) -> String {
    session
        .dashboard()
        .log()
        .map(yoshi_tui::ui::TextPane::content)
        .unwrap_or_default()
}

/// Rows of the selection list.
pub fn list_items(session: &Session<HeadlessSurface>) -> Vec<String> {
    session
        .dashboard()
        .list()
        .map(|list| list.items().to_vec())
        .unwrap_or_default()
}
