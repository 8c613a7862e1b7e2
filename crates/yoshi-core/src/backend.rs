//! Capability traits over the container and pod backends.
//!
//! The session never talks to a concrete client; it only sees these
//! narrow interfaces, which keeps discovery and streaming testable with
//! fakes.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::Result;

/// A live channel of raw log bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// One container as listed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container id.
    pub id: String,
    /// Engine names, each usually prefixed with `/`.
    pub names: Vec<String>,
    /// Runtime state.
    pub state: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
}

/// One pod as listed by the API server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodRecord {
    /// Namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Pod UID.
    pub uid: String,
    /// Pod phase, if reported.
    pub phase: Option<String>,
}

/// Version information reported by the container engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendVersion {
    /// Engine API version (e.g. "1.45").
    pub api_version: String,
}

/// Container engine operations the session depends on.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// List running containers.
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>>;

    /// Query the engine version.
    async fn version(&self) -> Result<BackendVersion>;

    /// Attach to a container's stdout over a hijacked stream.
    async fn attach(&self, id: &str) -> Result<ByteStream>;
}

/// Kubernetes operations the session depends on.
#[async_trait]
pub trait PodBackend: Send + Sync {
    /// List pods across all namespaces.
    async fn list_all_pods(&self) -> Result<Vec<PodRecord>>;

    /// List pods in one namespace.
    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<PodRecord>>;

    /// Follow the logs of one pod.
    async fn follow_logs(&self, namespace: &str, name: &str) -> Result<ByteStream>;
}
