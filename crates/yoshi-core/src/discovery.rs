//! Entity discovery across the container and pod backends.

use std::sync::Arc;

use crate::{
    ContainerBackend, ContainerRecord, ContainerSource, LogSource, PodBackend, PodRecord,
    PodSource, Result, SessionOptions,
};

/// Label Docker Compose puts on every container it manages.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// One discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Containers first, then pods, each in backend order.
    pub sources: Vec<LogSource>,
    /// Number of containers in `sources`.
    pub container_count: usize,
    /// Number of pods, or `None` when pods were not listed.
    pub pod_count: Option<usize>,
}

impl Snapshot {
    /// Label for the selection list.
    pub fn list_label(&self) -> String {
        match self.pod_count {
            Some(pods) => format!("Containers [{}] / Pods [{pods}]", self.container_count),
            None => format!("Containers [{}]", self.container_count),
        }
    }
}

/// Enumerates log sources from every enabled backend.
pub struct Discovery {
    containers: Arc<dyn ContainerBackend>,
    pods: Option<Arc<dyn PodBackend>>,
    options: SessionOptions,
}

impl Discovery {
    /// Create a discovery over the given backends.
    ///
    /// `pods` should only be set when Kubernetes support was enabled.
    pub fn new(
        containers: Arc<dyn ContainerBackend>,
        pods: Option<Arc<dyn PodBackend>>,
        options: SessionOptions,
    ) -> Self {
        Self {
            containers,
            pods,
            options,
        }
    }

    /// Query both backends.
    ///
    /// Container backend failures are returned; pod backend failures are
    /// logged and yield no pods.
    pub async fn discover(&self) -> Result<Snapshot> {
        let records = self.containers.list_containers().await?;
        let mut sources: Vec<LogSource> = records
            .into_iter()
            .filter(|record| !(self.options.exclude_compose && is_compose(record)))
            .map(container_source)
            .filter(|source| self.options.allows_name(&source.name))
            .map(LogSource::Container)
            .collect();
        let container_count = sources.len();

        let pods = self.discover_pods().await;
        let pod_count = pods.as_ref().map(Vec::len);
        sources.extend(pods.into_iter().flatten().map(LogSource::Pod));

        tracing::debug!(containers = container_count, pods = ?pod_count, "discovery finished");

        Ok(Snapshot {
            sources,
            container_count,
            pod_count,
        })
    }

    async fn discover_pods(&self) -> Option<Vec<PodSource>> {
        let backend = self.pods.as_ref()?;
        let namespace = self.options.kube_query()?;

        let result = match namespace {
            Some(ns) => backend.list_namespaced_pods(ns).await,
            None => backend.list_all_pods().await,
        };

        match result {
            Ok(records) => Some(records.into_iter().map(pod_source).collect()),
            Err(e) => {
                tracing::warn!(namespace = ?namespace, error = %e, "pod listing failed, continuing without pods");
                None
            }
        }
    }
}

fn is_compose(record: &ContainerRecord) -> bool {
    record.labels.contains_key(COMPOSE_PROJECT_LABEL)
}

fn container_source(record: ContainerRecord) -> ContainerSource {
    let name = record.names.first().map_or_else(
        || record.id.chars().take(12).collect(),
        |n| n.strip_prefix('/').unwrap_or(n).to_string(),
    );

    ContainerSource {
        id: record.id,
        name,
        state: record.state,
    }
}

fn pod_source(record: PodRecord) -> PodSource {
    PodSource {
        namespace: record.namespace,
        name: record.name,
        uid: record.uid,
        phase: record.phase.unwrap_or_else(|| "Unknown".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{BackendVersion, ByteStream, Error, KubeOption};

    struct Containers(Vec<ContainerRecord>);

    #[async_trait]
    impl ContainerBackend for Containers {
        async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
            Ok(self.0.clone())
        }

        async fn version(&self) -> Result<BackendVersion> {
            Ok(BackendVersion::default())
        }

        async fn attach(&self, id: &str) -> Result<ByteStream> {
            Err(Error::EntityVanished(id.to_string()))
        }
    }

    struct DownContainers;

    #[async_trait]
    impl ContainerBackend for DownContainers {
        async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
            Err(Error::docker("connection refused"))
        }

        async fn version(&self) -> Result<BackendVersion> {
            Err(Error::docker("connection refused"))
        }

        async fn attach(&self, _id: &str) -> Result<ByteStream> {
            Err(Error::docker("connection refused"))
        }
    }

    #[derive(Default)]
    struct Pods {
        pods: Vec<PodRecord>,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl Pods {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PodBackend for Pods {
        async fn list_all_pods(&self) -> Result<Vec<PodRecord>> {
            self.calls.lock().unwrap().push("all".into());
            if self.fail {
                return Err(Error::kube("no route to host"));
            }
            Ok(self.pods.clone())
        }

        async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
            self.calls.lock().unwrap().push(format!("ns:{namespace}"));
            if self.fail {
                return Err(Error::kube("no route to host"));
            }
            Ok(self
                .pods
                .iter()
                .filter(|p| p.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn follow_logs(&self, namespace: &str, name: &str) -> Result<ByteStream> {
            Err(Error::EntityVanished(format!("{namespace}/{name}")))
        }
    }

    fn record(id: &str, name: &str, state: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.into(),
            names: vec![format!("/{name}")],
            state: state.into(),
            labels: HashMap::new(),
        }
    }

    fn pod(namespace: &str, name: &str) -> PodRecord {
        PodRecord {
            namespace: namespace.into(),
            name: name.into(),
            uid: format!("uid-{name}"),
            phase: Some("Running".into()),
        }
    }

    fn kube_all() -> SessionOptions {
        SessionOptions {
            kube: Some(KubeOption::Flag(true)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_containers_only() {
        let discovery = Discovery::new(
            Arc::new(Containers(vec![record("abc", "web", "running")])),
            None,
            SessionOptions::default(),
        );

        let snapshot = discovery.discover().await.unwrap();
        assert_eq!(snapshot.sources.len(), 1);
        assert_eq!(snapshot.sources[0].display(), "web (running)");
        assert_eq!(snapshot.pod_count, None);
        assert_eq!(snapshot.list_label(), "Containers [1]");
    }

    #[tokio::test]
    async fn test_disabled_kube_never_queries_pods() {
        let pods = Arc::new(Pods {
            pods: vec![pod("default", "api-1")],
            ..Default::default()
        });
        let discovery = Discovery::new(
            Arc::new(Containers(vec![record("abc", "web", "running")])),
            Some(pods.clone()),
            SessionOptions::default(),
        );

        let snapshot = discovery.discover().await.unwrap();
        assert!(snapshot.sources.iter().all(|s| !s.is_pod()));
        assert!(pods.calls().is_empty());
    }

    #[tokio::test]
    async fn test_containers_before_pods() {
        let pods = Arc::new(Pods {
            pods: vec![pod("default", "api-1"), pod("kube-system", "dns")],
            ..Default::default()
        });
        let discovery = Discovery::new(
            Arc::new(Containers(vec![
                record("abc", "web", "running"),
                record("def", "db", "exited"),
            ])),
            Some(pods.clone()),
            kube_all(),
        );

        let snapshot = discovery.discover().await.unwrap();
        let items: Vec<String> = snapshot.sources.iter().map(LogSource::display).collect();
        assert_eq!(
            items,
            [
                "web (running)",
                "db (exited)",
                "default/api-1 (Running)",
                "kube-system/dns (Running)"
            ]
        );
        assert_eq!(snapshot.list_label(), "Containers [2] / Pods [2]");
        assert_eq!(pods.calls(), ["all"]);
    }

    #[tokio::test]
    async fn test_namespaced_listing() {
        let pods = Arc::new(Pods {
            pods: vec![pod("prod", "api-1"), pod("dev", "api-2")],
            ..Default::default()
        });
        let options = SessionOptions {
            kube: Some(KubeOption::Scoped {
                namespace: Some("prod".into()),
                display: Some(true),
            }),
            ..Default::default()
        };
        let discovery = Discovery::new(Arc::new(Containers(Vec::new())), Some(pods.clone()), options);

        let snapshot = discovery.discover().await.unwrap();
        assert_eq!(snapshot.sources.len(), 1);
        assert_eq!(snapshot.sources[0].display(), "prod/api-1 (Running)");
        assert_eq!(pods.calls(), ["ns:prod"]);
    }

    #[tokio::test]
    async fn test_pod_failure_keeps_containers() {
        let pods = Arc::new(Pods {
            fail: true,
            ..Default::default()
        });
        let discovery = Discovery::new(
            Arc::new(Containers(vec![record("abc", "web", "running")])),
            Some(pods),
            kube_all(),
        );

        let snapshot = discovery.discover().await.unwrap();
        assert_eq!(snapshot.sources.len(), 1);
        assert_eq!(snapshot.container_count, 1);
        assert_eq!(snapshot.pod_count, None);
    }

    #[tokio::test]
    async fn test_container_failure_is_fatal() {
        let discovery = Discovery::new(Arc::new(DownContainers), None, SessionOptions::default());
        let err = discovery.discover().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_container_filters() {
        let mut compose = record("c1", "stack-web-1", "running");
        compose
            .labels
            .insert(COMPOSE_PROJECT_LABEL.to_string(), "stack".to_string());

        let backend = Arc::new(Containers(vec![
            compose,
            record("c2", "web", "running"),
            record("c3", "db", "running"),
        ]));

        let options = SessionOptions {
            exclude_compose: true,
            exclude: vec!["db".into()],
            ..Default::default()
        };
        let snapshot = Discovery::new(backend.clone(), None, options)
            .discover()
            .await
            .unwrap();
        let names: Vec<String> = snapshot.sources.iter().map(LogSource::label).collect();
        assert_eq!(names, ["web"]);

        let options = SessionOptions {
            include: vec!["stack-web-1".into()],
            ..Default::default()
        };
        let snapshot = Discovery::new(backend, None, options).discover().await.unwrap();
        let names: Vec<String> = snapshot.sources.iter().map(LogSource::label).collect();
        assert_eq!(names, ["stack-web-1"]);
    }

    #[tokio::test]
    async fn test_name_fallbacks() {
        let backend = Arc::new(Containers(vec![ContainerRecord {
            id: "0123456789abcdef".into(),
            names: Vec::new(),
            state: "created".into(),
            labels: HashMap::new(),
        }]));
        let pods = Arc::new(Pods {
            pods: vec![PodRecord {
                phase: None,
                ..pod("default", "pending")
            }],
            ..Default::default()
        });

        let snapshot = Discovery::new(backend, Some(pods), kube_all())
            .discover()
            .await
            .unwrap();
        assert_eq!(snapshot.sources[0].display(), "0123456789ab (created)");
        assert_eq!(snapshot.sources[1].display(), "default/pending (Unknown)");
    }
}
