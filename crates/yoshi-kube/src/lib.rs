//! Kubernetes pod backend for yoshi.
//!
//! Lists pods and follows pod logs through a kube [`Client`], exposed as
//! the [`yoshi_core::PodBackend`] capability.

use async_trait::async_trait;
use futures::{AsyncRead, AsyncReadExt, stream};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, LogParams};
use kube::{Api, Client, ResourceExt};
use yoshi_core::{ByteStream, Error, PodBackend, PodRecord, Result};

/// Read buffer size for log chunks.
const CHUNK_SIZE: usize = 8 * 1024;

/// Pod backend backed by a kube [`Client`].
#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
}

impl KubeBackend {
    /// Build a client from the default kubeconfig or in-cluster config.
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::kube(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn list(&self, api: Api<Pod>) -> Result<Vec<PodRecord>> {
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::kube(e.to_string()))?;
        Ok(pods.items.iter().map(pod_record).collect())
    }
}

#[async_trait]
impl PodBackend for KubeBackend {
    async fn list_all_pods(&self) -> Result<Vec<PodRecord>> {
        self.list(Api::all(self.client.clone())).await
    }

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        self.list(Api::namespaced(self.client.clone(), namespace))
            .await
    }

    async fn follow_logs(&self, namespace: &str, name: &str) -> Result<ByteStream> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            follow: true,
            timestamps: false,
            ..Default::default()
        };

        let reader = api
            .log_stream(name, &params)
            .await
            .map_err(|e| map_error(namespace, name, e))?;

        tracing::debug!(%namespace, pod = %name, "following pod logs");
        Ok(chunks(Box::pin(reader)))
    }
}

impl std::fmt::Debug for KubeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeBackend").finish_non_exhaustive()
    }
}

/// Turn a log reader into a stream of raw chunks, ending at EOF.
fn chunks<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    Box::pin(stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(reader)))
            }
            Err(e) => Some((Err(Error::kube(e.to_string())), None)),
        }
    }))
}

fn pod_record(pod: &Pod) -> PodRecord {
    PodRecord {
        namespace: pod.namespace().unwrap_or_default(),
        name: pod.name_any(),
        uid: pod.uid().unwrap_or_default(),
        phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
    }
}

fn map_error(namespace: &str, name: &str, e: kube::Error) -> Error {
    match e {
        kube::Error::Api(response) if response.code == 404 => {
            Error::EntityVanished(format!("{namespace}/{name}"))
        }
        other => Error::kube(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    #[test]
    fn test_pod_record_mapping() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("api-1".into()),
                namespace: Some("prod".into()),
                uid: Some("3f0c".into()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some("Running".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = pod_record(&pod);
        assert_eq!(record.namespace, "prod");
        assert_eq!(record.name, "api-1");
        assert_eq!(record.uid, "3f0c");
        assert_eq!(record.phase.as_deref(), Some("Running"));
    }

    #[test]
    fn test_pod_without_status() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("pending".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let record = pod_record(&pod);
        assert_eq!(record.namespace, "");
        assert_eq!(record.phase, None);
    }

    #[tokio::test]
    async fn test_chunks_until_eof() {
        let reader = futures::io::Cursor::new(b"line one\nline two\n".to_vec());
        let collected: Vec<u8> = chunks(reader)
            .map(|chunk| chunk.unwrap())
            .concat()
            .await;
        assert_eq!(collected, b"line one\nline two\n");
    }

    #[tokio::test]
    async fn test_empty_reader_ends_immediately() {
        let reader = futures::io::Cursor::new(Vec::new());
        assert!(chunks(reader).next().await.is_none());
    }
}
