//! Docker Engine client.

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::{ClientVersion, Docker};
use yoshi_core::{
    BackendVersion, ByteStream, ContainerBackend, ContainerRecord, DockerConfig, Error, Result,
};

use crate::attach;

/// Request timeout in seconds for non-streaming calls.
const TIMEOUT_SECS: u64 = 120;

/// Container backend backed by a bollard [`Docker`] client.
pub struct DockerBackend {
    docker: Docker,
}

impl DockerBackend {
    /// Connect with the local defaults (`DOCKER_HOST` or the default socket).
    pub fn new() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| Error::docker(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Connect using explicit connection parameters.
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let Some(endpoint) = config.endpoint() else {
            return Self::new();
        };

        let (major_version, minor_version) = config.api_version_parts()?;
        let version = ClientVersion {
            major_version,
            minor_version,
        };

        let docker = if let Some(socket) = endpoint.strip_prefix("unix://") {
            Docker::connect_with_socket(socket, TIMEOUT_SECS, &version)
        } else if let Some(tls) = &config.tls {
            Docker::connect_with_ssl(&endpoint, &tls.key, &tls.cert, &tls.ca, TIMEOUT_SECS, &version)
        } else {
            Docker::connect_with_http(&endpoint, TIMEOUT_SECS, &version)
        }
        .map_err(|e| Error::docker(e.to_string()))?;

        tracing::debug!(%endpoint, "connected to docker engine");
        Ok(Self { docker })
    }

    /// Create a backend from an existing client.
    pub const fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }

    /// Get a reference to the Docker client.
    pub const fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Check if Docker is available.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| Error::docker(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::docker(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerRecord {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                state: c.state.unwrap_or_else(|| "unknown".to_string()),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn version(&self) -> Result<BackendVersion> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| Error::docker(e.to_string()))?;

        Ok(BackendVersion {
            api_version: version.api_version.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn attach(&self, id: &str) -> Result<ByteStream> {
        attach::attach_stdout(&self.docker, id).await
    }
}

impl std::fmt::Debug for DockerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerBackend").finish_non_exhaustive()
    }
}
