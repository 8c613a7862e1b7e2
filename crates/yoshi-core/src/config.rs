//! Configuration management.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Docker Engine API version requested when none is configured.
pub const DEFAULT_DOCKER_API_VERSION: &str = "1.32";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the diagnostics log.
    pub data_dir: PathBuf,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Docker Engine connection parameters.
    pub docker: DockerConfig,
    /// Defaults applied when Kubernetes pods are requested.
    pub kube: KubeConfigOptions,
}

/// Docker Engine connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Unix socket or named pipe path.
    pub socket: Option<String>,
    /// Engine host.
    pub host: Option<String>,
    /// Engine port.
    pub port: Option<u16>,
    /// Minimum API version to speak.
    pub api_version: String,
    /// TLS material for remote engines.
    pub tls: Option<TlsConfig>,
}

/// TLS client material, as file paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// CA certificate.
    pub ca: PathBuf,
    /// Client certificate.
    pub cert: PathBuf,
    /// Client key.
    pub key: PathBuf,
}

/// Kubernetes defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeConfigOptions {
    /// Namespace to list pods from.
    pub namespace: Option<String>,
    /// Whether pods are displayed.
    pub display: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("", "", "yoshi")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".yoshi"));

        Self {
            data_dir,
            log_level: "warn".to_string(),
            docker: DockerConfig::default(),
            kube: KubeConfigOptions::default(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: None,
            host: None,
            port: None,
            api_version: DEFAULT_DOCKER_API_VERSION.to_string(),
            tls: None,
        }
    }
}

impl DockerConfig {
    /// Engine address, or `None` to use the local defaults.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(socket) = &self.socket {
            return Some(format!("unix://{}", socket.trim_start_matches("unix://")));
        }

        let host = self.host.as_deref()?;
        let port = self.port.unwrap_or(if self.tls.is_some() { 2376 } else { 2375 });
        let scheme = if self.tls.is_some() { "https" } else { "tcp" };
        Some(format!("{scheme}://{host}:{port}"))
    }

    /// Parse `api_version` into `(major, minor)`.
    pub fn api_version_parts(&self) -> Result<(usize, usize)> {
        let version = self.api_version.trim_start_matches('v');
        let (major, minor) = version
            .split_once('.')
            .ok_or_else(|| Error::Config(format!("invalid docker api version: {version}")))?;

        let parse = |part: &str| {
            part.parse::<usize>()
                .map_err(|_| Error::Config(format!("invalid docker api version: {version}")))
        };
        Ok((parse(major)?, parse(minor)?))
    }
}

impl Config {
    /// Load configuration from disk or fall back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.docker.api_version_parts()?;
        Ok(config)
    }

    /// Path of the diagnostics log file.
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("yoshi.log")
    }

    /// Get configuration file path.
    fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "yoshi")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .ok_or_else(|| Error::Config("could not determine config directory".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.docker.api_version, "1.32");
        assert!(config.docker.endpoint().is_none());
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "docker": { "socket": "/run/user/1000/docker.sock" }, "kube": { "namespace": "prod" } }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.docker.api_version, "1.32");
        assert_eq!(
            config.docker.endpoint().as_deref(),
            Some("unix:///run/user/1000/docker.sock")
        );
        assert_eq!(config.kube.namespace.as_deref(), Some("prod"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_tcp_endpoints() {
        let mut docker = DockerConfig {
            host: Some("10.0.0.5".into()),
            ..Default::default()
        };
        assert_eq!(docker.endpoint().as_deref(), Some("tcp://10.0.0.5:2375"));

        docker.port = Some(4243);
        assert_eq!(docker.endpoint().as_deref(), Some("tcp://10.0.0.5:4243"));

        docker.port = None;
        docker.tls = Some(TlsConfig {
            ca: "ca.pem".into(),
            cert: "cert.pem".into(),
            key: "key.pem".into(),
        });
        assert_eq!(docker.endpoint().as_deref(), Some("https://10.0.0.5:2376"));
    }

    #[test]
    fn test_api_version_parts() {
        let mut docker = DockerConfig::default();
        assert_eq!(docker.api_version_parts().unwrap(), (1, 32));

        docker.api_version = "v1.45".into();
        assert_eq!(docker.api_version_parts().unwrap(), (1, 45));

        docker.api_version = "latest".into();
        assert!(matches!(docker.api_version_parts(), Err(Error::Config(_))));
    }
}
