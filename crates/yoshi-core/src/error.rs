//! Error types for yoshi.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The runtime backend an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Docker Engine.
    Docker,
    /// Kubernetes API server.
    Kubernetes,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// Errors that can occur in yoshi.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend client could not be reached or answered with a failure.
    #[error("{backend} backend unreachable: {message}")]
    BackendUnreachable {
        /// Which backend failed.
        backend: Backend,
        /// Client error text.
        message: String,
    },

    /// The selected source no longer exists on its backend.
    #[error("log source vanished: {0}")]
    EntityVanished(String),

    /// A display string did not resolve to any discovered source.
    #[error("unknown selection: {0}")]
    UnknownSelection(String),

    /// A startup precondition was violated.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a Docker [`Error::BackendUnreachable`].
    pub fn docker(message: impl Into<String>) -> Self {
        Self::BackendUnreachable {
            backend: Backend::Docker,
            message: message.into(),
        }
    }

    /// Shorthand for a Kubernetes [`Error::BackendUnreachable`].
    pub fn kube(message: impl Into<String>) -> Self {
        Self::BackendUnreachable {
            backend: Backend::Kubernetes,
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole program.
    ///
    /// Only precondition violations and an unreachable container backend
    /// are fatal; everything else is surfaced in the UI.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_)
                | Self::BackendUnreachable {
                    backend: Backend::Docker,
                    ..
                }
        )
    }
}
