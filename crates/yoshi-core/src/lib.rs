//! Core types for yoshi.
//!
//! This crate provides the unified log source model, backend capability
//! traits, entity discovery, the selection model, configuration and the
//! error types used across the yoshi workspace.

mod backend;
mod config;
mod discovery;
mod error;
mod options;
mod probe;
mod selection;
mod source;

pub use backend::{BackendVersion, ByteStream, ContainerBackend, ContainerRecord, PodBackend, PodRecord};
pub use config::{Config, DockerConfig, KubeConfigOptions, TlsConfig};
pub use discovery::{COMPOSE_PROJECT_LABEL, Discovery, Snapshot};
pub use error::{Backend, Error, Result};
pub use options::{KubeOption, SessionOptions};
pub use probe::ContainerProbe;
pub use selection::Selection;
pub use source::{ContainerSource, LogSource, PodSource, SourceKey};
