//! Log source types.

use std::fmt;

/// A Docker container that can be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSource {
    /// Backend container id.
    pub id: String,
    /// Display name, leading `/` stripped.
    pub name: String,
    /// Runtime state as reported by the engine (e.g. "running").
    pub state: String,
}

/// A Kubernetes pod whose logs can be followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSource {
    /// Namespace the pod lives in.
    pub namespace: String,
    /// Pod name, unique within the namespace.
    pub name: String,
    /// Cluster-unique pod UID.
    pub uid: String,
    /// Pod phase (e.g. "Running").
    pub phase: String,
}

/// Anything whose output can be streamed into the log pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// Docker container.
    Container(ContainerSource),
    /// Kubernetes pod.
    Pod(PodSource),
}

/// Variant tag plus the backend-unique key of a [`LogSource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// Container id.
    Container(String),
    /// Pod UID.
    Pod(String),
}

impl LogSource {
    /// The string shown in the selection list.
    ///
    /// Containers render as `name (state)`, pods as `namespace/name (phase)`.
    pub fn display(&self) -> String {
        match self {
            Self::Container(c) => format!("{} ({})", c.name, c.state),
            Self::Pod(p) => format!("{}/{} ({})", p.namespace, p.name, p.phase),
        }
    }

    /// Short label used in titles.
    pub fn label(&self) -> String {
        match self {
            Self::Container(c) => c.name.clone(),
            Self::Pod(p) => format!("{}/{}", p.namespace, p.name),
        }
    }

    /// Identity of this source within one discovery snapshot.
    pub fn key(&self) -> SourceKey {
        match self {
            Self::Container(c) => SourceKey::Container(c.id.clone()),
            Self::Pod(p) => SourceKey::Pod(p.uid.clone()),
        }
    }

    /// Returns true for the pod variant.
    pub const fn is_pod(&self) -> bool {
        matches!(self, Self::Pod(_))
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web() -> LogSource {
        LogSource::Container(ContainerSource {
            id: "abc".into(),
            name: "web".into(),
            state: "running".into(),
        })
    }

    fn api() -> LogSource {
        LogSource::Pod(PodSource {
            namespace: "prod".into(),
            name: "api-1".into(),
            uid: "uid-1".into(),
            phase: "Running".into(),
        })
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(web().display(), "web (running)");
        assert_eq!(api().display(), "prod/api-1 (Running)");
    }

    #[test]
    fn test_labels_and_keys() {
        assert_eq!(web().label(), "web");
        assert_eq!(api().label(), "prod/api-1");
        assert_eq!(web().key(), SourceKey::Container("abc".into()));
        assert_eq!(api().key(), SourceKey::Pod("uid-1".into()));
        assert!(api().is_pod());
        assert!(!web().is_pod());
    }
}
