//! Selection model over one discovery snapshot.

use crate::{Error, LogSource, Result};

/// Discovered sources plus the currently active one.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    sources: Vec<LogSource>,
    has_pods: bool,
    active: Option<LogSource>,
}

impl Selection {
    /// Build a selection from sources in discovery order.
    pub fn new(sources: Vec<LogSource>) -> Self {
        let has_pods = sources.iter().any(LogSource::is_pod);
        Self {
            sources,
            has_pods,
            active: None,
        }
    }

    /// Sources in render order.
    pub fn list(&self) -> &[LogSource] {
        &self.sources
    }

    /// Display strings in render order.
    pub fn items(&self) -> Vec<String> {
        self.sources.iter().map(LogSource::display).collect()
    }

    /// Resolve a display string back to its source.
    ///
    /// Pod-shaped strings (`namespace/name (phase)`) are matched against
    /// pods first when the snapshot holds any; duplicates resolve to the
    /// first match in discovery order.
    pub fn resolve(&self, key: &str) -> Result<&LogSource> {
        let prefer_pods = self.has_pods && looks_like_pod(key);
        let first_match = |pods: bool| {
            self.sources
                .iter()
                .filter(move |s| s.is_pod() == pods)
                .find(|s| s.display() == key)
        };

        first_match(prefer_pods)
            .or_else(|| first_match(!prefer_pods))
            .ok_or_else(|| Error::UnknownSelection(key.to_string()))
    }

    /// The active source, if any.
    pub const fn active(&self) -> Option<&LogSource> {
        self.active.as_ref()
    }

    /// Mark a source as active.
    pub fn activate(&mut self, source: LogSource) {
        self.active = Some(source);
    }

    /// Forget the active source.
    pub fn clear(&mut self) {
        self.active = None;
    }
}

/// Container names never contain `/`, pod renderings always do.
fn looks_like_pod(key: &str) -> bool {
    key.split(" (").next().is_some_and(|head| head.contains('/'))
}
