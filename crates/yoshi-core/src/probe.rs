//! Detection of running inside a container.

use std::path::PathBuf;

/// Checks whether the current process runs inside a Docker container.
#[derive(Debug, Clone)]
pub struct ContainerProbe {
    dockerenv: PathBuf,
    cgroup: PathBuf,
}

impl Default for ContainerProbe {
    fn default() -> Self {
        Self {
            dockerenv: PathBuf::from("/.dockerenv"),
            cgroup: PathBuf::from("/proc/self/cgroup"),
        }
    }
}

impl ContainerProbe {
    /// Probe custom marker paths instead of the real ones.
    pub fn with_paths(dockerenv: impl Into<PathBuf>, cgroup: impl Into<PathBuf>) -> Self {
        Self {
            dockerenv: dockerenv.into(),
            cgroup: cgroup.into(),
        }
    }

    /// True when `/.dockerenv` exists or the cgroup file mentions docker.
    pub fn is_nested(&self) -> bool {
        if self.dockerenv.exists() {
            return true;
        }

        std::fs::read_to_string(&self.cgroup)
            .map(|content| content.contains("docker"))
            .unwrap_or(false)
    }
}
