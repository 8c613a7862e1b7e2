//! Session options.

/// How Kubernetes pods take part in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeOption {
    /// Plain on/off switch; `true` lists pods in every namespace.
    Flag(bool),
    /// Scoped pod listing.
    Scoped {
        /// Namespace to list, or every namespace when unset.
        namespace: Option<String>,
        /// Whether pods should be displayed at all.
        display: Option<bool>,
    },
}

/// Options controlling what a session discovers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Hide containers created by Docker Compose.
    pub exclude_compose: bool,
    /// Only show containers with these names (when non-empty).
    pub include: Vec<String>,
    /// Never show containers with these names.
    pub exclude: Vec<String>,
    /// Kubernetes pod options.
    pub kube: Option<KubeOption>,
}

impl SessionOptions {
    /// Whether a Kubernetes client should be constructed at all.
    pub const fn kube_enabled(&self) -> bool {
        matches!(
            self.kube,
            Some(KubeOption::Flag(true) | KubeOption::Scoped { display: Some(true), .. })
        )
    }

    /// Which pods to query.
    ///
    /// `None` means the pod backend is not queried, `Some(None)` lists every
    /// namespace and `Some(Some(ns))` lists a single namespace.
    pub fn kube_query(&self) -> Option<Option<&str>> {
        match self.kube.as_ref()? {
            KubeOption::Flag(true) => Some(None),
            KubeOption::Flag(false) => None,
            KubeOption::Scoped {
                display: Some(false),
                ..
            } => None,
            KubeOption::Scoped { namespace, .. } => Some(namespace.as_deref()),
        }
    }

    /// Apply the include/exclude name filters.
    pub fn allows_name(&self, name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|n| n == name) {
            return false;
        }
        !self.exclude.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_kube(kube: KubeOption) -> SessionOptions {
        SessionOptions {
            kube: Some(kube),
            ..Default::default()
        }
    }

    #[test]
    fn test_kube_disabled_by_default() {
        let options = SessionOptions::default();
        assert!(!options.kube_enabled());
        assert_eq!(options.kube_query(), None);
    }

    #[test]
    fn test_kube_flag() {
        let options = with_kube(KubeOption::Flag(true));
        assert!(options.kube_enabled());
        assert_eq!(options.kube_query(), Some(None));

        let options = with_kube(KubeOption::Flag(false));
        assert!(!options.kube_enabled());
        assert_eq!(options.kube_query(), None);
    }

    #[test]
    fn test_kube_scoped() {
        let options = with_kube(KubeOption::Scoped {
            namespace: Some("prod".into()),
            display: Some(true),
        });
        assert!(options.kube_enabled());
        assert_eq!(options.kube_query(), Some(Some("prod")));

        let options = with_kube(KubeOption::Scoped {
            namespace: None,
            display: Some(true),
        });
        assert_eq!(options.kube_query(), Some(None));

        let options = with_kube(KubeOption::Scoped {
            namespace: Some("prod".into()),
            display: Some(false),
        });
        assert!(!options.kube_enabled());
        assert_eq!(options.kube_query(), None);
    }

    #[test]
    fn test_scoped_without_display_is_not_enabled() {
        let options = with_kube(KubeOption::Scoped {
            namespace: Some("prod".into()),
            display: None,
        });
        assert!(!options.kube_enabled());
        assert_eq!(options.kube_query(), Some(Some("prod")));
    }

    #[test]
    fn test_name_filters() {
        let options = SessionOptions {
            include: vec!["web".into(), "db".into()],
            exclude: vec!["db".into()],
            ..Default::default()
        };
        assert!(options.allows_name("web"));
        assert!(!options.allows_name("db"));
        assert!(!options.allows_name("cache"));

        let open = SessionOptions::default();
        assert!(open.allows_name("anything"));
    }
}
