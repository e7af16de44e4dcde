//! Package prober registry.
//!
//! Maps purl types to the prober that handles them. The registry is built at
//! startup and shared by reference; lookups may run concurrently with the
//! occasional late registration.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::provider::PackageProbe;

/// Registry of package probers keyed by purl type.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: RwLock<HashMap<String, Arc<dyn PackageProbe>>>,
}

impl ProbeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prober under its own scheme.
    ///
    /// If a prober for the same scheme already exists, it is replaced.
    pub fn register<P: PackageProbe + 'static>(&self, probe: P) {
        self.register_arc(Arc::new(probe));
    }

    /// Register a prober wrapped in Arc.
    pub fn register_arc(&self, probe: Arc<dyn PackageProbe>) {
        let scheme = probe.scheme();
        self.register_as(scheme, probe);
    }

    /// Register a prober under an explicit scheme.
    pub fn register_as(&self, scheme: impl Into<String>, probe: Arc<dyn PackageProbe>) {
        let scheme = scheme.into();
        tracing::debug!(%scheme, "Registering package probe");
        self.probes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme, probe);
    }

    /// Get the prober for a scheme.
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn PackageProbe>> {
        self.probes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scheme)
            .cloned()
    }

    /// Get the number of registered probers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .probes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        schemes.sort();
        schemes
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("probes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FetchOptions;
    use crate::payload::Document;
    use crate::purl::PackageIdentifier;
    use async_trait::async_trait;

    struct MockProbe {
        scheme: &'static str,
    }

    #[async_trait]
    impl PackageProbe for MockProbe {
        fn scheme(&self) -> &'static str {
            self.scheme
        }

        fn description(&self) -> &'static str {
            "Mock probe for testing"
        }

        async fn fetch_documents(
            &self,
            _options: &FetchOptions,
            _identifier: &PackageIdentifier,
        ) -> crate::Result<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let registry = ProbeRegistry::new();
        registry.register(MockProbe { scheme: "oci" });

        assert!(registry.get("oci").is_some());
        assert!(registry.get("npm").is_none());
    }

    #[test]
    fn test_registry_replaces_existing() {
        let registry = ProbeRegistry::new();
        registry.register(MockProbe { scheme: "oci" });
        registry.register(MockProbe { scheme: "oci" });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_register_as() {
        let registry = ProbeRegistry::new();
        registry.register_as("docker", Arc::new(MockProbe { scheme: "oci" }));

        assert!(registry.get("docker").is_some());
        assert!(registry.get("oci").is_none());
    }

    #[test]
    fn test_registry_schemes() {
        let registry = ProbeRegistry::new();
        assert!(registry.is_empty());
        registry.register(MockProbe { scheme: "oci" });
        registry.register(MockProbe { scheme: "github" });

        assert_eq!(registry.schemes(), vec!["github", "oci"]);
        assert!(format!("{registry:?}").contains("github"));
    }

    #[test]
    fn test_registry_concurrent_lookups() {
        let registry = Arc::new(ProbeRegistry::new());
        registry.register(MockProbe { scheme: "oci" });

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    if i % 4 == 0 {
                        registry.register_as(format!("extra-{i}"), Arc::new(MockProbe { scheme: "oci" }));
                    }
                    registry.get("oci").is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.len(), 3);
    }
}
