//! Provider registry.
//!
//! Providers are registered explicitly, each under its name with a
//! constructor. [`ProviderRegistryBuilder::build`] runs the constructors in
//! registration order and fails fast if any of them reports an error: a
//! constructor only fails for misconfiguration, since providers do not touch
//! the network while being built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::CalendarProvider;

/// Builds one provider instance.
pub type ProviderConstructor =
    Box<dyn FnOnce() -> ProviderResult<Arc<dyn CalendarProvider>> + Send>;

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two registrations share a name.
    #[error("provider '{name}' is registered more than once")]
    DuplicateProvider { name: String },

    /// A constructor failed.
    #[error("failed to construct provider '{name}': {source}")]
    Construction {
        name: String,
        #[source]
        source: ProviderError,
    },

    /// A constructor returned a provider reporting another name.
    #[error("provider registered as '{registered}' reports its name as '{reported}'")]
    NameMismatch { registered: String, reported: String },
}

/// Collects provider registrations.
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    registrations: Vec<(String, ProviderConstructor)>,
}

impl ProviderRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under `name`.
    pub fn register<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: FnOnce() -> ProviderResult<Arc<dyn CalendarProvider>> + Send + 'static,
    {
        self.registrations.push((name.into(), Box::new(constructor)));
        self
    }

    /// Registers an already constructed provider under its own name.
    pub fn register_instance(self, provider: Arc<dyn CalendarProvider>) -> Self {
        let name = provider.name().to_string();
        self.register(name, move || Ok(provider))
    }

    /// Number of registrations so far.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Instantiates every registered provider, in registration order.
    pub fn build(self) -> Result<ProviderRegistry, RegistryError> {
        let mut providers: Vec<Arc<dyn CalendarProvider>> =
            Vec::with_capacity(self.registrations.len());
        let mut index = HashMap::with_capacity(self.registrations.len());

        for (name, constructor) in self.registrations {
            if index.contains_key(&name) {
                return Err(RegistryError::DuplicateProvider { name });
            }

            debug!(provider = %name, "constructing provider");
            let provider = constructor().map_err(|source| RegistryError::Construction {
                name: name.clone(),
                source,
            })?;

            if provider.name() != name {
                return Err(RegistryError::NameMismatch {
                    registered: name,
                    reported: provider.name().to_string(),
                });
            }

            info!(provider = %name, "provider registered");
            index.insert(name, providers.len());
            providers.push(provider);
        }

        Ok(ProviderRegistry { providers, index })
    }
}

/// All instantiated providers, indexed by name, in registration order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CalendarProvider>>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::new()
    }

    /// Every provider, in registration order.
    pub fn all_providers(&self) -> &[Arc<dyn CalendarProvider>] {
        &self.providers
    }

    /// Finds a provider by name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn CalendarProvider>> {
        self.index.get(name).map(|&i| &self.providers[i])
    }

    /// The first registered provider.
    pub fn first(&self) -> Option<&Arc<dyn CalendarProvider>> {
        self.providers.first()
    }

    /// Provider names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::UnavailableProvider;

    fn stub(name: &str) -> Arc<dyn CalendarProvider> {
        Arc::new(UnavailableProvider::new(
            name,
            ProviderError::network("offline"),
        ))
    }

    #[test]
    fn preserves_registration_order() {
        let registry = ProviderRegistry::builder()
            .register_instance(stub("Work"))
            .register_instance(stub("Personal"))
            .register("Archive", || Ok(stub("Archive")))
            .build()
            .unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["Work", "Personal", "Archive"]
        );
        assert_eq!(registry.first().map(|p| p.name()), Some("Work"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn lookup_by_name() {
        let registry = ProviderRegistry::builder()
            .register_instance(stub("Work"))
            .build()
            .unwrap();

        assert!(registry.lookup("Work").is_some());
        assert!(registry.lookup("work").is_none());
        assert!(registry.lookup("Personal").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ProviderRegistry::builder()
            .register_instance(stub("Work"))
            .register_instance(stub("Work"))
            .build()
            .unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateProvider { ref name } if name == "Work"));
    }

    #[test]
    fn constructor_failure_is_fatal() {
        let err = ProviderRegistry::builder()
            .register_instance(stub("Work"))
            .register("Broken", || Err(ProviderError::configuration("missing token")))
            .build()
            .unwrap_err();

        match err {
            RegistryError::Construction { name, source } => {
                assert_eq!(name, "Broken");
                assert_eq!(source.message(), "missing token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn name_mismatch_rejected() {
        let err = ProviderRegistry::builder()
            .register("Work", || Ok(stub("Personal")))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::NameMismatch { .. }));
    }

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.first().is_none());
    }
}
