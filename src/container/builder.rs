use std::sync::Arc;

use tracing::info;

use super::Container;
use crate::config::ContainerConfig;
use crate::definition::DefinitionRegistry;
use crate::error::LifecycleResult;
use crate::extension::{ExtensionOrchestrator, InterceptorChain, PresuppliedExtension};
use crate::observer::LifecycleObserver;
use crate::registry::ComponentRegistry;

/// Bootstraps a [`Container`] from a definition registry.
///
/// `build` runs the extension phases, installs the interceptor chain and,
/// unless disabled in the configuration, creates every non-lazy component.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{
///     ComponentDefinition, ContainerBuilder, ContainerConfig, DefinitionRegistry, LoggingObserver,
/// };
/// use std::sync::Arc;
///
/// let mut definitions = DefinitionRegistry::new();
/// definitions.register(ComponentDefinition::typed("clock", |_| Ok(0u64)).lazy());
///
/// let container = ContainerBuilder::new()
///     .config(ContainerConfig::default().allow_circular_references(false))
///     .observer(Arc::new(LoggingObserver::new()))
///     .build(definitions)
///     .unwrap();
///
/// assert!(!container.registry().contains("clock"));
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    presupplied: Vec<PresuppliedExtension>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl ContainerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds an extension that runs before any discovered one.
    pub fn presupplied(mut self, extension: PresuppliedExtension) -> Self {
        self.presupplied.push(extension);
        self
    }

    /// Adds a lifecycle observer to the registry.
    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Runs the bootstrap phases and returns the container.
    pub fn build(self, mut definitions: DefinitionRegistry) -> LifecycleResult<Container> {
        let mut orchestrator = ExtensionOrchestrator::new();
        orchestrator.invoke_registry_extensions(&mut definitions, &self.presupplied)?;

        let mut chain = InterceptorChain::new();
        orchestrator.install_interceptors(&definitions, &mut chain);

        let mut registry = ComponentRegistry::with_config(&self.config);
        for observer in self.observers {
            registry.add_observer(observer);
        }

        info!(definitions = definitions.len(), interceptors = chain.len(), "container bootstrapped");
        let preinstantiate = self.config.preinstantiate;
        let container = Container::from_parts(self.config, registry, definitions, chain);
        if preinstantiate {
            container.preinstantiate()?;
        }
        Ok(container)
    }
}
