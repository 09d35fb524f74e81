//! The container: definitions, interceptors and the component registry
//! wired into one creation pipeline.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ContainerConfig;
use crate::definition::{ComponentDefinition, DefinitionRegistry};
use crate::error::{LifecycleError, LifecycleResult};
use crate::extension::InterceptorChain;
use crate::registry::{ComponentRegistry, Instance, RegistryLock};
use crate::traits::{ComponentResolver, Dispose, DisposeFn, ResolverCore};

mod builder;
mod context;

pub use builder::ContainerBuilder;
pub use context::CreationContext;

/// Component container.
///
/// Created by [`ContainerBuilder::build`]. Cheap to clone; all clones share
/// the same registry.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentDefinition, ComponentResolver, ContainerBuilder, DefinitionRegistry};
/// use std::sync::{Arc, Mutex, OnceLock};
///
/// struct Pool;
/// struct Repository {
///     pool: OnceLock<Arc<Pool>>,
/// }
///
/// let closed = Arc::new(Mutex::new(Vec::new()));
/// let log = closed.clone();
///
/// let mut definitions = DefinitionRegistry::new();
/// definitions.register(
///     ComponentDefinition::typed("pool", |_| Ok(Pool))
///         .dispose(move |_| { log.lock().unwrap().push("pool"); Ok(()) }),
/// );
/// definitions.register(
///     ComponentDefinition::typed("repository", |_| Ok(Repository { pool: OnceLock::new() }))
///         .populate_as::<Repository, _>(|repo, ctx| {
///             let _ = repo.pool.set(ctx.get_typed::<Pool>("pool")?);
///             Ok(())
///         }),
/// );
///
/// let container = ContainerBuilder::new().build(definitions).unwrap();
/// let repository = container.get_typed::<Repository>("repository").unwrap();
/// assert!(repository.pool.get().is_some());
/// assert_eq!(container.registry().dependents_of("pool"), vec!["repository".to_string()]);
///
/// container.destroy_all();
/// assert_eq!(*closed.lock().unwrap(), vec!["pool"]);
/// ```
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    config: ContainerConfig,
    registry: ComponentRegistry,
    definitions: RwLock<DefinitionRegistry>,
    chain: InterceptorChain,
}

impl Container {
    pub(crate) fn from_parts(
        config: ContainerConfig,
        registry: ComponentRegistry,
        definitions: DefinitionRegistry,
        chain: InterceptorChain,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                config,
                registry,
                definitions: RwLock::new(definitions),
                chain,
            }),
        }
    }

    /// Settings this container was built with.
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// The underlying component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.registry
    }

    /// Acquires the registry lock.
    pub fn registry_lock(&self) -> RegistryLock<'_> {
        self.inner.registry.registry_lock()
    }

    /// Installed interceptor names in invocation order.
    pub fn interceptor_names(&self) -> Vec<String> {
        self.inner.chain.names()
    }

    /// Registered definition names.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.definitions.read().names()
    }

    /// True if `name` is finished or has a definition.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.registry.contains(name) || self.inner.definitions.read().contains(name)
    }

    /// Registers a definition after bootstrap.
    ///
    /// Replaces an existing definition; an instance already created from the
    /// old one stays in place.
    pub fn register_definition(&self, definition: ComponentDefinition) {
        self.inner.definitions.write().register(definition);
    }

    /// Binds an externally created instance under `name`.
    pub fn register_instance<T>(&self, name: &str, instance: Arc<T>) -> LifecycleResult<()>
    where
        T: std::any::Any + Send + Sync,
    {
        self.inner.registry.register_finished(name, instance)
    }

    /// Registers a disposal callback for `name`.
    pub fn register_disposal<D: Dispose>(&self, name: &str, disposable: D) {
        self.inner.registry.register_disposable(name, disposable);
    }

    /// Records that `dependent` must be destroyed before `dependee`.
    pub fn register_dependency(&self, dependee: &str, dependent: &str) {
        self.inner.registry.record_dependency(dependee, dependent);
    }

    /// Creates every non-lazy definition that is not finished yet, in
    /// registration order.
    pub fn preinstantiate(&self) -> LifecycleResult<()> {
        let eager: Vec<String> = {
            let definitions = self.inner.definitions.read();
            definitions
                .names()
                .into_iter()
                .filter(|name| definitions.definition(name).is_some_and(|d| !d.is_lazy()))
                .collect()
        };
        debug!(components = eager.len(), "pre-instantiating components");
        for name in eager {
            self.resolve(&name, None)?;
        }
        Ok(())
    }

    /// Destroys `name` and every component depending on it.
    pub fn destroy(&self, name: &str) {
        self.inner.registry.destroy(name);
    }

    /// Destroys every component with a disposal callback.
    pub fn destroy_all(&self) {
        self.inner.registry.destroy_all();
    }

    pub(crate) fn resolve(&self, name: &str, requester: Option<&str>) -> LifecycleResult<Instance> {
        let instance = self.resolve_unrecorded(name)?;
        if let Some(requester) = requester {
            self.inner.registry.record_dependency(name, requester);
        }
        Ok(instance)
    }

    pub(crate) fn resolve_optional(&self, name: &str, requester: Option<&str>) -> LifecycleResult<Option<Instance>> {
        if !self.contains(name) {
            return Ok(None);
        }
        match self.resolve(name, requester) {
            Ok(instance) => Ok(Some(instance)),
            Err(err) => {
                debug!(component = name, error = %err, "optional collaborator unavailable");
                self.inner.registry.on_suppressed(err);
                Ok(None)
            }
        }
    }

    fn resolve_unrecorded(&self, name: &str) -> LifecycleResult<Instance> {
        let registry = &self.inner.registry;
        if let Some(instance) = registry.lookup(name, self.inner.config.allow_circular_references)? {
            return Ok(instance);
        }

        let definition = self
            .inner
            .definitions
            .read()
            .definition(name)
            .cloned()
            .ok_or_else(|| LifecycleError::NotDefined(name.to_string()))?;

        let materialized = registry.get_or_create(name, || {
            self.create_component(name, &definition).map_err(|err| {
                registry.destroy(name);
                err
            })
        })?;
        Ok(materialized.into_instance())
    }

    fn create_component(&self, name: &str, definition: &ComponentDefinition) -> LifecycleResult<Instance> {
        let registry = &self.inner.registry;

        for dependency in definition.dependencies() {
            if registry.is_transitively_dependent(name, dependency) {
                return Err(LifecycleError::CircularDependsOn {
                    name: name.to_string(),
                    dependency: dependency.clone(),
                });
            }
            registry.record_dependency(dependency, name);
            self.resolve_unrecorded(dependency)
                .map_err(|err| LifecycleError::Creation {
                    name: name.to_string(),
                    source: Box::new(err),
                    related: Vec::new(),
                })?;
        }

        let ctx = CreationContext::new(self, name);
        let raw = (definition.instantiate)(&ctx)?;

        let early_exposure = self.inner.config.allow_circular_references && registry.is_currently_in_creation(name);
        if early_exposure {
            let chain = self.inner.chain.clone();
            let (early_name, early_raw) = (name.to_string(), raw.clone());
            registry.register_early_reference_factory(
                name,
                Box::new(move || chain.apply_early_reference(&early_name, early_raw.clone())),
            );
        }

        if let Some(populate) = &definition.populate {
            populate(&raw, &ctx)?;
        }
        let mut exposed = self.inner.chain.apply_before_init(name, raw.clone())?;
        if let Some(init) = &definition.init {
            init(&exposed, &ctx)?;
        }
        exposed = self.inner.chain.apply_after_init(name, exposed)?;

        if early_exposure {
            if let Some(early) = registry.lookup(name, false)? {
                if Arc::ptr_eq(&exposed, &raw) {
                    exposed = early;
                } else if !Arc::ptr_eq(&exposed, &early) {
                    return Err(LifecycleError::EarlyReferenceMismatch(name.to_string()));
                }
            }
        }

        if let Some(hook) = &definition.dispose {
            let (hook, target) = (hook.clone(), exposed.clone());
            registry.register_disposable(name, DisposeFn::new(move || hook(&target)));
        }
        Ok(exposed)
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let pending = self.inner.registry.pending_disposables();
            if pending > 0 {
                warn!(pending, "container dropped with undisposed components; call destroy_all() before dropping");
            }
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.inner.config)
            .field("finished", &self.inner.registry.names())
            .field("interceptors", &self.inner.chain)
            .finish()
    }
}

impl ResolverCore for Container {
    fn resolve_instance(&self, name: &str) -> LifecycleResult<Instance> {
        self.resolve(name, None)
    }

    fn resolve_optional_instance(&self, name: &str) -> LifecycleResult<Option<Instance>> {
        self.resolve_optional(name, None)
    }
}

impl ComponentResolver for Container {}
