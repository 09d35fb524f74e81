//! Component definitions and the definition registry.
//!
//! A definition is the recipe for one named component. The definition
//! registry is the mutable space registry extensions work on during
//! bootstrap: definitions, further extensions and interceptors are all
//! registered here by name.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::container::CreationContext;
use crate::error::{LifecycleError, LifecycleResult};
use crate::extension::{DefinitionExtension, Interceptor, RegistryExtension};
use crate::registry::Instance;

pub(crate) type InstantiateFn =
    Arc<dyn for<'a> Fn(&CreationContext<'a>) -> LifecycleResult<Instance> + Send + Sync>;
pub(crate) type WireFn =
    Arc<dyn for<'a> Fn(&Instance, &CreationContext<'a>) -> LifecycleResult<()> + Send + Sync>;
pub(crate) type DisposeHook = Arc<dyn Fn(&Instance) -> anyhow::Result<()> + Send + Sync>;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Recipe for creating one named component.
///
/// Creation runs in this order: declared `depends_on` names are created,
/// `instantiate` allocates the instance (only constructor-style collaborators
/// may be requested here), an early reference is published, `populate` wires
/// setter-style collaborators, interceptors run around the `init` hook.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentDefinition, ComponentResolver};
/// use std::sync::{Arc, OnceLock};
///
/// struct Repository;
/// struct Service {
///     repository: OnceLock<Arc<Repository>>,
/// }
///
/// let repository = ComponentDefinition::typed("repository", |_| Ok(Repository));
/// let service = ComponentDefinition::typed("service", |_| Ok(Service { repository: OnceLock::new() }))
///     .populate_as::<Service, _>(|service, ctx| {
///         let _ = service.repository.set(ctx.get_typed::<Repository>("repository")?);
///         Ok(())
///     })
///     .lazy();
///
/// assert!(service.is_lazy());
/// assert_eq!(repository.name(), "repository");
/// ```
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    pub(crate) instantiate: InstantiateFn,
    pub(crate) populate: Option<WireFn>,
    pub(crate) init: Option<WireFn>,
    pub(crate) dispose: Option<DisposeHook>,
    depends_on: Vec<String>,
    lazy: bool,
}

impl ComponentDefinition {
    /// Creates a definition from a type-erased instantiation step.
    pub fn new<F>(name: impl Into<String>, instantiate: F) -> Self
    where
        F: for<'a> Fn(&CreationContext<'a>) -> LifecycleResult<Instance> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            instantiate: Arc::new(instantiate),
            populate: None,
            init: None,
            dispose: None,
            depends_on: Vec::new(),
            lazy: false,
        }
    }

    /// Creates a definition whose instantiation step returns a concrete value.
    pub fn typed<T, F>(name: impl Into<String>, instantiate: F) -> Self
    where
        T: Any + Send + Sync,
        F: for<'a> Fn(&CreationContext<'a>) -> LifecycleResult<T> + Send + Sync + 'static,
    {
        Self::new(name, move |ctx| Ok(Arc::new(instantiate(ctx)?) as Instance))
    }

    /// Sets the setter-style wiring step.
    pub fn populate<F>(mut self, populate: F) -> Self
    where
        F: for<'a> Fn(&Instance, &CreationContext<'a>) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        self.populate = Some(Arc::new(populate));
        self
    }

    /// Sets a wiring step that receives the instance downcast to `T`.
    pub fn populate_as<T, F>(self, populate: F) -> Self
    where
        T: Any + Send + Sync,
        F: for<'a> Fn(&T, &CreationContext<'a>) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.populate(move |instance, ctx| populate(downcast_ref::<T>(&name, instance)?, ctx))
    }

    /// Sets the initialization hook, run between the interceptor phases.
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: for<'a> Fn(&Instance, &CreationContext<'a>) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// Sets the disposal hook, registered once the component is finished.
    pub fn dispose<F>(mut self, dispose: F) -> Self
    where
        F: Fn(&Instance) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispose = Some(Arc::new(dispose));
        self
    }

    /// Sets a disposal hook that receives the instance downcast to `T`.
    pub fn dispose_as<T, F>(self, dispose: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.dispose(move |instance| {
            let typed = downcast_ref::<T>(&name, instance)?;
            dispose(typed)
        })
    }

    /// Declares a component that must be created before this one.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Excludes the component from eager creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared depends-on names.
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// True if excluded from eager creation.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("lazy", &self.lazy)
            .field("populate", &self.populate.is_some())
            .field("init", &self.init.is_some())
            .field("dispose", &self.dispose.is_some())
            .finish()
    }
}

pub(crate) fn downcast_ref<'i, T>(name: &str, instance: &'i Instance) -> LifecycleResult<&'i T>
where
    T: Any + Send + Sync,
{
    instance.downcast_ref::<T>().ok_or_else(|| LifecycleError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

/// Mutable definition space worked on during bootstrap.
///
/// Every registry carries a process-unique id, used to detect a registry
/// phase being run against the same registry twice.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentDefinition, DefinitionRegistry};
///
/// let mut definitions = DefinitionRegistry::new();
/// definitions.register(ComponentDefinition::typed("port", |_| Ok(8080u16)));
/// definitions.register(ComponentDefinition::typed("host", |_| Ok("localhost")));
///
/// assert_eq!(definitions.names(), vec!["port".to_string(), "host".to_string()]);
/// assert!(definitions.contains("port"));
/// ```
pub struct DefinitionRegistry {
    id: u64,
    definitions: IndexMap<String, ComponentDefinition>,
    registry_extensions: IndexMap<String, Arc<dyn RegistryExtension>>,
    definition_extensions: IndexMap<String, Arc<dyn DefinitionExtension>>,
    interceptors: IndexMap<String, Arc<dyn Interceptor>>,
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry {
    /// Creates an empty registry with a fresh id.
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            definitions: IndexMap::new(),
            registry_extensions: IndexMap::new(),
            definition_extensions: IndexMap::new(),
            interceptors: IndexMap::new(),
        }
    }

    /// Process-unique id of this registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registers a definition, replacing any previous one with the same name.
    pub fn register(&mut self, definition: ComponentDefinition) -> &mut Self {
        self.definitions.insert(definition.name.clone(), definition);
        self
    }

    /// Removes and returns a definition.
    pub fn remove(&mut self, name: &str) -> Option<ComponentDefinition> {
        self.definitions.shift_remove(name)
    }

    /// Looks up a definition.
    pub fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    /// True if a definition is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Definition names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if no definitions are registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registers a named registry extension for discovery.
    pub fn register_registry_extension<E>(&mut self, name: impl Into<String>, extension: E) -> &mut Self
    where
        E: RegistryExtension + 'static,
    {
        self.registry_extensions.insert(name.into(), Arc::new(extension));
        self
    }

    /// Registers a named definition extension for discovery.
    pub fn register_definition_extension<E>(&mut self, name: impl Into<String>, extension: E) -> &mut Self
    where
        E: DefinitionExtension + 'static,
    {
        self.definition_extensions.insert(name.into(), Arc::new(extension));
        self
    }

    /// Registers a named interceptor for installation into the chain.
    pub fn register_interceptor<I>(&mut self, name: impl Into<String>, interceptor: I) -> &mut Self
    where
        I: Interceptor + 'static,
    {
        self.interceptors.insert(name.into(), Arc::new(interceptor));
        self
    }

    /// Registry extension names in registration order.
    pub fn registry_extension_names(&self) -> Vec<String> {
        self.registry_extensions.keys().cloned().collect()
    }

    /// Definition extension names in registration order.
    pub fn definition_extension_names(&self) -> Vec<String> {
        self.definition_extensions.keys().cloned().collect()
    }

    /// Interceptor names in registration order.
    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors.keys().cloned().collect()
    }

    pub(crate) fn registry_extensions(&self) -> Vec<(String, Arc<dyn RegistryExtension>)> {
        self.registry_extensions
            .iter()
            .map(|(name, ext)| (name.clone(), ext.clone()))
            .collect()
    }

    pub(crate) fn definition_extensions(&self) -> Vec<(String, Arc<dyn DefinitionExtension>)> {
        self.definition_extensions
            .iter()
            .map(|(name, ext)| (name.clone(), ext.clone()))
            .collect()
    }

    pub(crate) fn interceptors(&self) -> Vec<(String, Arc<dyn Interceptor>)> {
        self.interceptors
            .iter()
            .map(|(name, ic)| (name.clone(), ic.clone()))
            .collect()
    }
}

impl fmt::Debug for DefinitionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionRegistry")
            .field("id", &self.id)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("registry_extensions", &self.registry_extensions.keys().collect::<Vec<_>>())
            .field("definition_extensions", &self.definition_extensions.keys().collect::<Vec<_>>())
            .field("interceptors", &self.interceptors.keys().collect::<Vec<_>>())
            .finish()
    }
}
