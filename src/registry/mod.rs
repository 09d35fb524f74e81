//! Component registry: the three-tier instance cache.
//!
//! A name is resolved through three tiers:
//!
//! 1. **finished** instances, handed out to everyone;
//! 2. **early instances**, memoized results of an early-reference factory,
//!    visible only while the name is mid-construction;
//! 3. **early-reference factories**, registered by a construction episode as
//!    soon as its instance is safely referenceable.
//!
//! All three tiers and the creation guard share one reentrant lock. The lock
//! is held across the factory call in [`ComponentRegistry::get_or_create`]:
//! nested creations on the same thread re-enter it, other threads block until
//! the construction episode has installed its result.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, trace};

use crate::config::ContainerConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::graph::DependencyGraph;
use crate::internal::guard::CreationGuard;
use crate::observer::{LifecycleObserver, Observers};
use crate::traits::Dispose;

mod destruction;

/// Type-erased, shareable component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Deferred producer of an early reference, invoked at most once.
pub type EarlyReferenceFactory = Box<dyn Fn() -> LifecycleResult<Instance> + Send>;

/// Outcome of [`ComponentRegistry::get_or_create`].
#[derive(Clone)]
pub enum Materialized {
    /// The factory ran and its result was installed.
    Created(Instance),
    /// A finished instance already existed, or appeared while the factory ran.
    AlreadyPresent(Instance),
}

impl Materialized {
    /// The resolved instance, whichever way it was obtained.
    pub fn into_instance(self) -> Instance {
        match self {
            Materialized::Created(instance) | Materialized::AlreadyPresent(instance) => instance,
        }
    }

    /// Borrow of the resolved instance.
    pub fn instance(&self) -> &Instance {
        match self {
            Materialized::Created(instance) | Materialized::AlreadyPresent(instance) => instance,
        }
    }

    /// True if this call ran the factory and installed its result.
    pub fn is_created(&self) -> bool {
        matches!(self, Materialized::Created(_))
    }
}

impl std::fmt::Debug for Materialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Materialized::Created(_) => f.write_str("Created(..)"),
            Materialized::AlreadyPresent(_) => f.write_str("AlreadyPresent(..)"),
        }
    }
}

#[derive(Default)]
pub(crate) struct CacheState {
    finished: IndexMap<String, Instance>,
    early_factories: HashMap<String, EarlyReferenceFactory>,
    early_instances: HashMap<String, Instance>,
    guard: CreationGuard,
    suppressed: Option<Vec<LifecycleError>>,
    in_destruction: bool,
}

impl CacheState {
    fn add_finished(&mut self, name: &str, instance: Instance) {
        self.finished.insert(name.to_string(), instance);
        self.early_factories.remove(name);
        self.early_instances.remove(name);
    }

    fn purge(&mut self, name: &str) {
        self.finished.shift_remove(name);
        self.early_factories.remove(name);
        self.early_instances.remove(name);
    }

    fn clear_caches(&mut self) {
        self.finished.clear();
        self.early_factories.clear();
        self.early_instances.clear();
        self.in_destruction = false;
    }
}

/// Handle on the registry lock.
///
/// Collaborators running their own multi-step creation sequences hold this to
/// synchronize with the registry instead of introducing a second lock. The
/// lock is reentrant: registry operations called on the same thread while the
/// handle is held do not deadlock.
pub struct RegistryLock<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<CacheState>>,
}

/// Registry of named component instances.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::ComponentRegistry;
/// use std::sync::Arc;
///
/// let registry = ComponentRegistry::new();
/// let created = registry
///     .get_or_create("greeting", || Ok(Arc::new("hello".to_string())))
///     .unwrap();
/// assert!(created.is_created());
///
/// // Finished instances are never re-created.
/// let again = registry.get_or_create("greeting", || unreachable!()).unwrap();
/// assert!(!again.is_created());
/// assert!(Arc::ptr_eq(created.instance(), again.instance()));
/// ```
pub struct ComponentRegistry {
    state: ReentrantMutex<RefCell<CacheState>>,
    graph: Mutex<DependencyGraph>,
    disposables: Mutex<IndexMap<String, Arc<dyn Dispose>>>,
    observers: Observers,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(&ContainerConfig::default())
    }

    /// Creates an empty registry honoring the guard settings of `config`.
    pub fn with_config(config: &ContainerConfig) -> Self {
        let mut guard = CreationGuard::with_max_depth(config.max_creation_depth);
        for name in &config.exempt_names {
            guard.set_exempt(name, true);
        }
        Self {
            state: ReentrantMutex::new(RefCell::new(CacheState {
                guard,
                ..CacheState::default()
            })),
            graph: Mutex::new(DependencyGraph::new()),
            disposables: Mutex::new(IndexMap::new()),
            observers: Observers::new(),
        }
    }

    /// Adds a lifecycle observer. Must be called before the registry is shared.
    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.add(observer);
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Acquires the registry lock.
    pub fn registry_lock(&self) -> RegistryLock<'_> {
        RegistryLock {
            _guard: self.state.lock(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Installs a finished instance under `name`.
    ///
    /// Fails with [`LifecycleError::AlreadyBound`] if a different instance is
    /// already bound; re-registering the same instance is a no-op.
    pub fn register_finished(&self, name: &str, instance: Instance) -> LifecycleResult<()> {
        self.with_state(|state| {
            if let Some(existing) = state.finished.get(name) {
                if Arc::ptr_eq(existing, &instance) {
                    return Ok(());
                }
                return Err(LifecycleError::AlreadyBound(name.to_string()));
            }
            state.add_finished(name, instance);
            Ok(())
        })
    }

    /// Resolves `name` without creating it.
    ///
    /// Returns the finished instance if present. Otherwise, while `name` is in
    /// creation, returns its memoized early reference, or with
    /// `allow_early_reference` invokes the registered early-reference factory
    /// once and memoizes the result.
    pub fn lookup(&self, name: &str, allow_early_reference: bool) -> LifecycleResult<Option<Instance>> {
        let guard = self.state.lock();
        let factory = {
            let mut state = guard.borrow_mut();
            if let Some(instance) = state.finished.get(name) {
                return Ok(Some(instance.clone()));
            }
            if !state.guard.is_in_creation(name) {
                return Ok(None);
            }
            if let Some(early) = state.early_instances.get(name) {
                return Ok(Some(early.clone()));
            }
            if !allow_early_reference {
                return Ok(None);
            }
            match state.early_factories.remove(name) {
                Some(factory) => factory,
                None => return Ok(None),
            }
        };

        trace!(component = name, "materializing early reference");
        match factory() {
            Ok(early) => {
                guard
                    .borrow_mut()
                    .early_instances
                    .insert(name.to_string(), early.clone());
                Ok(Some(early))
            }
            Err(err) => {
                // Keep the factory for a retry unless it was replaced meanwhile.
                let mut state = guard.borrow_mut();
                if state.guard.is_in_creation(name) && !state.finished.contains_key(name) {
                    state.early_factories.entry(name.to_string()).or_insert(factory);
                }
                Err(err)
            }
        }
    }

    /// Returns the finished instance or runs `factory` to create it.
    ///
    /// Fails fast with [`LifecycleError::CreationNotAllowed`] during
    /// destruction and with [`LifecycleError::CurrentlyInCreation`] if `name`
    /// is already being created. If the factory fails, failures recorded via
    /// [`on_suppressed`](Self::on_suppressed) during this top-level attempt
    /// are attached as related causes.
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> LifecycleResult<Materialized>
    where
        F: FnOnce() -> LifecycleResult<Instance>,
    {
        let lock = self.state.lock();
        let record_suppressed = {
            let mut state = lock.borrow_mut();
            if let Some(existing) = state.finished.get(name) {
                return Ok(Materialized::AlreadyPresent(existing.clone()));
            }
            if state.in_destruction {
                return Err(LifecycleError::CreationNotAllowed(name.to_string()));
            }
            state.guard.before_create(name)?;
            let record = state.suppressed.is_none();
            if record {
                state.suppressed = Some(Vec::new());
            }
            record
        };

        debug!(component = name, "creating shared instance");
        let started = Instant::now();
        self.observers.creating(name);

        let ticket = CreationTicket::new(self, name, record_suppressed);
        let outcome = factory();
        let suppressed = ticket.release()?;

        let mut state = lock.borrow_mut();
        match outcome {
            Ok(instance) => {
                if let Some(existing) = state.finished.get(name) {
                    debug!(component = name, "instance appeared during creation, keeping it");
                    return Ok(Materialized::AlreadyPresent(existing.clone()));
                }
                state.add_finished(name, instance.clone());
                drop(state);
                let elapsed = started.elapsed();
                debug!(component = name, ?elapsed, "finished creating shared instance");
                self.observers.created(name, elapsed);
                Ok(Materialized::Created(instance))
            }
            Err(err) => {
                if let Some(existing) = state.finished.get(name) {
                    return Ok(Materialized::AlreadyPresent(existing.clone()));
                }
                state.early_factories.remove(name);
                state.early_instances.remove(name);
                drop(state);
                let err = err.with_related(name, suppressed);
                self.observers.creation_failed(name, &err);
                Err(err)
            }
        }
    }

    /// Publishes an early-reference factory for a name that is not finished yet.
    ///
    /// Replaces any previous factory for the name and discards an early
    /// reference already memoized from it. Returns false if `name` is
    /// already finished.
    pub fn register_early_reference_factory(&self, name: &str, factory: EarlyReferenceFactory) -> bool {
        self.with_state(|state| {
            if state.finished.contains_key(name) {
                return false;
            }
            state.early_factories.insert(name.to_string(), factory);
            state.early_instances.remove(name);
            true
        })
    }

    /// Records a failure swallowed while resolving a collaborator.
    ///
    /// Ignored unless a top-level creation is in progress.
    pub fn on_suppressed(&self, error: LifecycleError) {
        self.with_state(|state| {
            if let Some(list) = state.suppressed.as_mut() {
                list.push(error);
            }
        });
    }

    /// Purges `name` from all three tiers.
    pub fn remove(&self, name: &str) {
        self.with_state(|state| state.purge(name));
    }

    /// True if a finished instance is bound to `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.with_state(|state| state.finished.contains_key(name))
    }

    /// Finished names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.with_state(|state| state.finished.keys().cloned().collect())
    }

    /// Number of finished instances.
    pub fn count(&self) -> usize {
        self.with_state(|state| state.finished.len())
    }

    /// Opts `name` out of (or back into) the re-entrant creation check.
    pub fn set_exempt(&self, name: &str, exempt: bool) {
        self.with_state(|state| state.guard.set_exempt(name, exempt));
    }

    /// True if `name` is mid-construction and not exempt.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.with_state(|state| state.guard.is_currently_in_creation(name))
    }

    /// Names currently mid-construction, outermost first.
    pub fn names_in_creation(&self) -> Vec<String> {
        self.with_state(|state| state.guard.names_in_creation())
    }

    /// True while [`destroy_all`](Self::destroy_all) is running.
    pub fn is_in_destruction(&self) -> bool {
        self.with_state(|state| state.in_destruction)
    }

    /// Records that `dependent` depends on `dependee`.
    pub fn record_dependency(&self, dependee: &str, dependent: &str) {
        self.graph.lock().record_dependency(dependee, dependent);
    }

    /// Records that `outer` contains `inner`.
    pub fn record_containment(&self, inner: &str, outer: &str) {
        self.graph.lock().record_containment(inner, outer);
    }

    /// True if `candidate` depends on `subject`, directly or transitively.
    pub fn is_transitively_dependent(&self, subject: &str, candidate: &str) -> bool {
        self.graph.lock().is_transitively_dependent(subject, candidate)
    }

    /// Names that depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.graph.lock().dependents_of(name)
    }

    /// Names `name` depends on.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.graph.lock().dependencies_of(name)
    }

    /// Point-in-time copy of the dependency graph.
    pub fn graph_snapshot(&self) -> DependencyGraph {
        self.graph.lock().clone()
    }
}

/// Pairs a successful `before_create` with exactly one `after_create`.
///
/// Released explicitly on the normal path; the drop fallback covers a
/// panicking factory.
struct CreationTicket<'a> {
    registry: &'a ComponentRegistry,
    name: &'a str,
    record_suppressed: bool,
    released: bool,
}

impl<'a> CreationTicket<'a> {
    fn new(registry: &'a ComponentRegistry, name: &'a str, record_suppressed: bool) -> Self {
        Self {
            registry,
            name,
            record_suppressed,
            released: false,
        }
    }

    fn release(mut self) -> LifecycleResult<Vec<LifecycleError>> {
        self.released = true;
        let (name, record) = (self.name, self.record_suppressed);
        self.registry.with_state(|state| {
            let suppressed = if record {
                state.suppressed.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            state.guard.after_create(name)?;
            Ok(suppressed)
        })
    }
}

impl Drop for CreationTicket<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let (name, record) = (self.name, self.record_suppressed);
        self.registry.with_state(|state| {
            if record {
                state.suppressed = None;
            }
            let _ = state.guard.after_create(name);
            state.early_factories.remove(name);
            state.early_instances.remove(name);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Instance {
        Arc::new(value.to_string())
    }

    #[test]
    fn register_same_instance_twice_is_noop() {
        let registry = ComponentRegistry::new();
        let instance = text("a");
        registry.register_finished("a", instance.clone()).unwrap();
        registry.register_finished("a", instance).unwrap();
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn lookup_ignores_early_factory_when_not_in_creation() {
        let registry = ComponentRegistry::new();
        registry.register_early_reference_factory("a", Box::new(|| Ok(text("early"))));
        assert!(registry.lookup("a", true).unwrap().is_none());
    }

    #[test]
    fn failed_factory_leaves_no_residue() {
        let registry = ComponentRegistry::new();
        let err = registry
            .get_or_create("a", || {
                registry.register_early_reference_factory("a", Box::new(|| Ok(text("early"))));
                Err(LifecycleError::factory("a", "boom"))
            })
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Factory { .. }));
        assert!(!registry.contains("a"));
        assert!(!registry.is_currently_in_creation("a"));
        assert!(registry.lookup("a", true).unwrap().is_none());
    }

    #[test]
    fn instance_registered_during_creation_wins() {
        let registry = ComponentRegistry::new();
        let manual = text("manual");
        let outcome = registry
            .get_or_create("a", || {
                registry.register_finished("a", manual.clone())?;
                Ok(text("factory"))
            })
            .unwrap();

        assert!(!outcome.is_created());
        assert!(Arc::ptr_eq(outcome.instance(), &manual));
    }

    #[test]
    fn panicking_factory_releases_guard() {
        let registry = ComponentRegistry::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = registry.get_or_create("a", || panic!("factory exploded"));
        }));
        assert!(result.is_err());
        assert!(!registry.is_currently_in_creation("a"));
        assert!(registry.get_or_create("a", || Ok(text("ok"))).unwrap().is_created());
    }

    #[test]
    fn registry_lock_is_reentrant() {
        let registry = ComponentRegistry::new();
        let _lock = registry.registry_lock();
        registry.register_finished("a", text("a")).unwrap();
        assert!(registry.contains("a"));
    }
}
