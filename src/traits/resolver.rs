//! Resolver traits for component lookup by name.

use std::any::Any;
use std::sync::Arc;

use crate::error::{LifecycleError, LifecycleResult};
use crate::registry::Instance;

/// Object-safe core of component resolution.
///
/// Implemented by [`Container`](crate::Container) for top-level lookups and by
/// [`CreationContext`](crate::CreationContext) for lookups made while another
/// component is being created. Most callers use [`ComponentResolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves `name`, creating it if it has a definition and is not finished.
    fn resolve_instance(&self, name: &str) -> LifecycleResult<Instance>;

    /// Resolves `name` if it is known, swallowing resolution failures.
    ///
    /// Returns `Ok(None)` for names that are neither defined nor registered.
    fn resolve_optional_instance(&self, name: &str) -> LifecycleResult<Option<Instance>>;
}

/// Ergonomic, typed resolution built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentDefinition, ComponentResolver, ContainerBuilder, DefinitionRegistry};
///
/// let mut definitions = DefinitionRegistry::new();
/// definitions.register(ComponentDefinition::typed("answer", |_| Ok(42u32)));
///
/// let container = ContainerBuilder::new().build(definitions).unwrap();
/// assert_eq!(*container.get_typed::<u32>("answer").unwrap(), 42);
/// assert!(container.get_typed::<String>("answer").is_err());
/// assert!(container.get_optional("missing").unwrap().is_none());
/// ```
pub trait ComponentResolver: ResolverCore {
    /// Resolves `name` as a type-erased instance.
    fn get(&self, name: &str) -> LifecycleResult<Instance> {
        self.resolve_instance(name)
    }

    /// Resolves `name` and downcasts it to `T`.
    ///
    /// Fails with [`LifecycleError::TypeMismatch`] if the instance is not a `T`.
    fn get_typed<T: Any + Send + Sync>(&self, name: &str) -> LifecycleResult<Arc<T>> {
        downcast(name, self.resolve_instance(name)?)
    }

    /// Resolves `name` if it is known, returning `None` instead of failing.
    fn get_optional(&self, name: &str) -> LifecycleResult<Option<Instance>> {
        self.resolve_optional_instance(name)
    }

    /// Typed variant of [`get_optional`](Self::get_optional).
    ///
    /// A type mismatch is still reported as an error.
    fn get_optional_typed<T: Any + Send + Sync>(&self, name: &str) -> LifecycleResult<Option<Arc<T>>> {
        self.resolve_optional_instance(name)?
            .map(|instance| downcast(name, instance))
            .transpose()
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, instance: Instance) -> LifecycleResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| LifecycleError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
    })
}
