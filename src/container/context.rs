//! Creation context passed to definition callbacks.

use std::fmt;

use super::Container;
use crate::error::{LifecycleError, LifecycleResult};
use crate::registry::Instance;
use crate::traits::{ComponentResolver, Dispose, ResolverCore};

/// Resolver handed to the callbacks of a [`ComponentDefinition`](crate::ComponentDefinition)
/// while its component is being created.
///
/// Every collaborator resolved through the context is recorded as a
/// dependency of the component under construction, so it outlives it during
/// destruction. Failures are reported as a creation failure of the current
/// component wrapping the collaborator's error.
pub struct CreationContext<'a> {
    container: &'a Container,
    current: &'a str,
}

impl<'a> CreationContext<'a> {
    pub(crate) fn new(container: &'a Container, current: &'a str) -> Self {
        Self { container, current }
    }

    /// Name of the component being created.
    pub fn current(&self) -> &str {
        self.current
    }

    /// The container creating the component.
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Registers a disposal callback for the component being created.
    ///
    /// A disposal hook declared on the definition takes precedence.
    pub fn register_disposal<D: Dispose>(&self, disposable: D) {
        self.container.register_disposal(self.current, disposable);
    }

    /// Records that the component being created contains `inner`.
    ///
    /// `inner` is destroyed right after the current component.
    pub fn register_contained(&self, inner: &str) {
        self.container.registry().record_containment(inner, self.current);
    }
}

impl ResolverCore for CreationContext<'_> {
    fn resolve_instance(&self, name: &str) -> LifecycleResult<Instance> {
        self.container
            .resolve(name, Some(self.current))
            .map_err(|err| LifecycleError::Creation {
                name: self.current.to_string(),
                source: Box::new(err),
                related: Vec::new(),
            })
    }

    fn resolve_optional_instance(&self, name: &str) -> LifecycleResult<Option<Instance>> {
        self.container.resolve_optional(name, Some(self.current))
    }
}

impl ComponentResolver for CreationContext<'_> {}

impl fmt::Debug for CreationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreationContext").field("current", &self.current).finish()
    }
}
