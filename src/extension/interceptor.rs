use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::Interceptor;
use crate::error::LifecycleResult;
use crate::registry::Instance;

/// Ordered chain of named interceptors.
///
/// Adding an interceptor under a name already present moves it to the tail.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Interceptor, InterceptorChain, Ordered};
///
/// struct Audit;
/// impl Ordered for Audit {}
/// impl Interceptor for Audit {}
///
/// let mut chain = InterceptorChain::new();
/// chain.add("audit", Audit);
/// chain.add("metrics", Audit);
/// chain.add("audit", Audit);
/// assert_eq!(chain.names(), vec!["metrics", "audit"]);
/// ```
#[derive(Clone, Default)]
pub struct InterceptorChain {
    entries: Vec<(String, Arc<dyn Interceptor>)>,
}

impl InterceptorChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor, removing a previous one with the same name.
    pub fn add<I>(&mut self, name: impl Into<String>, interceptor: I)
    where
        I: Interceptor + 'static,
    {
        self.add_arc(name.into(), Arc::new(interceptor));
    }

    pub(crate) fn add_arc(&mut self, name: String, interceptor: Arc<dyn Interceptor>) {
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, interceptor));
    }

    /// Interceptor names in invocation order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of interceptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Threads `instance` through every `before_init` hook.
    pub fn apply_before_init(&self, name: &str, instance: Instance) -> LifecycleResult<Instance> {
        self.entries.iter().try_fold(instance, |current, (ic, interceptor)| {
            trace!(component = name, interceptor = %ic, "before init");
            interceptor.before_init(name, current)
        })
    }

    /// Threads `instance` through every `after_init` hook.
    pub fn apply_after_init(&self, name: &str, instance: Instance) -> LifecycleResult<Instance> {
        self.entries.iter().try_fold(instance, |current, (ic, interceptor)| {
            trace!(component = name, interceptor = %ic, "after init");
            interceptor.after_init(name, current)
        })
    }

    /// Threads `instance` through every `early_reference` hook.
    pub fn apply_early_reference(&self, name: &str, instance: Instance) -> LifecycleResult<Instance> {
        self.entries
            .iter()
            .try_fold(instance, |current, (_, interceptor)| interceptor.early_reference(name, current))
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(name, _)| name)).finish()
    }
}
