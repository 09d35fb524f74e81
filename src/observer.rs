//! Lifecycle observers for creation and destruction traceability.
//!
//! Observers receive a callback for every creation episode and every disposal
//! the registry performs. They are meant for structured tracing, metrics and
//! post-mortem debugging of bootstrap and shutdown sequences.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::LifecycleError;

/// Observer trait for component lifecycle events.
///
/// Every method has an empty default so implementations only override what
/// they care about.
///
/// # Performance
///
/// Observer calls are made synchronously while the registry lock is held.
/// Keep implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentRegistry, LifecycleObserver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CreationLog(Mutex<Vec<String>>);
///
/// impl LifecycleObserver for CreationLog {
///     fn created(&self, name: &str, _duration: Duration) {
///         self.0.lock().unwrap().push(name.to_string());
///     }
/// }
///
/// let log = Arc::new(CreationLog::default());
/// let mut registry = ComponentRegistry::new();
/// registry.add_observer(log.clone());
///
/// registry.get_or_create("clock", || Ok(Arc::new(42u64))).unwrap();
/// assert_eq!(*log.0.lock().unwrap(), vec!["clock".to_string()]);
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called right before a component's factory runs.
    fn creating(&self, _name: &str) {}

    /// Called after a component was created and installed.
    fn created(&self, _name: &str, _duration: Duration) {}

    /// Called when a component's factory failed.
    fn creation_failed(&self, _name: &str, _error: &LifecycleError) {}

    /// Called after a component's disposal callback completed.
    fn destroyed(&self, _name: &str) {}

    /// Called when a disposal callback failed or panicked.
    fn disposal_failed(&self, _name: &str, _message: &str) {}
}

/// Container for registered observers.
///
/// Costs one branch per event when no observers are registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn creating(&self, name: &str) {
        if self.has_observers() {
            self.observers.iter().for_each(|o| o.creating(name));
        }
    }

    #[inline]
    pub(crate) fn created(&self, name: &str, duration: Duration) {
        if self.has_observers() {
            self.observers.iter().for_each(|o| o.created(name, duration));
        }
    }

    #[inline]
    pub(crate) fn creation_failed(&self, name: &str, error: &LifecycleError) {
        if self.has_observers() {
            self.observers.iter().for_each(|o| o.creation_failed(name, error));
        }
    }

    #[inline]
    pub(crate) fn destroyed(&self, name: &str) {
        if self.has_observers() {
            self.observers.iter().for_each(|o| o.destroyed(name));
        }
    }

    #[inline]
    pub(crate) fn disposal_failed(&self, name: &str, message: &str) {
        if self.has_observers() {
            self.observers.iter().for_each(|o| o.disposal_failed(name, message));
        }
    }
}

/// Built-in observer that forwards every event to `tracing`.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentRegistry, LoggingObserver};
/// use std::sync::Arc;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_observer(Arc::new(LoggingObserver::with_prefix("bootstrap")));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a logging observer with the default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-lifecycle".to_string(),
        }
    }

    /// Creates a logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for LoggingObserver {
    fn creating(&self, name: &str) {
        debug!(prefix = %self.prefix, component = name, "creating");
    }

    fn created(&self, name: &str, duration: Duration) {
        info!(prefix = %self.prefix, component = name, ?duration, "created");
    }

    fn creation_failed(&self, name: &str, error: &LifecycleError) {
        error!(prefix = %self.prefix, component = name, %error, "creation failed");
    }

    fn destroyed(&self, name: &str) {
        debug!(prefix = %self.prefix, component = name, "destroyed");
    }

    fn disposal_failed(&self, name: &str, message: &str) {
        error!(prefix = %self.prefix, component = name, reason = message, "disposal failed");
    }
}
