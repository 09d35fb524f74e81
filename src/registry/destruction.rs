//! Destruction coordinator.
//!
//! Components are torn down dependents first, then the component itself,
//! then whatever it contains. Disposal failures are logged and swallowed so
//! a shutdown always runs to completion.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use super::ComponentRegistry;
use crate::traits::Dispose;

impl ComponentRegistry {
    /// Registers the disposal callback for `name`, replacing any previous one.
    pub fn register_disposable<D>(&self, name: &str, disposable: D)
    where
        D: Dispose,
    {
        self.register_disposable_arc(name, Arc::new(disposable));
    }

    /// Registers an already shared disposal callback for `name`.
    pub fn register_disposable_arc(&self, name: &str, disposable: Arc<dyn Dispose>) {
        self.disposables.lock().insert(name.to_string(), disposable);
    }

    /// True if a disposal callback is registered for `name`.
    pub fn has_disposable(&self, name: &str) -> bool {
        self.disposables.lock().contains_key(name)
    }

    /// Number of disposal callbacks not yet run.
    pub fn pending_disposables(&self) -> usize {
        self.disposables.lock().len()
    }

    /// Destroys every component with a disposal callback, newest first, then
    /// clears the dependency graph and all caches.
    ///
    /// While this runs, [`get_or_create`](Self::get_or_create) fails with
    /// [`CreationNotAllowed`](crate::LifecycleError::CreationNotAllowed).
    pub fn destroy_all(&self) {
        debug!(components = self.count(), "destroying components");
        self.with_state(|state| state.in_destruction = true);

        let names: Vec<String> = self.disposables.lock().keys().cloned().collect();
        for name in names.iter().rev() {
            self.destroy(name);
        }

        self.graph.lock().clear();
        self.with_state(|state| state.clear_caches());
    }

    /// Destroys `name`, every component depending on it, and everything it contains.
    pub fn destroy(&self, name: &str) {
        self.remove(name);
        let disposable = self.disposables.lock().shift_remove(name);
        self.destroy_component(name, disposable);
    }

    fn destroy_component(&self, name: &str, disposable: Option<Arc<dyn Dispose>>) {
        let dependents = self.graph.lock().take_dependents(name);
        if !dependents.is_empty() {
            debug!(component = name, ?dependents, "destroying dependents first");
        }
        for dependent in &dependents {
            self.destroy(dependent);
        }

        if let Some(disposable) = disposable {
            run_disposal(self, name, disposable.as_ref());
        }

        let contained = self.graph.lock().take_contained(name);
        for inner in &contained {
            self.destroy(inner);
        }

        self.graph.lock().forget(name);
    }
}

fn run_disposal(registry: &ComponentRegistry, name: &str, disposable: &dyn Dispose) {
    debug!(component = name, "invoking disposal callback");
    match catch_unwind(AssertUnwindSafe(|| disposable.dispose())) {
        Ok(Ok(())) => registry.observers().destroyed(name),
        Ok(Err(err)) => {
            error!(component = name, error = %err, "disposal callback failed");
            registry.observers().disposal_failed(name, &err.to_string());
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(component = name, panic = %message, "disposal callback panicked");
            registry.observers().disposal_failed(name, &message);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
