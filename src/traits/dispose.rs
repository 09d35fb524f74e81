//! Disposal capability for component teardown.

/// Trait for synchronous component disposal.
///
/// Implement this trait for components that need structured teardown (e.g.
/// flushing caches, closing connections). Disposal callbacks are invoked by
/// the destruction coordinator after every dependent component has already
/// been destroyed. Failures are logged and never abort the shutdown.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentRegistry, Dispose};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> anyhow::Result<()> {
///         self.flushed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let registry = ComponentRegistry::new();
/// let cache = Arc::new(Cache { flushed: AtomicBool::new(false) });
/// registry.register_finished("cache", cache.clone()).unwrap();
/// registry.register_disposable("cache", cache.clone());
///
/// registry.destroy_all();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release the resources held by the component.
    fn dispose(&self) -> anyhow::Result<()>;
}

/// Adapter turning a closure into a [`Dispose`] implementation.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{ComponentRegistry, DisposeFn};
///
/// let registry = ComponentRegistry::new();
/// registry.register_disposable("pool", DisposeFn::new(|| {
///     println!("closing pool");
///     Ok(())
/// }));
/// registry.destroy_all();
/// ```
pub struct DisposeFn<F> {
    f: F,
}

impl<F> DisposeFn<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Dispose for DisposeFn<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn dispose(&self) -> anyhow::Result<()> {
        (self.f)()
    }
}

impl<T> Dispose for std::sync::Arc<T>
where
    T: Dispose + ?Sized,
{
    fn dispose(&self) -> anyhow::Result<()> {
        (**self).dispose()
    }
}
