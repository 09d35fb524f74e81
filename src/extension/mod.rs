//! Bootstrap extensions and creation interceptors.
//!
//! Three extension variants plug into the container:
//!
//! - [`RegistryExtension`]s run first and may add definitions, including
//!   further registry extensions, which are discovered until a fixed point;
//! - [`DefinitionExtension`]s run once every registry extension is done and
//!   may rewrite the final set of definitions;
//! - [`Interceptor`]s wrap the initialization of every component created
//!   afterwards.
//!
//! Every variant carries the [`Ordered`] capability tag, which decides the
//! tier and the position inside the tier.

use crate::definition::DefinitionRegistry;
use crate::error::LifecycleResult;
use crate::registry::Instance;
use crate::traits::Ordered;

mod interceptor;
mod orchestrator;

pub use interceptor::InterceptorChain;
pub use orchestrator::{ExtensionOrchestrator, ExtensionReport, PresuppliedExtension};

/// Extension that adjusts the definition set once it is complete.
pub trait DefinitionExtension: Ordered + Send + Sync {
    /// Adjusts the definitions.
    fn finalize(&self, definitions: &mut DefinitionRegistry) -> LifecycleResult<()>;
}

/// Extension that may register further definitions and extensions.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{
///     ComponentDefinition, DefinitionRegistry, ExtensionOrchestrator, LifecycleResult,
///     Ordered, Precedence, RegistryExtension,
/// };
///
/// struct ScanPackages;
///
/// impl Ordered for ScanPackages {
///     fn precedence(&self) -> Precedence {
///         Precedence::Priority(0)
///     }
/// }
///
/// impl RegistryExtension for ScanPackages {
///     fn extend_registry(&self, definitions: &mut DefinitionRegistry) -> LifecycleResult<()> {
///         definitions.register(ComponentDefinition::typed("scanned", |_| Ok(1u8)));
///         Ok(())
///     }
/// }
///
/// let mut definitions = DefinitionRegistry::new();
/// definitions.register_registry_extension("scan", ScanPackages);
///
/// let report = ExtensionOrchestrator::new()
///     .invoke_registry_extensions(&mut definitions, &[])
///     .unwrap();
/// assert_eq!(report.registry_phase, vec!["scan".to_string()]);
/// assert!(definitions.contains("scanned"));
/// ```
pub trait RegistryExtension: Ordered + Send + Sync {
    /// Registers additional definitions or extensions.
    fn extend_registry(&self, definitions: &mut DefinitionRegistry) -> LifecycleResult<()>;

    /// Secondary callback, run after every registry extension has extended the registry.
    fn finalize(&self, _definitions: &mut DefinitionRegistry) -> LifecycleResult<()> {
        Ok(())
    }
}

/// Hook around the initialization of every component.
///
/// All hooks default to passing the instance through unchanged. A hook that
/// returns a different instance replaces what the container exposes.
pub trait Interceptor: Ordered + Send + Sync {
    /// Runs after wiring, before the component's init hook.
    fn before_init(&self, _name: &str, instance: Instance) -> LifecycleResult<Instance> {
        Ok(instance)
    }

    /// Runs after the component's init hook.
    fn after_init(&self, _name: &str, instance: Instance) -> LifecycleResult<Instance> {
        Ok(instance)
    }

    /// Produces the reference handed out to a cyclic collaborator before the
    /// component is finished.
    fn early_reference(&self, _name: &str, instance: Instance) -> LifecycleResult<Instance> {
        Ok(instance)
    }

    /// Internal interceptors are installed at the tail of the chain.
    fn is_internal(&self) -> bool {
        false
    }
}
