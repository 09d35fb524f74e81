//! Bootstrap phases for registry extensions, definition extensions and
//! interceptors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::{DefinitionExtension, InterceptorChain, RegistryExtension};
use crate::definition::DefinitionRegistry;
use crate::error::{LifecycleError, LifecycleResult};
use crate::traits::{sort_by_precedence, Tier};

/// Extension handed to the orchestrator directly rather than discovered in
/// the definition registry.
///
/// Pre-supplied extensions run before anything discovered, in supplied order.
#[derive(Clone)]
pub enum PresuppliedExtension {
    /// Runs in the registry phase; its `finalize` runs with the others.
    Registry(Arc<dyn RegistryExtension>),
    /// Runs first among the definition extensions.
    Definition(Arc<dyn DefinitionExtension>),
}

impl PresuppliedExtension {
    /// Wraps a registry extension.
    pub fn registry<E: RegistryExtension + 'static>(extension: E) -> Self {
        PresuppliedExtension::Registry(Arc::new(extension))
    }

    /// Wraps a definition extension.
    pub fn definition<E: DefinitionExtension + 'static>(extension: E) -> Self {
        PresuppliedExtension::Definition(Arc::new(extension))
    }
}

impl fmt::Debug for PresuppliedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresuppliedExtension::Registry(_) => f.write_str("Registry(..)"),
            PresuppliedExtension::Definition(_) => f.write_str("Definition(..)"),
        }
    }
}

/// What ran during [`ExtensionOrchestrator::invoke_registry_extensions`], in order.
///
/// Pre-supplied extensions are labelled `presupplied#<index>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionReport {
    /// Registry extensions, in the order `extend_registry` ran.
    pub registry_phase: Vec<String>,
    /// Definition extensions, in the order `finalize` ran.
    pub definition_phase: Vec<String>,
}

/// Runs the bootstrap phases.
///
/// Both phases run inside one invocation, at most once per definition
/// registry. A second attempt fails with
/// [`LifecycleError::DuplicateInvocation`] before any extension or `finalize`
/// callback runs again.
#[derive(Debug, Default)]
pub struct ExtensionOrchestrator {
    invoked: HashSet<u64>,
}

impl ExtensionOrchestrator {
    /// Creates an orchestrator that has not processed any registry yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the registry phase already ran against the registry with `id`.
    pub fn has_processed(&self, id: u64) -> bool {
        self.invoked.contains(&id)
    }

    /// Runs every registry extension, then every definition extension.
    ///
    /// Registry extensions run tier by tier: pre-supplied, priority, ordered,
    /// then unordered until a discovery pass finds nothing new. Their
    /// `finalize` callbacks follow in run order. Definition extensions then
    /// run: pre-supplied first, then discovered ones tier by tier.
    pub fn invoke_registry_extensions(
        &mut self,
        definitions: &mut DefinitionRegistry,
        presupplied: &[PresuppliedExtension],
    ) -> LifecycleResult<ExtensionReport> {
        let id = definitions.id();
        if !self.invoked.insert(id) {
            return Err(LifecycleError::DuplicateInvocation { registry: id });
        }

        let mut report = ExtensionReport::default();
        let mut processed: HashSet<String> = HashSet::new();
        let mut ran: Vec<Arc<dyn RegistryExtension>> = Vec::new();
        let mut presupplied_definition = Vec::new();

        for (index, extension) in presupplied.iter().enumerate() {
            let label = format!("presupplied#{index}");
            match extension {
                PresuppliedExtension::Registry(ext) => {
                    debug!(extension = %label, "running pre-supplied registry extension");
                    ext.extend_registry(definitions)?;
                    ran.push(ext.clone());
                    report.registry_phase.push(label);
                }
                PresuppliedExtension::Definition(ext) => {
                    presupplied_definition.push((label, ext.clone()));
                }
            }
        }

        // Priority tier, then ordered tier. Priority extensions registered by
        // the priority tier are only picked up together with the ordered tier.
        self.run_registry_pass(definitions, &mut processed, &mut ran, &mut report, |tier| {
            tier == Tier::Priority
        })?;
        self.run_registry_pass(definitions, &mut processed, &mut ran, &mut report, |tier| {
            tier != Tier::Unordered
        })?;
        let mut passes = 0usize;
        while self.run_registry_pass(definitions, &mut processed, &mut ran, &mut report, |_| true)? {
            passes += 1;
        }
        debug!(passes, "registry extension discovery reached a fixed point");

        for ext in &ran {
            ext.finalize(definitions)?;
        }

        for (label, ext) in presupplied_definition {
            ext.finalize(definitions)?;
            report.definition_phase.push(label);
        }

        let discovered = definitions.definition_extensions();
        for tier in [Tier::Priority, Tier::Ordered, Tier::Unordered] {
            let mut batch: Vec<_> = discovered
                .iter()
                .filter(|(_, ext)| ext.precedence().tier() == tier)
                .cloned()
                .collect();
            sort_by_precedence(&mut batch, |(_, ext)| ext.precedence());
            for (name, ext) in batch {
                debug!(extension = %name, "running definition extension");
                ext.finalize(definitions)?;
                report.definition_phase.push(name);
            }
        }

        info!(
            registry_id = id,
            registry_extensions = report.registry_phase.len(),
            definition_extensions = report.definition_phase.len(),
            definitions = definitions.len(),
            "extension phases complete"
        );
        Ok(report)
    }

    /// One discovery-sort-run cycle. Returns true if anything ran.
    fn run_registry_pass(
        &self,
        definitions: &mut DefinitionRegistry,
        processed: &mut HashSet<String>,
        ran: &mut Vec<Arc<dyn RegistryExtension>>,
        report: &mut ExtensionReport,
        admit: impl Fn(Tier) -> bool,
    ) -> LifecycleResult<bool> {
        let mut batch: Vec<_> = definitions
            .registry_extensions()
            .into_iter()
            .filter(|(name, ext)| !processed.contains(name) && admit(ext.precedence().tier()))
            .collect();
        if batch.is_empty() {
            return Ok(false);
        }
        for (name, _) in &batch {
            processed.insert(name.clone());
        }
        sort_by_precedence(&mut batch, |(_, ext)| ext.precedence());

        for (name, ext) in batch {
            debug!(extension = %name, "running registry extension");
            ext.extend_registry(definitions)?;
            ran.push(ext);
            report.registry_phase.push(name);
        }
        Ok(true)
    }

    /// Installs every interceptor registered in `definitions` into `chain`.
    ///
    /// Priority interceptors go first, then ordered, then unordered in
    /// registration order. Internal interceptors are re-added at the tail,
    /// sorted among themselves.
    pub fn install_interceptors(&self, definitions: &DefinitionRegistry, chain: &mut InterceptorChain) {
        let mut priority = Vec::new();
        let mut ordered = Vec::new();
        let mut unordered = Vec::new();
        let mut internal = Vec::new();

        for (name, interceptor) in definitions.interceptors() {
            if interceptor.is_internal() {
                internal.push((name.clone(), interceptor.clone()));
            }
            match interceptor.precedence().tier() {
                Tier::Priority => priority.push((name, interceptor)),
                Tier::Ordered => ordered.push((name, interceptor)),
                Tier::Unordered => unordered.push((name, interceptor)),
            }
        }

        sort_by_precedence(&mut priority, |(_, ic)| ic.precedence());
        sort_by_precedence(&mut ordered, |(_, ic)| ic.precedence());
        sort_by_precedence(&mut internal, |(_, ic)| ic.precedence());

        for (name, interceptor) in priority.into_iter().chain(ordered).chain(unordered).chain(internal) {
            chain.add_arc(name, interceptor);
        }
        info!(interceptors = chain.len(), chain = ?chain, "interceptor chain installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Interceptor;
    use crate::traits::{Ordered, Precedence};

    struct Tagged(Precedence, bool);

    impl Ordered for Tagged {
        fn precedence(&self) -> Precedence {
            self.0
        }
    }

    impl Interceptor for Tagged {
        fn is_internal(&self) -> bool {
            self.1
        }
    }

    #[test]
    fn internal_interceptors_move_to_tail() {
        let mut definitions = DefinitionRegistry::new();
        definitions.register_interceptor("plain", Tagged(Precedence::Unordered, false));
        definitions.register_interceptor("internal", Tagged(Precedence::Priority(-10), true));
        definitions.register_interceptor("ordered", Tagged(Precedence::Ordered(1), false));
        definitions.register_interceptor("first", Tagged(Precedence::Priority(0), false));

        let mut chain = InterceptorChain::new();
        ExtensionOrchestrator::new().install_interceptors(&definitions, &mut chain);

        assert_eq!(chain.names(), vec!["first", "ordered", "plain", "internal"]);
    }

    #[test]
    fn second_invocation_is_rejected() {
        let mut definitions = DefinitionRegistry::new();
        let mut orchestrator = ExtensionOrchestrator::new();
        orchestrator.invoke_registry_extensions(&mut definitions, &[]).unwrap();
        assert!(orchestrator.has_processed(definitions.id()));

        let err = orchestrator
            .invoke_registry_extensions(&mut definitions, &[])
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateInvocation { registry } if registry == definitions.id()));
    }
}
