/// Circular reference tests
///
/// Setter-wired cycles resolve through early references; constructor-style
/// cycles and depends-on cycles fail with a named error.

use ferrous_lifecycle::{
    ComponentDefinition, ComponentResolver, Container, ContainerBuilder, ContainerConfig, DefinitionRegistry,
    Instance, Interceptor, LifecycleError, LifecycleResult, Ordered,
};
use std::sync::{Arc, OnceLock};

#[derive(Default)]
struct Node {
    peer: OnceLock<Arc<Node>>,
}

fn setter_node(name: &str, peer: &'static str) -> ComponentDefinition {
    ComponentDefinition::typed(name, |_| Ok(Node::default())).populate_as::<Node, _>(move |node, ctx| {
        let _ = node.peer.set(ctx.get_typed::<Node>(peer)?);
        Ok(())
    })
}

fn constructor_node(name: &str, peer: &'static str) -> ComponentDefinition {
    ComponentDefinition::typed(name, move |ctx| {
        let node = Node::default();
        let _ = node.peer.set(ctx.get_typed::<Node>(peer)?);
        Ok(node)
    })
}

fn build(definitions: DefinitionRegistry, config: ContainerConfig) -> Container {
    ContainerBuilder::new()
        .config(config.preinstantiate(false))
        .build(definitions)
        .unwrap()
}

#[test]
fn test_setter_cycle_resolves_to_finished_instances() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(setter_node("a", "b"));
    definitions.register(setter_node("b", "a"));
    let container = build(definitions, ContainerConfig::default());

    let a = container.get_typed::<Node>("a").unwrap();
    let b = container.get_typed::<Node>("b").unwrap();

    assert!(Arc::ptr_eq(a.peer.get().unwrap(), &b));
    assert!(Arc::ptr_eq(b.peer.get().unwrap(), &a));
    assert!(container.registry().names_in_creation().is_empty());
    assert!(container.registry().lookup("a", false).unwrap().is_some());
}

#[test]
fn test_setter_cycle_records_edges_both_ways() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(setter_node("a", "b"));
    definitions.register(setter_node("b", "a"));
    let container = build(definitions, ContainerConfig::default());

    container.get("a").unwrap();

    assert_eq!(container.registry().dependents_of("a"), vec!["b".to_string()]);
    assert_eq!(container.registry().dependents_of("b"), vec!["a".to_string()]);
}

#[test]
fn test_constructor_cycle_fails_with_currently_in_creation() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(constructor_node("a", "b"));
    definitions.register(constructor_node("b", "a"));
    let container = build(definitions, ContainerConfig::default());

    let err = container.get("a").unwrap_err();

    assert!(err.is_currently_in_creation(), "unexpected error: {err}");
    let culprit = err.root_cause().component_name().unwrap();
    assert!(culprit == "a" || culprit == "b");
    assert!(!container.registry().contains("a"));
    assert!(!container.registry().contains("b"));
}

#[test]
fn test_setter_cycle_fails_when_circular_references_disabled() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(setter_node("a", "b"));
    definitions.register(setter_node("b", "a"));
    let container = build(definitions, ContainerConfig::default().allow_circular_references(false));

    let err = container.get("a").unwrap_err();
    assert!(err.is_currently_in_creation());
    assert!(container.registry().names().is_empty());
}

#[test]
fn test_depends_on_cycle_is_rejected() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("a", |_| Ok(1u8)).depends_on("b"));
    definitions.register(ComponentDefinition::typed("b", |_| Ok(2u8)).depends_on("a"));
    let container = build(definitions, ContainerConfig::default());

    let err = container.get("a").unwrap_err();
    assert!(
        matches!(err.root_cause(), LifecycleError::CircularDependsOn { name, dependency } if name == "b" && dependency == "a"),
        "unexpected error: {err}"
    );
}

#[test]
fn test_depends_on_creates_dependency_first() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("app", |_| Ok("app")).depends_on("schema"));
    definitions.register(ComponentDefinition::typed("schema", |_| Ok("schema")));
    let container = ContainerBuilder::new().build(definitions).unwrap();

    assert_eq!(container.registry().names(), vec!["schema".to_string(), "app".to_string()]);
    assert_eq!(container.registry().dependencies_of("app"), vec!["schema".to_string()]);
}

struct Wrapped(Instance);

#[derive(Default)]
struct Slot(OnceLock<Instance>);

fn slot_node(name: &str, peer: &'static str) -> ComponentDefinition {
    ComponentDefinition::typed(name, |_| Ok(Slot::default())).populate_as::<Slot, _>(move |slot, ctx| {
        let _ = slot.0.set(ctx.get(peer)?);
        Ok(())
    })
}

struct Proxying;

impl Ordered for Proxying {}

impl Interceptor for Proxying {
    fn early_reference(&self, _name: &str, instance: Instance) -> LifecycleResult<Instance> {
        Ok(Arc::new(Wrapped(instance)))
    }
}

#[test]
fn test_early_reference_hook_becomes_exposed_instance() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(slot_node("a", "b"));
    definitions.register(slot_node("b", "a"));
    definitions.register_interceptor("proxy", Proxying);
    let container = build(definitions, ContainerConfig::default());

    let a = container.get("a").unwrap();
    let b = container.get_typed::<Slot>("b").unwrap();

    assert!(a.downcast_ref::<Wrapped>().is_some());
    assert!(Arc::ptr_eq(b.0.get().unwrap(), &a));
}

struct Replacing;

impl Ordered for Replacing {}

impl Interceptor for Replacing {
    fn after_init(&self, name: &str, instance: Instance) -> LifecycleResult<Instance> {
        if name == "a" {
            return Ok(Arc::new(Wrapped(instance)));
        }
        Ok(instance)
    }
}

#[test]
fn test_replacing_after_early_exposure_is_a_mismatch() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(slot_node("a", "b"));
    definitions.register(slot_node("b", "a"));
    definitions.register_interceptor("replace", Replacing);
    let container = build(definitions, ContainerConfig::default());

    let err = container.get("a").unwrap_err();

    assert!(
        matches!(err.root_cause(), LifecycleError::EarlyReferenceMismatch(ref n) if n == "a"),
        "unexpected error: {err}"
    );
    assert!(!container.registry().contains("a"));
    assert!(!container.registry().contains("b"));
}

#[test]
fn test_replacing_without_cycle_is_allowed() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("a", |_| Ok(Slot::default())));
    definitions.register_interceptor("replace", Replacing);
    let container = build(definitions, ContainerConfig::default());

    assert!(container.get("a").unwrap().downcast_ref::<Wrapped>().is_some());
}
