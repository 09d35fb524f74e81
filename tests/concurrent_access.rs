/// Concurrent access integration tests
///
/// The registry lock must make parallel creation of the same name produce a
/// single instance, and cross-thread early-reference lookups must wait for
/// the creating thread instead of racing it.

use ferrous_lifecycle::{
    ComponentDefinition, ComponentRegistry, ComponentResolver, ContainerBuilder, ContainerConfig, DefinitionRegistry,
    Instance,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;
use std::time::Duration;

#[test]
fn test_parallel_get_or_create_yields_one_instance() {
    let registry = ComponentRegistry::new();
    let calls = AtomicU32::new(0);
    let barrier = Barrier::new(8);

    let instances: Vec<Instance> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    registry
                        .get_or_create("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            Ok(Arc::new(String::from("shared")) as Instance)
                        })
                        .unwrap()
                        .into_instance()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_other_threads_never_observe_half_built_components() {
    #[derive(Default)]
    struct Node {
        peer: OnceLock<Arc<Node>>,
    }

    let mut definitions = DefinitionRegistry::new();
    for (name, peer) in [("left", "right"), ("right", "left")] {
        definitions.register(
            ComponentDefinition::typed(name, |_| Ok(Node::default())).populate_as::<Node, _>(move |node, ctx| {
                thread::sleep(Duration::from_millis(2));
                let _ = node.peer.set(ctx.get_typed::<Node>(peer)?);
                Ok(())
            }),
        );
    }
    let container = ContainerBuilder::new()
        .config(ContainerConfig::default().preinstantiate(false))
        .build(definitions)
        .unwrap();

    crossbeam_utils::thread::scope(|s| {
        for i in 0..6 {
            let name = if i % 2 == 0 { "left" } else { "right" };
            let container = &container;
            s.spawn(move |_| {
                let node = container.get_typed::<Node>(name).unwrap();
                // A finished node always has its peer wired.
                assert!(node.peer.get().is_some());
            });
        }
    })
    .unwrap();

    let left = container.get_typed::<Node>("left").unwrap();
    let right = container.get_typed::<Node>("right").unwrap();
    assert!(Arc::ptr_eq(left.peer.get().unwrap(), &right));
    assert!(Arc::ptr_eq(right.peer.get().unwrap(), &left));
}

#[test]
fn test_parallel_resolution_of_distinct_components() {
    let created = Arc::new(AtomicU32::new(0));
    let mut definitions = DefinitionRegistry::new();
    for i in 0..16 {
        let created = created.clone();
        definitions.register(
            ComponentDefinition::typed(format!("worker-{i}"), move |_| {
                created.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            })
            .lazy(),
        );
    }
    let container = ContainerBuilder::new().build(definitions).unwrap();

    crossbeam_utils::thread::scope(|s| {
        for t in 0..4 {
            let container = &container;
            s.spawn(move |_| {
                for i in 0..16 {
                    let value = container.get_typed::<i32>(&format!("worker-{}", (i + t) % 16)).unwrap();
                    assert_eq!(*value, (i + t) % 16);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 16);
    assert_eq!(container.registry().count(), 16);
}

#[test]
fn test_registry_lock_blocks_other_threads() {
    let registry = Arc::new(ComponentRegistry::new());
    let lock = registry.registry_lock();

    let worker = {
        let registry = registry.clone();
        thread::spawn(move || {
            registry
                .get_or_create("late", || Ok(Arc::new(1u8) as Instance))
                .unwrap();
        })
    };

    thread::sleep(Duration::from_millis(20));
    // Still held here, so the worker cannot have installed anything yet.
    assert!(!worker.is_finished());
    drop(lock);

    worker.join().unwrap();
    assert!(registry.contains("late"));
}
