/// Container integration tests
///
/// End-to-end creation pipeline: definitions, collaborator wiring, optional
/// collaborators, observers and runtime registration.

use ferrous_lifecycle::{
    ComponentDefinition, ComponentResolver, ContainerBuilder, ContainerConfig, DefinitionRegistry, DisposeFn,
    LifecycleError, LifecycleObserver,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

// ===== Test Components =====

#[derive(Debug)]
struct Settings {
    url: String,
}

#[derive(Debug)]
struct Pool {
    settings: Arc<Settings>,
    closed: AtomicBool,
}

struct Repository {
    pool: Arc<Pool>,
    cache: OnceLock<Option<Arc<String>>>,
}

fn application() -> DefinitionRegistry {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("settings", |_| {
        Ok(Settings {
            url: "postgres://localhost/app".to_string(),
        })
    }));
    definitions.register(
        ComponentDefinition::typed("pool", |ctx| {
            Ok(Pool {
                settings: ctx.get_typed::<Settings>("settings")?,
                closed: AtomicBool::new(false),
            })
        })
        .dispose_as::<Pool, _>(|pool| {
            pool.closed.store(true, Ordering::SeqCst);
            Ok(())
        }),
    );
    definitions.register(
        ComponentDefinition::typed("repository", |ctx| {
            Ok(Repository {
                pool: ctx.get_typed::<Pool>("pool")?,
                cache: OnceLock::new(),
            })
        })
        .populate_as::<Repository, _>(|repo, ctx| {
            let _ = repo.cache.set(ctx.get_optional_typed::<String>("cache")?);
            Ok(())
        }),
    );
    definitions
}

#[test]
fn test_full_application_wires_and_shuts_down() {
    let container = ContainerBuilder::new().build(application()).unwrap();

    let repository = container.get_typed::<Repository>("repository").unwrap();
    assert_eq!(repository.pool.settings.url, "postgres://localhost/app");
    assert_eq!(repository.cache.get(), Some(&None));
    assert_eq!(container.registry().names(), vec!["settings", "pool", "repository"]);

    let pool = repository.pool.clone();
    container.destroy_all();
    assert!(pool.closed.load(Ordering::SeqCst));
    assert_eq!(container.registry().count(), 0);
}

#[test]
fn test_optional_collaborator_resolves_when_present() {
    let mut definitions = application();
    definitions.register(ComponentDefinition::typed("cache", |_| Ok(String::from("redis"))));
    let container = ContainerBuilder::new().build(definitions).unwrap();

    let repository = container.get_typed::<Repository>("repository").unwrap();
    assert_eq!(repository.cache.get().unwrap().as_deref().map(String::as_str), Some("redis"));
    assert!(container.registry().dependents_of("cache").contains(&"repository".to_string()));
}

#[test]
fn test_failed_optional_collaborator_is_suppressed_and_reported() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("metrics", |_| {
        Err::<u8, _>(LifecycleError::factory("metrics", "exporter unreachable"))
    }));
    definitions.register(ComponentDefinition::typed("service", |ctx| {
        let metrics = ctx.get_optional("metrics")?;
        assert!(metrics.is_none());
        Err::<u8, _>(LifecycleError::factory("service", "missing license"))
    }));
    let container = ContainerBuilder::new()
        .config(ContainerConfig::default().preinstantiate(false))
        .build(definitions)
        .unwrap();

    let err = container.get("service").unwrap_err();

    assert!(matches!(err.root_cause(), LifecycleError::Factory { name, .. } if name == "service"));
    assert_eq!(err.related().len(), 1);
    assert!(matches!(&err.related()[0], LifecycleError::Factory { name, .. } if name == "metrics"));
}

#[test]
fn test_missing_collaborator_names_requesting_component() {
    let mut definitions = DefinitionRegistry::new();
    definitions.register(ComponentDefinition::typed("service", |ctx| {
        ctx.get("database")?;
        Ok(())
    }));

    let err = ContainerBuilder::new().build(definitions).unwrap_err();

    assert_eq!(err.component_name(), Some("service"));
    assert!(matches!(err.root_cause(), LifecycleError::NotDefined(n) if n == "database"));
    assert!(err.to_string().contains("service"));
}

#[test]
fn test_typed_lookup_reports_mismatch() {
    let container = ContainerBuilder::new().build(application()).unwrap();
    let err = container.get_typed::<Pool>("settings").unwrap_err();
    assert!(matches!(err, LifecycleError::TypeMismatch { ref name, .. } if name == "settings"));
}

#[test]
fn test_runtime_definitions_and_instances() {
    let container = ContainerBuilder::new().build(DefinitionRegistry::new()).unwrap();
    container.register_definition(ComponentDefinition::typed("late", |_| Ok(7u32)));
    container.register_instance("external", Arc::new(String::from("from outside"))).unwrap();

    assert!(container.contains("late"));
    assert!(!container.registry().contains("late"));
    assert_eq!(*container.get_typed::<u32>("late").unwrap(), 7);
    assert_eq!(container.get_typed::<String>("external").unwrap().as_str(), "from outside");

    let err = container.register_instance("external", Arc::new(String::from("again"))).unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyBound(_)));
}

#[test]
fn test_manual_disposal_and_dependency_registration() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let container = ContainerBuilder::new().build(DefinitionRegistry::new()).unwrap();
    container.register_instance("socket", Arc::new(0u16)).unwrap();
    container.register_instance("session", Arc::new(1u16)).unwrap();
    for name in ["socket", "session"] {
        let log = log.clone();
        container.register_disposal(
            name,
            DisposeFn::new(move || {
                log.lock().push(name);
                Ok(())
            }),
        );
    }
    container.register_dependency("socket", "session");

    container.destroy("socket");

    assert_eq!(*log.lock(), vec!["session", "socket"]);
}

#[derive(Default)]
struct Timeline(Mutex<Vec<String>>);

impl LifecycleObserver for Timeline {
    fn creating(&self, name: &str) {
        self.0.lock().push(format!("creating:{name}"));
    }

    fn created(&self, name: &str, _duration: Duration) {
        self.0.lock().push(format!("created:{name}"));
    }

    fn creation_failed(&self, name: &str, _error: &LifecycleError) {
        self.0.lock().push(format!("failed:{name}"));
    }

    fn destroyed(&self, name: &str) {
        self.0.lock().push(format!("destroyed:{name}"));
    }
}

#[test]
fn test_observers_follow_nested_creation() {
    let timeline = Arc::new(Timeline::default());
    let container = ContainerBuilder::new()
        .observer(timeline.clone())
        .build(application())
        .unwrap();
    container.destroy_all();

    assert_eq!(
        *timeline.0.lock(),
        vec![
            "creating:settings",
            "created:settings",
            "creating:pool",
            "created:pool",
            "creating:repository",
            "created:repository",
            "destroyed:pool",
        ]
    );
}

#[test]
fn test_container_clones_share_registry() {
    let container = ContainerBuilder::new().build(application()).unwrap();
    let clone = container.clone();

    let a = container.get("pool").unwrap();
    let b = clone.get("pool").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    drop(clone);
    container.destroy_all();
}
