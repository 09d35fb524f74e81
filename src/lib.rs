//! # ferrous-lifecycle
//!
//! Named-component lifecycle container: creation, circular-reference
//! resolution through early references, dependency-ordered destruction and
//! phased bootstrap extensions.
//!
//! ## Features
//!
//! - **Three-tier cache**: finished instances, memoized early references and
//!   early-reference factories behind one reentrant registry lock
//! - **Cycle handling**: setter-wired cycles resolve through early references,
//!   constructor-style cycles fail with a named error instead of overflowing
//! - **Ordered destruction**: dependents are disposed before what they depend
//!   on; disposal failures are logged and never abort a shutdown
//! - **Bootstrap extensions**: registry extensions discovered to a fixed point,
//!   definition extensions and an ordered interceptor chain
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifecycle::{ComponentDefinition, ComponentResolver, ContainerBuilder, DefinitionRegistry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut definitions = DefinitionRegistry::new();
//! definitions.register(ComponentDefinition::typed("database", |_| {
//!     Ok(Database { url: "postgres://localhost".to_string() })
//! }));
//! definitions.register(ComponentDefinition::typed("users", |ctx| {
//!     Ok(UserService { db: ctx.get_typed::<Database>("database")? })
//! }));
//!
//! let container = ContainerBuilder::new().build(definitions).unwrap();
//! let users = container.get_typed::<UserService>("users").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//!
//! // "users" is destroyed before "database".
//! assert_eq!(container.registry().dependents_of("database"), vec!["users".to_string()]);
//! container.destroy_all();
//! ```
//!
//! ## Circular References
//!
//! A component becomes referenceable as soon as it is instantiated. A
//! collaborator wired in the `populate` step may therefore point back at it:
//!
//! ```rust
//! use ferrous_lifecycle::{ComponentDefinition, ComponentResolver, ContainerBuilder, DefinitionRegistry};
//! use std::sync::{Arc, OnceLock};
//!
//! #[derive(Default)]
//! struct Node {
//!     peer: OnceLock<Arc<Node>>,
//! }
//!
//! let mut definitions = DefinitionRegistry::new();
//! for (name, peer) in [("ping", "pong"), ("pong", "ping")] {
//!     definitions.register(
//!         ComponentDefinition::typed(name, |_| Ok(Node::default()))
//!             .populate_as::<Node, _>(move |node, ctx| {
//!                 let _ = node.peer.set(ctx.get_typed::<Node>(peer)?);
//!                 Ok(())
//!             }),
//!     );
//! }
//!
//! let container = ContainerBuilder::new().build(definitions).unwrap();
//! let ping = container.get_typed::<Node>("ping").unwrap();
//! let pong = container.get_typed::<Node>("pong").unwrap();
//! assert!(Arc::ptr_eq(ping.peer.get().unwrap(), &pong));
//! assert!(Arc::ptr_eq(pong.peer.get().unwrap(), &ping));
//! ```
//!
//! ## Using the Registry Directly
//!
//! [`ComponentRegistry`] works without definitions for callers that run
//! their own creation sequences:
//!
//! ```rust
//! use ferrous_lifecycle::{ComponentRegistry, DisposeFn};
//! use std::sync::Arc;
//!
//! let registry = ComponentRegistry::new();
//! registry.get_or_create("pool", || Ok(Arc::new(16usize))).unwrap();
//! registry.register_disposable("pool", DisposeFn::new(|| Ok(())));
//! registry.destroy_all();
//! assert_eq!(registry.count(), 0);
//! ```

pub mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod extension;
pub mod graph;
pub mod observer;
pub mod registry;
pub mod traits;

mod internal;

pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder, CreationContext};
pub use definition::{ComponentDefinition, DefinitionRegistry};
pub use error::{LifecycleError, LifecycleResult};
pub use extension::{
    DefinitionExtension, ExtensionOrchestrator, ExtensionReport, Interceptor, InterceptorChain,
    PresuppliedExtension, RegistryExtension,
};
pub use graph::DependencyGraph;
pub use observer::{LifecycleObserver, LoggingObserver};
pub use registry::{ComponentRegistry, EarlyReferenceFactory, Instance, Materialized, RegistryLock};
pub use traits::{ComponentResolver, Dispose, DisposeFn, Ordered, Precedence, ResolverCore};
