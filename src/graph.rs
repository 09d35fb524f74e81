//! Dependency and containment edges between component names.
//!
//! The graph drives destruction order: a component is destroyed only after
//! every component that depends on it. Edges are stored forward and backward
//! so both directions are a single map lookup. Cycles may exist as data; every
//! traversal carries a visited set.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};

/// Directed dependency graph keyed by component name.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// // "service" depends on "repository", which depends on "pool"
/// graph.record_dependency("repository", "service");
/// graph.record_dependency("pool", "repository");
///
/// assert!(graph.is_transitively_dependent("pool", "service"));
/// assert_eq!(graph.dependents_of("pool"), vec!["repository".to_string()]);
/// assert_eq!(graph.dependencies_of("service"), vec!["repository".to_string()]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// name -> names that depend on it
    dependents: IndexMap<String, IndexSet<String>>,
    /// name -> names it depends on
    dependencies: IndexMap<String, IndexSet<String>>,
    /// outer name -> inner names it contains
    contained: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` depends on `dependee`. Idempotent.
    pub fn record_dependency(&mut self, dependee: &str, dependent: &str) {
        let added = self
            .dependents
            .entry(dependee.to_string())
            .or_default()
            .insert(dependent.to_string());
        if !added {
            return;
        }
        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .insert(dependee.to_string());
    }

    /// Records that `outer` contains `inner`. Idempotent.
    ///
    /// The outer component also depends on the inner one, so the outer is
    /// destroyed before the inner.
    pub fn record_containment(&mut self, inner: &str, outer: &str) {
        let added = self
            .contained
            .entry(outer.to_string())
            .or_default()
            .insert(inner.to_string());
        if added {
            self.record_dependency(inner, outer);
        }
    }

    /// True if `candidate` depends on `subject`, directly or transitively.
    pub fn is_transitively_dependent(&self, subject: &str, candidate: &str) -> bool {
        let mut seen = HashSet::new();
        self.is_dependent_inner(subject, candidate, &mut seen)
    }

    fn is_dependent_inner<'a>(
        &'a self,
        subject: &'a str,
        candidate: &str,
        seen: &mut HashSet<&'a str>,
    ) -> bool {
        if !seen.insert(subject) {
            return false;
        }
        let Some(dependents) = self.dependents.get(subject) else {
            return false;
        };
        if dependents.contains(candidate) {
            return true;
        }
        dependents
            .iter()
            .any(|next| self.is_dependent_inner(next, candidate, seen))
    }

    /// True if anything depends on `name`.
    pub fn has_dependents(&self, name: &str) -> bool {
        self.dependents.get(name).is_some_and(|set| !set.is_empty())
    }

    /// Names that depend on `name`, in insertion order.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        snapshot(self.dependents.get(name))
    }

    /// Names `name` depends on, in insertion order.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        snapshot(self.dependencies.get(name))
    }

    /// Names contained by `name`, in insertion order.
    pub fn contained_of(&self, name: &str) -> Vec<String> {
        snapshot(self.contained.get(name))
    }

    /// Detaches and returns the dependents of `name`.
    pub(crate) fn take_dependents(&mut self, name: &str) -> Vec<String> {
        self.dependents
            .shift_remove(name)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Detaches and returns the names contained by `name`.
    pub(crate) fn take_contained(&mut self, name: &str) -> Vec<String> {
        self.contained
            .shift_remove(name)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Removes `name` from every edge list, both as key and as member.
    pub fn forget(&mut self, name: &str) {
        for map in [&mut self.dependents, &mut self.dependencies, &mut self.contained] {
            map.shift_remove(name);
            map.retain(|_, set| {
                set.shift_remove(name);
                !set.is_empty()
            });
        }
    }

    /// Drops every edge.
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
        self.contained.clear();
    }

    /// True if no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty() && self.dependencies.is_empty() && self.contained.is_empty()
    }
}

fn snapshot(set: Option<&IndexSet<String>>) -> Vec<String> {
    set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
}
