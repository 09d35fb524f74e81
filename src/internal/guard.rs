//! Re-entrant creation detection.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::error::{LifecycleError, LifecycleResult};

/// Default nesting limit, mirrors the resolution depth guard.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 1024;

/// Tracks which component names are mid-construction.
///
/// Lives inside the registry state, so every access is already serialized by
/// the registry lock.
#[derive(Debug)]
pub(crate) struct CreationGuard {
    in_creation: IndexSet<String>,
    exempt: HashSet<String>,
    depth: usize,
    max_depth: usize,
}

impl Default for CreationGuard {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl CreationGuard {
    pub(crate) fn with_max_depth(max_depth: usize) -> Self {
        Self {
            in_creation: IndexSet::new(),
            exempt: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Opts a name in or out of the re-entrancy check.
    pub(crate) fn set_exempt(&mut self, name: &str, exempt: bool) {
        if exempt {
            self.exempt.insert(name.to_string());
        } else {
            self.exempt.remove(name);
        }
    }

    pub(crate) fn is_exempt(&self, name: &str) -> bool {
        self.exempt.contains(name)
    }

    /// Raw membership, ignoring exemptions.
    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        self.in_creation.contains(name)
    }

    /// Membership as seen by callers: exempt names never report in-progress.
    pub(crate) fn is_currently_in_creation(&self, name: &str) -> bool {
        !self.is_exempt(name) && self.is_in_creation(name)
    }

    pub(crate) fn before_create(&mut self, name: &str) -> LifecycleResult<()> {
        if self.depth >= self.max_depth {
            return Err(LifecycleError::DepthExceeded(self.depth));
        }
        if !self.is_exempt(name) && !self.in_creation.insert(name.to_string()) {
            return Err(LifecycleError::CurrentlyInCreation(name.to_string()));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn after_create(&mut self, name: &str) -> LifecycleResult<()> {
        self.depth = self.depth.saturating_sub(1);
        if !self.is_exempt(name) && !self.in_creation.shift_remove(name) {
            return Err(LifecycleError::Internal(format!(
                "component '{}' isn't currently in creation",
                name
            )));
        }
        Ok(())
    }

    pub(crate) fn names_in_creation(&self) -> Vec<String> {
        self.in_creation.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_create_rejects_reentry() {
        let mut guard = CreationGuard::default();
        guard.before_create("a").unwrap();

        let err = guard.before_create("a").unwrap_err();
        assert!(matches!(err, LifecycleError::CurrentlyInCreation(ref n) if n == "a"));

        guard.after_create("a").unwrap();
        assert!(!guard.is_in_creation("a"));
    }

    #[test]
    fn exempt_names_skip_both_checks() {
        let mut guard = CreationGuard::default();
        guard.set_exempt("nested", true);

        guard.before_create("nested").unwrap();
        guard.before_create("nested").unwrap();
        assert!(!guard.is_currently_in_creation("nested"));
        guard.after_create("nested").unwrap();
        guard.after_create("nested").unwrap();
    }

    #[test]
    fn after_create_without_before_is_internal_error() {
        let mut guard = CreationGuard::default();
        let err = guard.after_create("ghost").unwrap_err();
        assert!(matches!(err, LifecycleError::Internal(_)));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut guard = CreationGuard::with_max_depth(2);
        guard.before_create("a").unwrap();
        guard.before_create("b").unwrap();
        assert!(matches!(guard.before_create("c"), Err(LifecycleError::DepthExceeded(2))));
    }

    #[test]
    fn names_in_creation_keep_entry_order() {
        let mut guard = CreationGuard::default();
        guard.before_create("outer").unwrap();
        guard.before_create("inner").unwrap();
        assert_eq!(guard.names_in_creation(), vec!["outer".to_string(), "inner".to_string()]);
    }
}
