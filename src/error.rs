//! Error types for the component lifecycle container.

use thiserror::Error;

/// Lifecycle container errors
///
/// Represents the failure conditions that can occur while registering,
/// creating, extending or destroying components.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::LifecycleError;
///
/// let err = LifecycleError::CurrentlyInCreation("orderService".to_string());
/// assert_eq!(
///     err.to_string(),
///     "Component 'orderService' is currently in creation: is there an unresolvable circular reference?"
/// );
/// assert_eq!(err.component_name(), Some("orderService"));
/// ```
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// A different finished instance is already bound to the name
    #[error("Could not register instance under '{0}': a different instance is already bound")]
    AlreadyBound(String),
    /// Illegitimate re-entrant creation (an unresolvable cycle)
    #[error("Component '{0}' is currently in creation: is there an unresolvable circular reference?")]
    CurrentlyInCreation(String),
    /// Creation requested while the registry is being destroyed
    #[error("Creation of component '{0}' not allowed while the registry is being destroyed (do not request components from a disposal callback)")]
    CreationNotAllowed(String),
    /// A registry-phase entry point was run twice against the same definition registry
    #[error("Registry extensions already invoked against definition registry #{registry}")]
    DuplicateInvocation {
        /// Id of the definition registry
        registry: u64,
    },
    /// Framework bug: creation guard bookkeeping went out of sync
    #[error("Internal consistency violation: {0}")]
    Internal(String),
    /// No definition is registered under the name
    #[error("No component definition named '{0}'")]
    NotDefined(String),
    /// Creation failed; carries the causes suppressed while resolving collaborators
    #[error("Error creating component '{name}': {source}")]
    Creation {
        /// Component whose creation failed
        name: String,
        /// Root failure
        source: Box<LifecycleError>,
        /// Failures suppressed while resolving collaborators
        related: Vec<LifecycleError>,
    },
    /// A factory or lifecycle hook supplied by the caller failed
    #[error("Factory for component '{name}' failed: {message}")]
    Factory {
        /// Component being created
        name: String,
        /// Failure description
        message: String,
    },
    /// Declared depends-on relationships form a cycle
    #[error("Circular depends-on relationship between '{name}' and '{dependency}'")]
    CircularDependsOn {
        /// Component declaring the dependency
        name: String,
        /// Declared dependency
        dependency: String,
    },
    /// An early reference was handed out but the finished instance is a different object
    #[error("Component '{0}' was injected into other components as an early reference, but the finished instance was replaced by an interceptor")]
    EarlyReferenceMismatch(String),
    /// Downcast of a component instance failed
    #[error("Component '{name}' is not of type {expected}")]
    TypeMismatch {
        /// Component name
        name: String,
        /// Requested type
        expected: &'static str,
    },
    /// Maximum creation nesting depth exceeded
    #[error("Max creation depth {0} exceeded")]
    DepthExceeded(usize),
    /// An extension callback failed
    #[error("Extension '{extension}' failed: {message}")]
    Extension {
        /// Registered extension name
        extension: String,
        /// Failure description
        message: String,
    },
}

impl LifecycleError {
    /// Builds a [`LifecycleError::Factory`] from any displayable failure.
    pub fn factory(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LifecycleError::Factory {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Builds a [`LifecycleError::Extension`] from any displayable failure.
    pub fn extension(extension: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LifecycleError::Extension {
            extension: extension.into(),
            message: message.to_string(),
        }
    }

    /// The component name the error is about, if any.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            LifecycleError::AlreadyBound(name)
            | LifecycleError::CurrentlyInCreation(name)
            | LifecycleError::CreationNotAllowed(name)
            | LifecycleError::NotDefined(name)
            | LifecycleError::EarlyReferenceMismatch(name) => Some(name),
            LifecycleError::Creation { name, .. }
            | LifecycleError::Factory { name, .. }
            | LifecycleError::CircularDependsOn { name, .. }
            | LifecycleError::TypeMismatch { name, .. } => Some(name),
            LifecycleError::DuplicateInvocation { .. }
            | LifecycleError::Internal(_)
            | LifecycleError::DepthExceeded(_)
            | LifecycleError::Extension { .. } => None,
        }
    }

    /// Causes suppressed during the failed creation attempt.
    pub fn related(&self) -> &[LifecycleError] {
        match self {
            LifecycleError::Creation { related, .. } => related,
            _ => &[],
        }
    }

    /// Innermost failure, unwrapping [`LifecycleError::Creation`] layers.
    pub fn root_cause(&self) -> &LifecycleError {
        let mut current = self;
        while let LifecycleError::Creation { source, .. } = current {
            current = source;
        }
        current
    }

    /// True if this error, or any creation failure it wraps, is an unresolvable cycle.
    pub fn is_currently_in_creation(&self) -> bool {
        matches!(self.root_cause(), LifecycleError::CurrentlyInCreation(_))
    }

    /// Attaches suppressed causes, wrapping in [`LifecycleError::Creation`] when needed.
    pub(crate) fn with_related(self, name: &str, mut causes: Vec<LifecycleError>) -> Self {
        if causes.is_empty() {
            return self;
        }
        match self {
            LifecycleError::Creation { name, source, mut related } => {
                related.append(&mut causes);
                LifecycleError::Creation { name, source, related }
            }
            other => LifecycleError::Creation {
                name: name.to_string(),
                source: Box::new(other),
                related: causes,
            },
        }
    }
}

/// Result type for lifecycle operations
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{LifecycleError, LifecycleResult};
///
/// fn lookup_config() -> LifecycleResult<u32> {
///     Err(LifecycleError::NotDefined("config".to_string()))
/// }
///
/// assert!(lookup_config().is_err());
/// ```
pub type LifecycleResult<T> = Result<T, LifecycleError>;
