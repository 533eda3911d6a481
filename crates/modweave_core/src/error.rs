//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while loading, resolving or generating a stack.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Circular dependency detected involving module: {module}")]
    CircularDependency { module: String },

    #[error("Module '{module}' depends on '{dependency}', which is not defined or not enabled")]
    UnresolvedDependency { module: String, dependency: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// Whether the error comes from the module dependency graph.
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            CoreError::CircularDependency { .. } | CoreError::UnresolvedDependency { .. }
        )
    }
}
