use thiserror::Error;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by [`crate::CacheRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The namespace already holds a cache of another payload or size type.
    #[error("namespace `{namespace}` already holds a cache of a different type (requested {expected})")]
    NamespaceTypeMismatch {
        namespace: String,
        expected: &'static str,
    },

    /// Background reaping needs a Tokio runtime and none is available.
    #[error("no tokio runtime available to run the reaper")]
    NoRuntime,

    /// The registry was shut down; no new namespaces can be created.
    #[error("cache registry has been shut down")]
    ShutDown,
}
