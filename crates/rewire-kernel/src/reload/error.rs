//! Typed errors for the reload sub-system.

use thiserror::Error;

use crate::container::ContainerError;

/// Errors raised by reloaders, instance loaders and rewiring listeners.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReloadError {
    /// The container refused an operation (missing collaborator, duplicate name, ...).
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// No registered instance loader supports the type.
    #[error("No instance loader supports '{0}'")]
    NoLoader(String),

    /// An instance loader failed to build the bean.
    #[error("Loader '{loader}' failed for '{type_name}': {reason}")]
    LoaderFailed {
        loader: String,
        type_name: String,
        reason: String,
    },

    /// A rewiring listener failed while processing.
    #[error("Listener '{listener}' failed: {reason}")]
    ListenerFailed { listener: String, reason: String },

    /// An external collaborator (persistence factory, serializer cache, ...) failed.
    #[error("Collaborator '{name}' failed: {reason}")]
    Collaborator { name: String, reason: String },

    /// An extension point was used before `init` handed it the container.
    #[error("'{0}' has not been initialized")]
    NotInitialized(String),

    #[error("Hot reload is already running")]
    AlreadyRunning,

    #[error("Hot reload is not running")]
    NotRunning,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReloadError {
    /// The collaborator type whose absence caused the error, if any
    pub fn missing_type(&self) -> Option<&str> {
        match self {
            ReloadError::Container(e) => e.missing_type(),
            _ => None,
        }
    }
}

/// Result type for reload operations
pub type ReloadResult<T> = Result<T, ReloadError>;
