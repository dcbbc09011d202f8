//! Typed errors for the object container.

use thiserror::Error;

/// Errors raised while declaring, creating or resolving beans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ContainerError {
    /// No bean definition is registered under the name.
    #[error("No bean named '{0}' is defined")]
    NoSuchBean(String),

    /// No bean definition matches the requested type.
    #[error("No bean of type '{0}' is defined")]
    NoSuchBeanOfType(String),

    /// More than one bean definition matches the requested type.
    #[error("Type '{type_name}' is ambiguous, candidates: {candidates:?}")]
    NonUniqueBean {
        type_name: String,
        candidates: Vec<String>,
    },

    /// A bean definition with this name already exists.
    #[error("A bean named '{0}' is already defined")]
    DuplicateBeanName(String),

    /// A collaborator required to create a bean could not be resolved.
    #[error("Bean '{bean}' requires '{type_name}' for field '{field}': {reason}")]
    MissingDependency {
        bean: String,
        field: String,
        type_name: String,
        reason: String,
    },

    /// The bean is built by an external factory and has not been registered yet.
    #[error("Bean '{bean}' ({type_name}) is built by its factory and is not available yet")]
    AwaitingFactory { bean: String, type_name: String },

    /// Two prototype beans require each other.
    #[error("Circular reference while creating prototype bean '{0}'")]
    CircularReference(String),
}

impl ContainerError {
    /// The type that could not be resolved, when the error is a missing collaborator
    pub fn missing_type(&self) -> Option<&str> {
        match self {
            ContainerError::NoSuchBeanOfType(type_name) => Some(type_name),
            ContainerError::MissingDependency { type_name, .. } => Some(type_name),
            ContainerError::AwaitingFactory { type_name, .. } => Some(type_name),
            _ => None,
        }
    }
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;
