//! Static descriptions of managed types
//!
//! A [`TypeDescriptor`] is everything the reload subsystem may know about a
//! redefined type without introspecting it at runtime: its stereotype
//! markers, free-form annotations, declared bean name and scope, the
//! capabilities it is assignable to, its injectable dependencies and the
//! operations it exposes.

mod operation;

pub use operation::{Operation, RequestMethod};

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Capability implemented by every data-access repository type.
pub const REPOSITORY_CAPABILITY: &str = "rewire::data::Repository";

/// Shared, immutable handle to a type description
pub type TypeHandle = Arc<TypeDescriptor>;

/// Builds the user payload of a new instance
pub type PayloadFactory = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// Stereotype markers carried by a managed type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Marker {
    Repository,
    Service,
    Controller,
    RestController,
    Component,
    Entity,
}

/// Bean scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    /// One shared instance per container
    #[default]
    Singleton,
    /// A fresh instance per lookup
    Prototype,
    /// A named scope; instances are cached like singletons
    Custom(String),
}

impl Scope {
    /// Parse a scope marker value; empty means singleton.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "singleton" => Scope::Singleton,
            "prototype" => Scope::Prototype,
            other => Scope::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Prototype => "prototype",
            Scope::Custom(name) => name,
        }
    }

    /// Whether instances of this scope are cached by the container
    pub fn is_shared(&self) -> bool {
        !matches!(self, Scope::Prototype)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An injectable field: resolved by type from the container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InjectionPoint {
    /// Field name on the target instance
    pub field: String,
    /// Qualified name of the type (or capability) to inject
    pub type_name: String,
}

impl InjectionPoint {
    pub fn new(field: &str, type_name: &str) -> Self {
        Self {
            field: field.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// Static description of a managed type
#[derive(Clone)]
pub struct TypeDescriptor {
    qualified_name: String,
    markers: Vec<Marker>,
    annotations: Vec<String>,
    bean_name: Option<String>,
    scope: Scope,
    provides: Vec<String>,
    dependencies: Vec<InjectionPoint>,
    operations: Vec<Operation>,
    factory: Option<PayloadFactory>,
}

impl TypeDescriptor {
    pub fn new(qualified_name: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            markers: Vec::new(),
            annotations: Vec::new(),
            bean_name: None,
            scope: Scope::Singleton,
            provides: Vec::new(),
            dependencies: Vec::new(),
            operations: Vec::new(),
            factory: None,
        }
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    /// Add a free-form annotation (used by advisors to decide interception)
    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    /// Set the bean name declared on the stereotype marker
    pub fn with_bean_name(mut self, name: &str) -> Self {
        self.bean_name = Some(name.to_string());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Declare that the type is assignable to a capability / interface
    pub fn with_capability(mut self, capability: &str) -> Self {
        self.provides.push(capability.to_string());
        self
    }

    pub fn with_dependency(mut self, field: &str, type_name: &str) -> Self {
        self.dependencies.push(InjectionPoint::new(field, type_name));
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_factory<F, T>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        self.factory = Some(Arc::new(move || Box::new(factory()) as Box<dyn Any + Send + Sync>));
        self
    }

    pub fn into_handle(self) -> TypeHandle {
        Arc::new(self)
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Last path segment of the qualified name
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit(|c: char| c == '.' || c == ':' || c == '$')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Container name: the declared name, else the un-capitalized simple name
    pub fn bean_name(&self) -> String {
        match self.bean_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => uncapitalize(self.simple_name()),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn capabilities(&self) -> &[String] {
        &self.provides
    }

    pub fn is_assignable_to(&self, capability: &str) -> bool {
        self.provides.iter().any(|c| c == capability)
    }

    /// Whether the type is served by a persistence-layer repository factory
    pub fn is_repository_capable(&self) -> bool {
        self.is_assignable_to(REPOSITORY_CAPABILITY)
    }

    /// Whether the type exposes request handlers
    pub fn is_handler(&self) -> bool {
        self.has_marker(Marker::Controller) || self.has_marker(Marker::RestController)
    }

    /// Whether a lookup by `type_name` may be satisfied by this type
    pub fn matches_type(&self, type_name: &str) -> bool {
        self.qualified_name == type_name || self.is_assignable_to(type_name)
    }

    pub fn dependencies(&self) -> &[InjectionPoint] {
        &self.dependencies
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Build a fresh payload; types without a factory get a unit payload
    pub fn create_payload(&self) -> Box<dyn Any + Send + Sync> {
        match &self.factory {
            Some(factory) => factory(),
            None => Box::new(()),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("qualified_name", &self.qualified_name)
            .field("markers", &self.markers)
            .field("bean_name", &self.bean_name)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
