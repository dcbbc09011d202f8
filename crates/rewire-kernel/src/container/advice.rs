//! Cross-cutting advice attached to proxied bean handles

use std::fmt;

use crate::types::TypeDescriptor;

/// A cross-cutting concern that intercepts calls on matching beans
pub trait Advisor: Send + Sync {
    /// Unique advisor name; a handle never carries two advisors with the same name
    fn name(&self) -> &str;

    /// Whether calls on instances of `ty` must be intercepted
    fn applies_to(&self, ty: &TypeDescriptor) -> bool;
}

impl fmt::Debug for dyn Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advisor({})", self.name())
    }
}

/// Applies to every type carrying a given annotation
#[derive(Debug, Clone)]
pub struct AnnotationAdvisor {
    name: String,
    annotation: String,
}

impl AnnotationAdvisor {
    pub fn new(name: &str, annotation: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: annotation.to_string(),
        }
    }
}

impl Advisor for AnnotationAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, ty: &TypeDescriptor) -> bool {
        ty.has_annotation(&self.annotation)
    }
}
