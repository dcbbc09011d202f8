//! Category classification
//!
//! Maps a redefined type to at most one [`Category`]. Rules are evaluated in
//! a fixed priority order and the first match wins:
//!
//! 1. repository marker, or assignable to the repository capability
//! 2. service marker
//! 3. controller or REST-controller marker
//! 4. component marker
//! 5. under the domain prefix and carrying the entity marker
//! 6. under the dto prefix

use rewire_kernel::HotReloadConfig;
use rewire_kernel::reload::Category;
use rewire_kernel::types::{Marker, TypeDescriptor};

/// Pure, stateless classifier over type descriptors
#[derive(Debug, Clone, Default)]
pub struct CategoryClassifier {
    domain_prefix: String,
    dto_prefix: String,
}

impl CategoryClassifier {
    /// Create a classifier. An empty prefix disables the rule that uses it.
    pub fn new(domain_prefix: &str, dto_prefix: &str) -> Self {
        Self {
            domain_prefix: domain_prefix.to_string(),
            dto_prefix: dto_prefix.to_string(),
        }
    }

    pub fn from_config(config: &HotReloadConfig) -> Self {
        Self::new(&config.packages.domain, &config.packages.dto)
    }

    pub fn classify(&self, ty: &TypeDescriptor) -> Option<Category> {
        if ty.has_marker(Marker::Repository) || ty.is_repository_capable() {
            return Some(Category::Repository);
        }
        if ty.has_marker(Marker::Service) {
            return Some(Category::Service);
        }
        if ty.is_handler() {
            return Some(Category::Controller);
        }
        if ty.has_marker(Marker::Component) {
            return Some(Category::Component);
        }

        let name = ty.qualified_name();
        if has_prefix(name, &self.domain_prefix) && ty.has_marker(Marker::Entity) {
            return Some(Category::Entity);
        }
        if has_prefix(name, &self.dto_prefix) {
            return Some(Category::Dto);
        }
        None
    }
}

fn has_prefix(name: &str, prefix: &str) -> bool {
    !prefix.is_empty() && name.starts_with(prefix)
}
