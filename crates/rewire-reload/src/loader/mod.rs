//! Instance loaders
//!
//! Construction strategies for newly introduced beans, tried in ascending
//! order; the first loader whose predicate accepts the type builds it.

mod default;
mod repository;

pub use default::DefaultInstanceLoader;
pub use repository::{RepositoryFactory, RepositoryInstanceLoader};

use std::sync::Arc;

use rewire_kernel::container::Container;
use rewire_kernel::reload::{ReloadError, ReloadResult};

/// The container handed over by `init`
pub(crate) fn initialized<'a>(
    container: &'a Option<Arc<Container>>,
    name: &str,
) -> ReloadResult<&'a Arc<Container>> {
    container
        .as_ref()
        .ok_or_else(|| ReloadError::NotInitialized(name.to_string()))
}
