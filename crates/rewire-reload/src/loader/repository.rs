use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use rewire_kernel::container::Container;
use rewire_kernel::reload::{InstanceLoader, LOWEST_PRECEDENCE, ReloadResult};
use rewire_kernel::types::{TypeDescriptor, TypeHandle};

use super::initialized;

/// Persistence-layer collaborator that manufactures data-access objects
pub trait RepositoryFactory: Send + Sync {
    /// Build the repository object for `ty`.
    ///
    /// Return a recoverable error when something it needs (an entity mapping,
    /// a data source) is not available yet; the type is retried next cycle.
    fn create_repository(&self, ty: &TypeDescriptor) -> ReloadResult<Box<dyn Any + Send + Sync>>;
}

/// Builds repository-capable types through a [`RepositoryFactory`] and
/// registers the result as a singleton
pub struct RepositoryInstanceLoader {
    factory: Arc<dyn RepositoryFactory>,
    container: Option<Arc<Container>>,
}

impl RepositoryInstanceLoader {
    pub fn new(factory: Arc<dyn RepositoryFactory>) -> Self {
        Self {
            factory,
            container: None,
        }
    }
}

impl fmt::Debug for RepositoryInstanceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryInstanceLoader")
            .field("initialized", &self.container.is_some())
            .finish_non_exhaustive()
    }
}

impl InstanceLoader for RepositoryInstanceLoader {
    fn name(&self) -> &str {
        "repository"
    }

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE - 1
    }

    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()> {
        self.container = Some(container);
        Ok(())
    }

    fn supports(&self, ty: &TypeDescriptor) -> bool {
        ty.is_repository_capable()
    }

    fn register_bean(&self, ty: &TypeHandle) -> ReloadResult<()> {
        let container = initialized(&self.container, self.name())?;
        let payload = self.factory.create_repository(ty)?;
        let name = ty.bean_name();

        debug!("Registering repository '{}' ({})", name, ty.qualified_name());
        container.register_singleton(&name, ty.clone(), payload)?;
        Ok(())
    }
}
