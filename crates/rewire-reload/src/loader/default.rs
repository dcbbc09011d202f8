use std::sync::Arc;
use tracing::trace;

use rewire_kernel::container::Container;
use rewire_kernel::reload::{InstanceLoader, LOWEST_PRECEDENCE, ReloadResult};
use rewire_kernel::types::{TypeDescriptor, TypeHandle};

use super::initialized;

/// Creates any non-repository bean through the container, resolving its
/// collaborators eagerly
#[derive(Default)]
pub struct DefaultInstanceLoader {
    container: Option<Arc<Container>>,
}

impl DefaultInstanceLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstanceLoader for DefaultInstanceLoader {
    fn name(&self) -> &str {
        "default"
    }

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()> {
        self.container = Some(container);
        Ok(())
    }

    fn supports(&self, ty: &TypeDescriptor) -> bool {
        !ty.is_repository_capable()
    }

    fn register_bean(&self, ty: &TypeHandle) -> ReloadResult<()> {
        let container = initialized(&self.container, self.name())?;
        let name = ty.bean_name();
        trace!("Creating '{}' through the container", name);
        container.get_bean(&name)?;
        Ok(())
    }
}
