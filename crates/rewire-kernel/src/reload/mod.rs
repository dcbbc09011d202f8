//! Hot-reload contracts
//!
//! A reload cycle hands categorized changes to every [`Reloader`]. The
//! container-rewiring reloader in turn dispatches new types to the first
//! matching [`InstanceLoader`] and reports new and rewired beans to every
//! matching [`RewiringListener`].

mod category;
mod error;

pub use category::Category;
pub use error::{ReloadError, ReloadResult};

use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;

use crate::container::Container;
use crate::types::{TypeDescriptor, TypeHandle};

/// Order value of the extension that runs first
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Order value of the extension that runs last
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// A classified redefinition, queued until the next reload cycle
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub qualified_name: String,
    pub type_handle: TypeHandle,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(type_handle: TypeHandle, category: Category) -> Self {
        Self {
            qualified_name: type_handle.qualified_name().to_string(),
            type_handle,
            category,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Applies one reload cycle's changes for the categories it supports
#[async_trait::async_trait]
pub trait Reloader: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Position in the reloader chain, ascending
    fn order(&self) -> i32 {
        0
    }

    /// Hand the reloader the container it operates on
    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()>;

    /// Whether changes of `category` should be delivered to this reloader
    fn supports(&self, category: Category) -> bool;

    /// Called at the start of every cycle, before any delivery
    fn prepare(&mut self) {}

    /// Deliver this cycle's changed types of one category
    fn add_beans_to_reload(&mut self, types: Vec<TypeHandle>, category: Category);

    /// Whether work is left over, e.g. beans waiting for a missing collaborator
    fn has_beans_to_reload(&self) -> bool;

    /// Apply everything delivered since the last call
    async fn reload(&mut self) -> ReloadResult<()>;

    /// Convert to Any (for downcasting)
    fn as_any(&self) -> &dyn Any;
}

/// Builds and registers a newly introduced bean of a particular shape
pub trait InstanceLoader: Send + Sync {
    fn name(&self) -> &str;

    /// Position in the loader chain, ascending; first supporting loader wins
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()>;

    fn supports(&self, ty: &TypeDescriptor) -> bool;

    /// Create the bean for `ty`. The definition is already declared.
    ///
    /// Fails with a recoverable error when a collaborator is not available yet.
    fn register_bean(&self, ty: &TypeHandle) -> ReloadResult<()>;
}

/// Secondary indexing over new and rewired beans (route tables, ...)
pub trait RewiringListener: Send + Sync {
    fn name(&self) -> &str;

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()>;

    /// Whether `ty` is of interest to this listener
    fn support(&self, ty: &TypeDescriptor) -> bool;

    /// Report a bean that was created (`is_new`) or rewired in this cycle
    fn add_beans_to_process(&mut self, ty: &TypeHandle, is_new: bool);

    /// Rebuild from everything tracked; called once per cycle
    fn process(&mut self) -> ReloadResult<()>;
}
