//! Serializer cache flushing
//!
//! Entity and transfer-object changes invalidate whatever serializers the
//! host cached for the old type layout. [`CacheFlushReloader`] flushes every
//! registered [`FlushableCache`] once per cycle that delivered such changes.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};

use rewire_kernel::container::Container;
use rewire_kernel::reload::{Category, ReloadResult, Reloader};
use rewire_kernel::types::TypeHandle;

/// A host cache keyed by type layout
pub trait FlushableCache: Send + Sync {
    fn name(&self) -> &str;

    fn flush(&self) -> ReloadResult<()>;
}

/// Flushes serializer caches after entity or dto changes
#[derive(Default)]
pub struct CacheFlushReloader {
    caches: Vec<Arc<dyn FlushableCache>>,
    changed: Vec<String>,
}

impl CacheFlushReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Arc<dyn FlushableCache>) -> Self {
        self.caches.push(cache);
        self
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.caches.iter().map(|c| c.name().to_string()).collect()
    }
}

#[async_trait]
impl Reloader for CacheFlushReloader {
    fn name(&self) -> &str {
        "cache-flush"
    }

    fn order(&self) -> i32 {
        80
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn supports(&self, category: Category) -> bool {
        matches!(category, Category::Entity | Category::Dto)
    }

    fn prepare(&mut self) {
        self.changed.clear();
    }

    fn add_beans_to_reload(&mut self, types: Vec<TypeHandle>, _category: Category) {
        self.changed
            .extend(types.iter().map(|t| t.qualified_name().to_string()));
    }

    fn has_beans_to_reload(&self) -> bool {
        false
    }

    async fn reload(&mut self) -> ReloadResult<()> {
        if self.changed.is_empty() {
            return Ok(());
        }

        debug!("Flushing {} caches after {:?}", self.caches.len(), self.changed);
        for cache in &self.caches {
            if let Err(e) = cache.flush() {
                warn!("Failed to flush cache '{}': {}", cache.name(), e);
            }
        }
        self.changed.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
