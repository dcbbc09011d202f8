//! Test doubles for reloaders, listeners, caches and repository factories

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rewire_kernel::container::Container;
use rewire_kernel::reload::{Category, ReloadError, ReloadResult, Reloader, RewiringListener};
use rewire_kernel::types::{TypeDescriptor, TypeHandle};
use rewire_reload::{FlushableCache, RepositoryFactory};

#[derive(Debug, Default)]
struct ListenerLog {
    reported: Vec<(String, bool)>,
    processed: usize,
}

/// Rewiring listener that records every call; clones share the record
#[derive(Clone)]
pub struct RecordingListener {
    label: String,
    log: Arc<Mutex<ListenerLog>>,
}

impl RecordingListener {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            log: Arc::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `(bean name, is_new)` in report order
    pub fn reported(&self) -> Vec<(String, bool)> {
        self.log.lock().reported.clone()
    }

    pub fn process_count(&self) -> usize {
        self.log.lock().processed
    }

    pub fn boxed(&self) -> Box<dyn RewiringListener> {
        Box::new(self.clone())
    }
}

impl RewiringListener for RecordingListener {
    fn name(&self) -> &str {
        &self.label
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn support(&self, _ty: &TypeDescriptor) -> bool {
        true
    }

    fn add_beans_to_process(&mut self, ty: &TypeHandle, is_new: bool) {
        self.log.lock().reported.push((ty.bean_name(), is_new));
    }

    fn process(&mut self) -> ReloadResult<()> {
        self.log.lock().processed += 1;
        Ok(())
    }
}

/// Reloader that records deliveries and reload calls; clones share the record
#[derive(Clone)]
pub struct RecordingReloader {
    name: String,
    order: i32,
    supported: Vec<Category>,
    deliveries: Arc<Mutex<Vec<(Category, Vec<String>)>>>,
    reloads: Arc<AtomicUsize>,
}

impl RecordingReloader {
    pub fn new(name: &str, order: i32) -> Self {
        Self {
            name: name.to_string(),
            order,
            supported: Category::ALL.to_vec(),
            deliveries: Arc::default(),
            reloads: Arc::default(),
        }
    }

    pub fn supporting(mut self, categories: &[Category]) -> Self {
        self.supported = categories.to_vec();
        self
    }

    /// Delivered `(category, qualified names)` in delivery order
    pub fn deliveries(&self) -> Vec<(Category, Vec<String>)> {
        self.deliveries.lock().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn Reloader> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl Reloader for RecordingReloader {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn supports(&self, category: Category) -> bool {
        self.supported.contains(&category)
    }

    fn add_beans_to_reload(&mut self, types: Vec<TypeHandle>, category: Category) {
        let names = types
            .iter()
            .map(|t| t.qualified_name().to_string())
            .collect();
        self.deliveries.lock().push((category, names));
    }

    fn has_beans_to_reload(&self) -> bool {
        false
    }

    async fn reload(&mut self) -> ReloadResult<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reloader whose `reload()` always fails
pub struct FailingReloader {
    order: i32,
}

impl FailingReloader {
    pub fn new(order: i32) -> Self {
        Self { order }
    }
}

#[async_trait]
impl Reloader for FailingReloader {
    fn name(&self) -> &str {
        "failing"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn supports(&self, _category: Category) -> bool {
        true
    }

    fn add_beans_to_reload(&mut self, _types: Vec<TypeHandle>, _category: Category) {}

    fn has_beans_to_reload(&self) -> bool {
        false
    }

    async fn reload(&mut self) -> ReloadResult<()> {
        Err(ReloadError::Internal("simulated reloader failure".into()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reloader that panics while receiving changes
pub struct PanickingReloader {
    order: i32,
}

impl PanickingReloader {
    pub fn new(order: i32) -> Self {
        Self { order }
    }
}

#[async_trait]
impl Reloader for PanickingReloader {
    fn name(&self) -> &str {
        "panicking"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn supports(&self, _category: Category) -> bool {
        true
    }

    fn add_beans_to_reload(&mut self, _types: Vec<TypeHandle>, _category: Category) {
        panic!("simulated reloader panic");
    }

    fn has_beans_to_reload(&self) -> bool {
        false
    }

    async fn reload(&mut self) -> ReloadResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Repository factory producing the simple name of the type as payload
#[derive(Debug, Default)]
pub struct StaticRepositoryFactory {
    created: Mutex<Vec<String>>,
}

impl StaticRepositoryFactory {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }
}

impl RepositoryFactory for StaticRepositoryFactory {
    fn create_repository(&self, ty: &TypeDescriptor) -> ReloadResult<Box<dyn Any + Send + Sync>> {
        self.created.lock().push(ty.qualified_name().to_string());
        Ok(Box::new(ty.simple_name().to_string()))
    }
}

/// Serializer cache double counting flushes
#[derive(Debug)]
pub struct RecordingCache {
    name: String,
    flushes: AtomicUsize,
}

impl RecordingCache {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            flushes: AtomicUsize::new(0),
        })
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl FlushableCache for RecordingCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn flush(&self) -> ReloadResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
