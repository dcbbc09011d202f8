//! Container rewiring engine
//!
//! The primary [`Reloader`]. Per cycle it
//!
//! 1. merges the types deferred by earlier cycles in front of this cycle's input,
//! 2. partitions the working set into new and existing beans by derived bean name,
//! 3. declares every new bean before instantiating any of them, so new beans
//!    may reference each other,
//! 4. instantiates new beans through the first supporting [`InstanceLoader`],
//!    in loader order, rolling back and deferring the ones whose collaborators
//!    are missing or whose loader fails,
//! 5. re-injects unset fields of existing beans, deferring incomplete ones,
//! 6. lets every [`RewiringListener`] rebuild once.
//!
//! Deferred types are retried every cycle until they complete.

mod wait;

pub use wait::ExistingWaitRecord;

use async_trait::async_trait;
use indexmap::IndexMap;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use rewire_kernel::container::{BeanHandle, BeanState, Container};
use rewire_kernel::reload::{
    Category, InstanceLoader, ReloadError, ReloadResult, Reloader, RewiringListener,
};
use rewire_kernel::types::TypeHandle;

use crate::coordinator::panic_message;
use crate::loader::{DefaultInstanceLoader, RepositoryFactory, RepositoryInstanceLoader};
use wait::WaitSets;

const DEFAULT_WAIT_ALERT_THRESHOLD: u32 = 40;

/// What one `reload()` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Bean names of new beans that were instantiated
    pub created: Vec<String>,
    /// Bean names of existing beans that are fully wired
    pub rewired: Vec<String>,
    /// Qualified names deferred to the next cycle
    pub deferred: Vec<String>,
    /// Qualified names dropped with a warning (name conflict, no loader)
    pub skipped: Vec<String>,
}

impl CycleSummary {
    fn completed_any(&self) -> bool {
        !self.created.is_empty() || !self.rewired.is_empty()
    }
}

/// Registers new beans and re-wires existing ones
pub struct RewiringEngine {
    container: Option<Arc<Container>>,
    loaders: Vec<Box<dyn InstanceLoader>>,
    listeners: Vec<Box<dyn RewiringListener>>,
    to_reload: IndexMap<String, TypeHandle>,
    waits: WaitSets,
    wait_alert_threshold: u32,
    last_cycle: CycleSummary,
}

impl RewiringEngine {
    /// Create an engine with the default instance loader
    pub fn new() -> Self {
        Self {
            container: None,
            loaders: vec![Box::new(DefaultInstanceLoader::new())],
            listeners: Vec::new(),
            to_reload: IndexMap::new(),
            waits: WaitSets::default(),
            wait_alert_threshold: DEFAULT_WAIT_ALERT_THRESHOLD,
            last_cycle: CycleSummary::default(),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn InstanceLoader>) -> Self {
        self.loaders.push(loader);
        self.loaders.sort_by_key(|l| l.order());
        self
    }

    /// Register the repository loader backed by `factory`
    pub fn with_repository_factory(self, factory: Arc<dyn RepositoryFactory>) -> Self {
        self.with_loader(Box::new(RepositoryInstanceLoader::new(factory)))
    }

    pub fn with_listener(mut self, listener: Box<dyn RewiringListener>) -> Self {
        self.listeners.push(listener);
        self.listeners.sort_by_key(|l| l.order());
        self
    }

    /// Warn every `cycles` consecutive deferrals of the same type; 0 disables alerts
    pub fn with_wait_alert_threshold(mut self, cycles: u32) -> Self {
        self.wait_alert_threshold = cycles;
        self
    }

    pub fn loader_names(&self) -> Vec<String> {
        self.loaders.iter().map(|l| l.name().to_string()).collect()
    }

    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.iter().map(|l| l.name().to_string()).collect()
    }

    /// Qualified names of new types waiting to be declared again
    pub fn new_wait_types(&self) -> Vec<String> {
        self.waits.new_wait_types()
    }

    /// Existing beans waiting for a collaborator type
    pub fn existing_wait_records(&self) -> Vec<ExistingWaitRecord> {
        self.waits.existing_records()
    }

    pub fn last_cycle(&self) -> &CycleSummary {
        &self.last_cycle
    }

    fn container(&self) -> ReloadResult<Arc<Container>> {
        self.container
            .clone()
            .ok_or_else(|| ReloadError::NotInitialized(self.name().to_string()))
    }

    fn report_to_listeners(&mut self, ty: &TypeHandle, is_new: bool) {
        for listener in self.listeners.iter_mut().filter(|l| l.support(ty)) {
            trace!(
                "Reporting {} to listener '{}' (new: {})",
                ty.qualified_name(),
                listener.name(),
                is_new
            );
            let listener_name = listener.name().to_string();
            let reported = isolate(&listener_name, || {
                listener.add_beans_to_process(ty, is_new);
                Ok(())
            });
            if let Err(e) = reported {
                warn!("Listener '{}' rejected {}: {}", listener_name, ty.qualified_name(), e);
            }
        }
    }

    fn alert_if_stale(&self, ty: &TypeHandle, attempts: u32) {
        if self.wait_alert_threshold > 0 && attempts % self.wait_alert_threshold == 0 {
            warn!(
                "{} has been waiting for collaborators for {} cycles",
                ty.qualified_name(),
                attempts
            );
        }
    }

    /// Step 3: declare every new type. Conflicting names are dropped.
    fn declare_new(
        &mut self,
        container: &Container,
        new_types: Vec<TypeHandle>,
        summary: &mut CycleSummary,
    ) -> Vec<TypeHandle> {
        let mut declared = Vec::with_capacity(new_types.len());
        for ty in new_types {
            let name = ty.bean_name();
            match container.declare(&name, ty.clone(), ty.scope().clone()) {
                Ok(()) => declared.push(ty),
                Err(e) => {
                    warn!("Skipping {}: {}", ty.qualified_name(), e);
                    self.waits.settle(ty.qualified_name());
                    summary.skipped.push(ty.qualified_name().to_string());
                }
            }
        }
        declared
    }

    /// Step 4: instantiate declared types, rolling back failures into `new_wait`
    fn instantiate_new(
        &mut self,
        container: &Container,
        declared: Vec<TypeHandle>,
        summary: &mut CycleSummary,
    ) {
        // Factory-built types first, so generic creation never races their loader
        let mut declared: Vec<(Option<usize>, TypeHandle)> = declared
            .into_iter()
            .map(|ty| (self.loaders.iter().position(|l| l.supports(&ty)), ty))
            .collect();
        declared.sort_by_key(|(slot, _)| slot.unwrap_or(usize::MAX));

        for (slot, ty) in declared {
            let name = ty.bean_name();
            let Some(loader) = slot.map(|i| &self.loaders[i]) else {
                let e = ReloadError::NoLoader(ty.qualified_name().to_string());
                warn!("{}, dropping its definition", e);
                container.remove_definition(&name);
                self.waits.settle(ty.qualified_name());
                summary.skipped.push(ty.qualified_name().to_string());
                continue;
            };

            let loader_name = loader.name().to_string();
            let outcome = isolate(&loader_name, || loader.register_bean(&ty));
            match outcome {
                Ok(()) => {
                    if container.state(&name) == Some(BeanState::Declared) {
                        if let Err(e) = container.set_state(&name, BeanState::Instantiated) {
                            warn!("Could not update state of '{}': {}", name, e);
                        }
                    }
                    info!("Registered new bean '{}' ({})", name, ty.qualified_name());
                    self.waits.settle(ty.qualified_name());
                    self.report_to_listeners(&ty, true);
                    summary.created.push(name);
                }
                Err(e) => {
                    let e = ReloadError::LoaderFailed {
                        loader: loader_name,
                        type_name: ty.qualified_name().to_string(),
                        reason: e.to_string(),
                    };
                    container.remove_definition(&name);
                    let attempts = self.waits.push_new(&ty);
                    debug!("Deferring new bean '{}': {}", name, e);
                    self.alert_if_stale(&ty, attempts);
                    summary.deferred.push(ty.qualified_name().to_string());
                }
            }
        }
    }

    /// Step 5: inject unset fields of existing beans
    fn rewire_existing(
        &mut self,
        container: &Container,
        existing: Vec<TypeHandle>,
        summary: &mut CycleSummary,
    ) {
        for ty in existing {
            let name = ty.bean_name();
            if let Err(e) = container.update_type(&name, ty.clone()) {
                warn!("Skipping {}: {}", ty.qualified_name(), e);
                summary.skipped.push(ty.qualified_name().to_string());
                continue;
            }
            let Some(entry) = container.entry(&name) else {
                continue;
            };

            let missing = match entry.instance {
                Some(handle) => rewire_handle(container, &handle, &ty),
                // Prototype beans have no live instance to rewire
                None if !entry.scope.is_shared() => Vec::new(),
                None => match isolate(&name, || Ok(container.get_bean(&name)?)) {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![
                        e.missing_type()
                            .unwrap_or(ty.qualified_name())
                            .to_string(),
                    ],
                },
            };

            if missing.is_empty() {
                if let Err(e) = container.set_state(&name, BeanState::Wired) {
                    warn!("Could not update state of '{}': {}", name, e);
                }
                info!("Rewired bean '{}'", name);
                self.waits.settle(ty.qualified_name());
                self.report_to_listeners(&ty, false);
                summary.rewired.push(name);
            } else {
                let mut attempts = 0;
                for missing_type in &missing {
                    attempts = self.waits.push_existing(missing_type, &ty);
                }
                debug!("Bean '{}' is waiting for {:?}", name, missing);
                self.alert_if_stale(&ty, attempts);
                summary.deferred.push(ty.qualified_name().to_string());
            }
        }
    }

    /// Step 6: one bulk rebuild per listener
    fn process_listeners(&mut self) {
        for listener in self.listeners.iter_mut() {
            let listener_name = listener.name().to_string();
            if let Err(e) = isolate(&listener_name, || listener.process()) {
                let e = ReloadError::ListenerFailed {
                    listener: listener_name,
                    reason: e.to_string(),
                };
                warn!("{}", e);
            }
        }
    }
}

impl Default for RewiringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Run an extension callback, turning a panic into an error
fn isolate<R>(name: &str, f: impl FnOnce() -> ReloadResult<R>) -> ReloadResult<R> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(ReloadError::Internal(format!(
            "'{}' panicked: {}",
            name,
            panic_message(&*panic)
        )))
    })
}

/// Attach newly applicable advice, then fill every unset field of the target.
///
/// Returns the collaborator types that could not be resolved.
fn rewire_handle(container: &Container, handle: &BeanHandle, ty: &TypeHandle) -> Vec<String> {
    if handle.is_proxy() {
        for advisor in container.advisors_for(ty) {
            let advisor_name = advisor.name().to_string();
            if handle.add_advisor(advisor) {
                debug!("Attached advisor '{}' to '{}'", advisor_name, handle.name());
            }
        }
    }

    let Some(target) = handle.target() else {
        return vec![ty.qualified_name().to_string()];
    };

    let mut missing = Vec::new();
    for point in ty.dependencies() {
        if target.is_injected(&point.field) {
            trace!("Keeping live value of '{}.{}'", handle.name(), point.field);
            continue;
        }
        match container.get_bean_of_type(&point.type_name) {
            Ok(collaborator) => {
                debug!(
                    "Injecting '{}' into '{}.{}'",
                    collaborator.name(),
                    handle.name(),
                    point.field
                );
                target.inject(&point.field, collaborator);
            }
            Err(e) => {
                trace!("Cannot resolve '{}.{}': {}", handle.name(), point.field, e);
                missing.push(point.type_name.clone());
            }
        }
    }
    missing
}

#[async_trait]
impl Reloader for RewiringEngine {
    fn name(&self) -> &str {
        "rewiring"
    }

    fn order(&self) -> i32 {
        100
    }

    fn init(&mut self, container: Arc<Container>) -> ReloadResult<()> {
        for loader in self.loaders.iter_mut() {
            loader.init(container.clone())?;
        }
        for listener in self.listeners.iter_mut() {
            listener.init(container.clone())?;
        }
        self.container = Some(container);
        Ok(())
    }

    fn supports(&self, category: Category) -> bool {
        !matches!(category, Category::Dto)
    }

    fn add_beans_to_reload(&mut self, types: Vec<TypeHandle>, category: Category) {
        if category == Category::Entity {
            // Entities are not beans; a change only triggers a retry pass
            trace!("{} entity changes, retrying deferred beans", types.len());
            return;
        }
        for ty in types {
            self.to_reload.insert(ty.qualified_name().to_string(), ty);
        }
    }

    fn has_beans_to_reload(&self) -> bool {
        !self.to_reload.is_empty() || !self.waits.is_empty()
    }

    async fn reload(&mut self) -> ReloadResult<()> {
        let container = self.container()?;

        let mut working: IndexMap<String, TypeHandle> = self
            .waits
            .drain()
            .into_iter()
            .map(|ty| (ty.qualified_name().to_string(), ty))
            .collect();
        for (name, ty) in self.to_reload.drain(..) {
            working.insert(name, ty);
        }
        if working.is_empty() {
            self.last_cycle = CycleSummary::default();
            return Ok(());
        }

        let (new_types, existing): (Vec<TypeHandle>, Vec<TypeHandle>) = working
            .into_values()
            .partition(|ty| !container.contains_bean(&ty.bean_name()));
        debug!(
            "Rewiring {} new and {} existing types",
            new_types.len(),
            existing.len()
        );

        let mut summary = CycleSummary::default();
        let declared = self.declare_new(&container, new_types, &mut summary);
        self.instantiate_new(&container, declared, &mut summary);
        self.rewire_existing(&container, existing, &mut summary);

        if summary.completed_any() {
            self.process_listeners();
        }

        info!(
            created = summary.created.len(),
            rewired = summary.rewired.len(),
            deferred = summary.deferred.len(),
            "Rewiring finished"
        );
        self.last_cycle = summary;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
