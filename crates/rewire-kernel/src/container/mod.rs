//! Object container
//!
//! Maps unique bean names to their declared type, scope and (once created)
//! their [`BeanHandle`]. Creation resolves declared collaborators by type and
//! publishes a singleton's handle before its collaborators are resolved, so
//! beans that reference each other can be created from declarations alone.

mod advice;
mod error;
mod handle;

pub use advice::{Advisor, AnnotationAdvisor};
pub use error::{ContainerError, ContainerResult};
pub use handle::{BeanHandle, HandleKind, ManagedInstance};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use crate::types::{Scope, TypeDescriptor, TypeHandle};

/// Lifecycle state of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeanState {
    /// Definition registered, no instance yet
    Declared,
    /// Instance created
    Instantiated,
    /// Instance created and every injectable field resolved after a reload
    Wired,
}

/// A registry entry, keyed by its unique name
#[derive(Debug, Clone)]
pub struct BeanEntry {
    pub name: String,
    pub scope: Scope,
    pub type_handle: TypeHandle,
    pub instance: Option<Arc<BeanHandle>>,
    pub state: BeanState,
}

/// Handles published during one top-level creation, rolled back together on failure
#[derive(Default)]
struct CreationScope {
    published: Vec<(String, Arc<BeanHandle>)>,
    prototypes: Vec<String>,
}

/// Rolls a [`CreationScope`] back on drop unless creation succeeded, so a
/// panicking payload factory leaves no half-built handles behind
struct CreationGuard<'a> {
    container: &'a Container,
    scope: CreationScope,
    keep: bool,
}

impl<'a> CreationGuard<'a> {
    fn new(container: &'a Container) -> Self {
        Self {
            container,
            scope: CreationScope::default(),
            keep: false,
        }
    }

    fn keep_if(&mut self, succeeded: bool) {
        self.keep = succeeded;
    }
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.container.discard(std::mem::take(&mut self.scope));
        }
    }
}

/// In-process object container
pub struct Container {
    entries: RwLock<IndexMap<String, BeanEntry>>,
    advisors: RwLock<Vec<Arc<dyn Advisor>>>,
    revision: AtomicU64,
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            advisors: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
        }
    }

    /// Monotonic counter bumped by every registry mutation
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Register a cross-cutting advisor for beans created from now on
    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) {
        debug!("Registering advisor: {}", advisor.name());
        self.advisors.write().push(advisor);
    }

    /// Advisors that apply to `ty`
    pub fn advisors_for(&self, ty: &TypeDescriptor) -> Vec<Arc<dyn Advisor>> {
        self.advisors
            .read()
            .iter()
            .filter(|a| a.applies_to(ty))
            .cloned()
            .collect()
    }

    /// Declare a bean definition without creating it
    pub fn declare(&self, name: &str, type_handle: TypeHandle, scope: Scope) -> ContainerResult<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(ContainerError::DuplicateBeanName(name.to_string()));
        }

        debug!(
            "Declaring bean '{}' ({}, {})",
            name,
            type_handle.qualified_name(),
            scope
        );
        entries.insert(
            name.to_string(),
            BeanEntry {
                name: name.to_string(),
                scope,
                type_handle,
                instance: None,
                state: BeanState::Declared,
            },
        );
        self.bump();
        Ok(())
    }

    /// Declare `type_handle` under its derived name and scope, then create it.
    ///
    /// The declaration is removed again if creation fails.
    pub fn register_type(&self, type_handle: TypeHandle) -> ContainerResult<Arc<BeanHandle>> {
        let name = type_handle.bean_name();
        let scope = type_handle.scope().clone();
        self.declare(&name, type_handle, scope)?;

        match self.get_bean(&name) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.remove_definition(&name);
                Err(e)
            }
        }
    }

    /// Register a ready-made singleton under `name`.
    ///
    /// An existing handle keeps its identity and only gets its target swapped,
    /// so collaborators already holding it see the new instance.
    pub fn register_singleton(
        &self,
        name: &str,
        type_handle: TypeHandle,
        payload: Box<dyn Any + Send + Sync>,
    ) -> ContainerResult<Arc<BeanHandle>> {
        let instance = Arc::new(ManagedInstance::new(type_handle.clone(), payload));
        let mut entries = self.entries.write();

        let handle = match entries.get(name).and_then(|e| e.instance.clone()) {
            Some(handle) => handle,
            None => Arc::new(self.new_handle(name, &type_handle)),
        };
        handle.swap_target(instance);

        debug!("Registering singleton '{}' ({})", name, type_handle.qualified_name());
        entries.insert(
            name.to_string(),
            BeanEntry {
                name: name.to_string(),
                scope: Scope::Singleton,
                type_handle,
                instance: Some(handle.clone()),
                state: BeanState::Instantiated,
            },
        );
        self.bump();
        Ok(handle)
    }

    /// Remove a bean definition, returning it
    pub fn remove_definition(&self, name: &str) -> Option<BeanEntry> {
        let removed = self.entries.write().shift_remove(name);
        if removed.is_some() {
            debug!("Removed bean definition '{}'", name);
            self.bump();
        }
        removed
    }

    /// Whether a definition is registered under `name`
    pub fn contains_bean(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Snapshot of the entry registered under `name`
    pub fn entry(&self, name: &str) -> Option<BeanEntry> {
        self.entries.read().get(name).cloned()
    }

    pub fn state(&self, name: &str) -> Option<BeanState> {
        self.entries.read().get(name).map(|e| e.state)
    }

    /// Update the lifecycle state of an entry
    pub fn set_state(&self, name: &str, state: BeanState) -> ContainerResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ContainerError::NoSuchBean(name.to_string()))?;

        if entry.state != state {
            trace!("Bean '{}' state: {:?} -> {:?}", name, entry.state, state);
            entry.state = state;
            self.bump();
        }
        Ok(())
    }

    /// Replace the type description of an existing entry (a redefinition)
    pub fn update_type(&self, name: &str, type_handle: TypeHandle) -> ContainerResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ContainerError::NoSuchBean(name.to_string()))?;

        if !Arc::ptr_eq(&entry.type_handle, &type_handle) {
            entry.type_handle = type_handle;
            self.bump();
        }
        Ok(())
    }

    pub fn bean_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Names of every definition whose type satisfies `type_name`
    pub fn bean_names_for_type(&self, type_name: &str) -> Vec<String> {
        self.entries
            .read()
            .values()
            .filter(|e| e.type_handle.matches_type(type_name))
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get a bean by name, creating it (and any declared collaborators) if needed
    pub fn get_bean(&self, name: &str) -> ContainerResult<Arc<BeanHandle>> {
        let mut guard = CreationGuard::new(self);
        let result = self.get_or_create(name, &mut guard.scope);
        guard.keep_if(result.is_ok());
        result
    }

    /// Get the single bean whose type satisfies `type_name`
    pub fn get_bean_of_type(&self, type_name: &str) -> ContainerResult<Arc<BeanHandle>> {
        let mut guard = CreationGuard::new(self);
        let result = self.resolve_with(type_name, &mut guard.scope);
        guard.keep_if(result.is_ok());
        result
    }

    fn resolve_with(
        &self,
        type_name: &str,
        scope: &mut CreationScope,
    ) -> ContainerResult<Arc<BeanHandle>> {
        let candidates = self.bean_names_for_type(type_name);
        match candidates.as_slice() {
            [] => Err(ContainerError::NoSuchBeanOfType(type_name.to_string())),
            [name] => self.get_or_create(name, scope),
            _ => Err(ContainerError::NonUniqueBean {
                type_name: type_name.to_string(),
                candidates,
            }),
        }
    }

    fn get_or_create(
        &self,
        name: &str,
        scope: &mut CreationScope,
    ) -> ContainerResult<Arc<BeanHandle>> {
        let (type_handle, shared, handle) = {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(name)
                .ok_or_else(|| ContainerError::NoSuchBean(name.to_string()))?;
            let type_handle = entry.type_handle.clone();

            if let (true, Some(handle)) = (entry.scope.is_shared(), &entry.instance) {
                return Ok(handle.clone());
            }
            // Repository payloads only come from their factory
            if type_handle.is_repository_capable() {
                return Err(ContainerError::AwaitingFactory {
                    bean: name.to_string(),
                    type_name: type_handle.qualified_name().to_string(),
                });
            }

            if entry.scope.is_shared() {
                // Publish before resolving collaborators so cycles resolve to this handle
                let handle = Arc::new(self.new_handle(name, &type_handle));
                entry.instance = Some(handle.clone());
                scope.published.push((name.to_string(), handle.clone()));
                self.bump();
                (type_handle, true, handle)
            } else {
                if scope.prototypes.iter().any(|n| n == name) {
                    return Err(ContainerError::CircularReference(name.to_string()));
                }
                scope.prototypes.push(name.to_string());
                let handle = Arc::new(self.new_handle(name, &type_handle));
                (type_handle, false, handle)
            }
        };

        trace!("Creating bean '{}' ({})", name, type_handle.qualified_name());
        let instance = ManagedInstance::new(type_handle.clone(), type_handle.create_payload());
        for point in type_handle.dependencies() {
            let collaborator = self.resolve_with(&point.type_name, scope).map_err(|e| {
                ContainerError::MissingDependency {
                    bean: name.to_string(),
                    field: point.field.clone(),
                    type_name: point.type_name.clone(),
                    reason: e.to_string(),
                }
            })?;
            instance.inject(&point.field, collaborator);
        }
        handle.swap_target(Arc::new(instance));

        if !shared {
            scope.prototypes.retain(|n| n != name);
        }
        if self.state(name) == Some(BeanState::Declared) {
            self.set_state(name, BeanState::Instantiated)?;
        }
        Ok(handle)
    }

    fn discard(&self, scope: CreationScope) {
        if scope.published.is_empty() {
            return;
        }

        let mut entries = self.entries.write();
        for (name, handle) in scope.published {
            handle.clear_target();
            if let Some(entry) = entries.get_mut(&name) {
                let is_ours = entry
                    .instance
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &handle));
                if is_ours {
                    trace!("Discarding partially created bean '{}'", name);
                    entry.instance = None;
                    entry.state = BeanState::Declared;
                }
            }
        }
        self.bump();
    }

    fn new_handle(&self, name: &str, ty: &TypeDescriptor) -> BeanHandle {
        let advisors = self.advisors_for(ty);
        if advisors.is_empty() {
            BeanHandle::plain(name)
        } else {
            BeanHandle::proxied(name, advisors)
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
