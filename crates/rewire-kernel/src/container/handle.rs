//! Bean handles
//!
//! A [`BeanHandle`] is the stable object other beans hold on to. It owns an
//! exchangeable target ([`ManagedInstance`]) and, for proxied beans, the list
//! of advisors intercepting calls. Wiring always operates on the target;
//! swapping the target never invalidates references to the handle.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::advice::Advisor;
use crate::types::TypeHandle;

/// Whether a handle is a plain reference or an interception wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Plain,
    Proxy,
}

/// Stable reference to a managed bean
pub struct BeanHandle {
    name: String,
    kind: HandleKind,
    advisors: RwLock<Vec<Arc<dyn Advisor>>>,
    target: RwLock<Option<Arc<ManagedInstance>>>,
}

impl BeanHandle {
    /// Create a plain handle with no target yet
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: HandleKind::Plain,
            advisors: RwLock::new(Vec::new()),
            target: RwLock::new(None),
        }
    }

    /// Create an interception wrapper carrying `advisors`
    pub fn proxied(name: &str, advisors: Vec<Arc<dyn Advisor>>) -> Self {
        Self {
            name: name.to_string(),
            kind: HandleKind::Proxy,
            advisors: RwLock::new(advisors),
            target: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn is_proxy(&self) -> bool {
        self.kind == HandleKind::Proxy
    }

    /// The wrapped target, if creation has completed
    pub fn target(&self) -> Option<Arc<ManagedInstance>> {
        self.target.read().clone()
    }

    /// Replace the target, returning the previous one
    pub fn swap_target(&self, target: Arc<ManagedInstance>) -> Option<Arc<ManagedInstance>> {
        self.target.write().replace(target)
    }

    pub(crate) fn clear_target(&self) {
        self.target.write().take();
    }

    pub fn advisor_names(&self) -> Vec<String> {
        self.advisors
            .read()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Attach an advisor unless one with the same name is already present.
    ///
    /// Returns `true` when the advisor was added.
    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) -> bool {
        let mut advisors = self.advisors.write();
        if advisors.iter().any(|a| a.name() == advisor.name()) {
            return false;
        }
        advisors.push(advisor);
        true
    }

    /// Run `f` against the target payload when it is of type `T`
    pub fn with_payload<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let target = self.target()?;
        target.payload::<T>().map(f)
    }
}

impl fmt::Debug for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("advisors", &self.advisor_names())
            .field("has_target", &self.target.read().is_some())
            .finish()
    }
}

/// The object behind a handle: a payload plus its injected collaborators
pub struct ManagedInstance {
    type_handle: TypeHandle,
    payload: Box<dyn Any + Send + Sync>,
    fields: RwLock<IndexMap<String, Arc<BeanHandle>>>,
}

impl ManagedInstance {
    pub fn new(type_handle: TypeHandle, payload: Box<dyn Any + Send + Sync>) -> Self {
        Self {
            type_handle,
            payload,
            fields: RwLock::new(IndexMap::new()),
        }
    }

    /// The type description the instance was created from
    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The collaborator injected into `field`, `None` when the field is null
    pub fn field(&self, field: &str) -> Option<Arc<BeanHandle>> {
        self.fields.read().get(field).cloned()
    }

    pub fn is_injected(&self, field: &str) -> bool {
        self.fields.read().contains_key(field)
    }

    /// Set `field`, replacing any previous collaborator
    pub fn inject(&self, field: &str, collaborator: Arc<BeanHandle>) {
        self.fields.write().insert(field.to_string(), collaborator);
    }

    pub fn injected_fields(&self) -> Vec<String> {
        self.fields.read().keys().cloned().collect()
    }
}

impl fmt::Debug for ManagedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedInstance")
            .field("type", &self.type_handle.qualified_name())
            .field("fields", &self.injected_fields())
            .finish_non_exhaustive()
    }
}
