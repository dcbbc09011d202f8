//! Deferred work of the rewiring engine

use indexmap::IndexMap;
use std::collections::HashMap;

use rewire_kernel::types::TypeHandle;

/// An existing bean blocked on a collaborator type that is not registered yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingWaitRecord {
    /// Type the blocked bean needs
    pub missing_type: String,
    /// Qualified name of the blocked bean's type
    pub blocked_type: String,
    /// Consecutive cycles the blocked type has been deferred
    pub attempts: u32,
}

/// `new_wait` and `existing_wait`, plus how often each type was deferred
#[derive(Debug, Default)]
pub(crate) struct WaitSets {
    new_wait: IndexMap<String, TypeHandle>,
    /// Keyed by the missing type; one missing type may block several beans
    existing_wait: IndexMap<String, IndexMap<String, TypeHandle>>,
    attempts: HashMap<String, u32>,
}

impl WaitSets {
    pub(crate) fn is_empty(&self) -> bool {
        self.new_wait.is_empty() && self.existing_wait.is_empty()
    }

    /// Defer a new type whose declaration was rolled back. Returns its attempt count.
    pub(crate) fn push_new(&mut self, ty: &TypeHandle) -> u32 {
        self.new_wait
            .insert(ty.qualified_name().to_string(), ty.clone());
        self.bump(ty.qualified_name())
    }

    /// Defer an existing bean until `missing_type` is available. Returns its attempt count.
    pub(crate) fn push_existing(&mut self, missing_type: &str, ty: &TypeHandle) -> u32 {
        let first_for_cycle = !self
            .existing_wait
            .values()
            .any(|m| m.contains_key(ty.qualified_name()));
        self.existing_wait
            .entry(missing_type.to_string())
            .or_default()
            .insert(ty.qualified_name().to_string(), ty.clone());
        if first_for_cycle {
            self.bump(ty.qualified_name())
        } else {
            self.attempts.get(ty.qualified_name()).copied().unwrap_or(0)
        }
    }

    /// Take every deferred type, new ones first, each type once
    pub(crate) fn drain(&mut self) -> Vec<TypeHandle> {
        let mut merged: IndexMap<String, TypeHandle> = self.new_wait.drain(..).collect();
        for (_, blocked) in self.existing_wait.drain(..) {
            for (name, ty) in blocked {
                merged.entry(name).or_insert(ty);
            }
        }
        merged.into_values().collect()
    }

    /// Forget the attempt count of a type that completed or was dropped
    pub(crate) fn settle(&mut self, qualified_name: &str) {
        self.attempts.remove(qualified_name);
    }

    pub(crate) fn new_wait_types(&self) -> Vec<String> {
        self.new_wait.keys().cloned().collect()
    }

    pub(crate) fn existing_records(&self) -> Vec<ExistingWaitRecord> {
        self.existing_wait
            .iter()
            .flat_map(|(missing, blocked)| {
                blocked.keys().map(move |name| ExistingWaitRecord {
                    missing_type: missing.clone(),
                    blocked_type: name.clone(),
                    attempts: self.attempts.get(name).copied().unwrap_or(0),
                })
            })
            .collect()
    }

    fn bump(&mut self, qualified_name: &str) -> u32 {
        let attempts = self.attempts.entry(qualified_name.to_string()).or_insert(0);
        *attempts += 1;
        *attempts
    }
}
