//! Request-route table rebuilt from newly introduced handler beans

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use rewire_kernel::container::Container;
use rewire_kernel::reload::{LOWEST_PRECEDENCE, ReloadResult, RewiringListener};
use rewire_kernel::types::{RequestMethod, TypeDescriptor, TypeHandle};

/// One request mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: RequestMethod,
    pub path: String,
    /// Bean name of the handler
    pub handler: String,
    /// Operation name on the handler
    pub operation: String,
}

/// Shared route table; clones observe the same routes
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Arc<RwLock<IndexMap<(RequestMethod, String), RouteEntry>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, method: RequestMethod, path: &str) -> Option<RouteEntry> {
        self.routes.read().get(&(method, path.to_string())).cloned()
    }

    pub fn entries(&self) -> Vec<RouteEntry> {
        self.routes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Replace every route with `entries`. On a duplicate mapping the first one wins.
    fn rebuild(&self, entries: Vec<RouteEntry>) {
        let mut routes = self.routes.write();
        routes.clear();
        for entry in entries {
            let key = (entry.method, entry.path.clone());
            if let Some(existing) = routes.get(&key) {
                warn!(
                    "Ambiguous mapping {} {}: '{}' is already mapped by '{}'",
                    entry.method, entry.path, entry.handler, existing.handler
                );
                continue;
            }
            routes.insert(key, entry);
        }
    }
}

/// Maps the operations of newly introduced handler beans into a [`RouteTable`]
///
/// Handlers present before hot reload are routed by the host; this listener
/// only owns routes of handlers introduced at runtime. A handler stops being
/// tracked once it is reported as rewired instead of new.
pub struct RouteMappingListener {
    table: RouteTable,
    tracked: IndexMap<String, TypeHandle>,
}

impl RouteMappingListener {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            tracked: IndexMap::new(),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Qualified names of the handlers currently owned by this listener
    pub fn tracked(&self) -> Vec<String> {
        self.tracked.keys().cloned().collect()
    }
}

impl RewiringListener for RouteMappingListener {
    fn name(&self) -> &str {
        "route-mapping"
    }

    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE - 3
    }

    fn init(&mut self, _container: Arc<Container>) -> ReloadResult<()> {
        Ok(())
    }

    fn support(&self, ty: &TypeDescriptor) -> bool {
        ty.is_handler()
    }

    fn add_beans_to_process(&mut self, ty: &TypeHandle, is_new: bool) {
        let key = ty.qualified_name().to_string();
        if is_new {
            self.tracked.insert(key, ty.clone());
        } else if self.tracked.shift_remove(&key).is_some() {
            debug!("Handler {} is no longer new, releasing its routes", key);
        }
    }

    fn process(&mut self) -> ReloadResult<()> {
        let entries: Vec<RouteEntry> = self
            .tracked
            .values()
            .flat_map(|ty| {
                let handler = ty.bean_name();
                ty.operations().iter().map(move |op| RouteEntry {
                    method: op.method,
                    path: op.path.clone(),
                    handler: handler.clone(),
                    operation: op.name.clone(),
                })
            })
            .collect();

        debug!(
            "Rebuilding route table from {} handlers ({} routes)",
            self.tracked.len(),
            entries.len()
        );
        self.table.rebuild(entries);
        Ok(())
    }
}
