//! Reloader coordination
//!
//! Holds the priority-ordered reloader chain and drives it through one cycle.
//! Every reloader call runs inside its own isolation boundary: an error or a
//! panic is logged and the remaining reloaders still run.

use futures::FutureExt;
use indexmap::IndexMap;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, trace, warn};

use rewire_kernel::reload::{Category, ReloadResult, Reloader};
use rewire_kernel::types::TypeHandle;

/// Outcome of one coordinated cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Reloaders whose `reload()` was invoked, in call order
    pub reloaded: Vec<String>,
    /// Reloaders that returned an error or panicked
    pub failed: Vec<String>,
    /// Whether any reloader still reports work after the cycle
    pub backlog: bool,
}

/// Drives the reloader chain
pub struct ReloadCoordinator {
    reloaders: Vec<Box<dyn Reloader>>,
}

impl ReloadCoordinator {
    /// Order `reloaders` ascending by [`Reloader::order`]; ties keep registration order.
    pub fn new(mut reloaders: Vec<Box<dyn Reloader>>) -> Self {
        reloaders.sort_by_key(|r| r.order());
        Self { reloaders }
    }

    pub fn reloader_names(&self) -> Vec<String> {
        self.reloaders.iter().map(|r| r.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.reloaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reloaders.is_empty()
    }

    /// Whether any reloader has work left over from an earlier cycle
    pub fn has_backlog(&self) -> bool {
        self.reloaders.iter().any(|r| r.has_beans_to_reload())
    }

    /// First reloader of concrete type `T`
    pub fn find<T: Any>(&self) -> Option<&T> {
        self.reloaders
            .iter()
            .find_map(|r| r.as_any().downcast_ref::<T>())
    }

    /// Run one cycle over `snapshot`, the non-empty category queues.
    pub async fn run_cycle(&mut self, snapshot: &IndexMap<Category, Vec<TypeHandle>>) -> CycleReport {
        let mut report = CycleReport::default();

        for reloader in self.reloaders.iter_mut() {
            let name = reloader.name().to_string();
            let outcome = AssertUnwindSafe(drive(reloader.as_mut(), snapshot))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(true)) => report.reloaded.push(name.clone()),
                Ok(Ok(false)) => trace!("Reloader '{}' had nothing to do", name),
                Ok(Err(e)) => {
                    warn!("Reloader '{}' failed: {}", name, e);
                    report.reloaded.push(name.clone());
                    report.failed.push(name.clone());
                }
                Err(panic) => {
                    warn!("Reloader '{}' panicked: {}", name, panic_message(&*panic));
                    report.failed.push(name.clone());
                }
            }

            let backlog = std::panic::catch_unwind(AssertUnwindSafe(|| reloader.has_beans_to_reload()))
                .unwrap_or(false);
            if backlog {
                debug!("Reloader '{}' reports backlog", name);
                report.backlog = true;
            }
        }

        report
    }
}

/// One reloader's share of a cycle. Returns whether `reload()` ran.
async fn drive(
    reloader: &mut dyn Reloader,
    snapshot: &IndexMap<Category, Vec<TypeHandle>>,
) -> ReloadResult<bool> {
    reloader.prepare();

    let mut delivered = false;
    for category in Category::ALL {
        if !reloader.supports(category) {
            continue;
        }
        if let Some(types) = snapshot.get(&category).filter(|t| !t.is_empty()) {
            trace!(
                "Delivering {} {} to '{}'",
                types.len(),
                category,
                reloader.name()
            );
            reloader.add_beans_to_reload(types.clone(), category);
            delivered = true;
        }
    }

    if delivered || reloader.has_beans_to_reload() {
        reloader.reload().await?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
