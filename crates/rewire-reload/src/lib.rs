//! Rewire reload runtime
//!
//! Control flow of one change:
//! redefinition callback → [`RedefinitionPlugin`] → [`CategoryClassifier`] →
//! [`ChangeAggregator`] queue → (after quiescence) [`ReloadCoordinator`] →
//! every [`Reloader`](rewire_kernel::Reloader), the primary one being the
//! [`RewiringEngine`], which dispatches to instance loaders and rewiring listeners.

pub mod aggregator;
pub mod bootstrap;
pub mod cache;
pub mod classifier;
pub mod coordinator;
pub mod engine;
pub mod listener;
pub mod loader;
pub mod plugin;

pub use aggregator::{AggregatorPhase, ChangeAggregator, TickOutcome};
pub use bootstrap::{HotReload, HotReloadBuilder};
pub use cache::{CacheFlushReloader, FlushableCache};
pub use classifier::CategoryClassifier;
pub use coordinator::{CycleReport, ReloadCoordinator};
pub use engine::{CycleSummary, ExistingWaitRecord, RewiringEngine};
pub use listener::{RouteEntry, RouteMappingListener, RouteTable};
pub use loader::{DefaultInstanceLoader, RepositoryFactory, RepositoryInstanceLoader};
pub use plugin::RedefinitionPlugin;
