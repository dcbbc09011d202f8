//! Change aggregation and debouncing
//!
//! Producers call [`ChangeAggregator::submit`] from any thread. A single
//! background loop wakes every `batch_delay`; a burst of submissions keeps
//! pushing the cycle back by one interval, and once the burst is over the
//! loop hands a snapshot of every non-empty category queue to the
//! [`ReloadCoordinator`]. Only the loop runs cycles, so at most one cycle is
//! ever in flight.
//!
//! ```text
//! Idle ──submit──▶ Pending ──quiet interval──▶ CycleRunning ──▶ Idle
//!                     ▲                              │
//!                     └──────── backlog left ────────┘
//! ```

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, info_span, trace};

use rewire_kernel::reload::{Category, ChangeEvent, ReloadError, ReloadResult};
use rewire_kernel::types::TypeHandle;

use crate::coordinator::{CycleReport, ReloadCoordinator};

/// Observable state of the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorPhase {
    Idle,
    Pending,
    CycleRunning,
}

/// Result of one loop wake-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing queued and no backlog
    Idle,
    /// Changes arrived since the last wake-up; the cycle is pushed back one interval
    Debounced,
    /// A cycle ran
    Cycle(CycleReport),
    /// Another caller's cycle is still in flight; nothing was done
    Busy,
}

#[derive(Default)]
struct QueueState {
    /// Per-category sets keyed by qualified name; re-submission replaces the handle
    queues: IndexMap<Category, IndexMap<String, TypeHandle>>,
    pending: bool,
    keep_waiting: bool,
    cycle_running: bool,
}

impl QueueState {
    fn has_queued(&self) -> bool {
        self.queues.values().any(|q| !q.is_empty())
    }

    fn take_snapshot(&mut self) -> IndexMap<Category, Vec<TypeHandle>> {
        self.queues
            .drain(..)
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(category, queue)| (category, queue.into_values().collect()))
            .collect()
    }
}

struct Inner {
    state: Mutex<QueueState>,
    coordinator: tokio::sync::Mutex<ReloadCoordinator>,
    batch_delay: Duration,
    running: AtomicBool,
    completed_cycles: AtomicU64,
    stop: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Debouncing change queue in front of the reloader chain
#[derive(Clone)]
pub struct ChangeAggregator {
    inner: Arc<Inner>,
}

impl ChangeAggregator {
    pub fn new(coordinator: ReloadCoordinator, batch_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                coordinator: tokio::sync::Mutex::new(coordinator),
                batch_delay,
                running: AtomicBool::new(false),
                completed_cycles: AtomicU64::new(0),
                stop: Notify::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn batch_delay(&self) -> Duration {
        self.inner.batch_delay
    }

    /// Queue a classified change and restart the debounce window
    pub fn submit(&self, event: ChangeEvent) {
        let mut state = self.inner.state.lock();
        trace!(
            "Queued {} as {} ({})",
            event.qualified_name, event.category, event.timestamp
        );
        state
            .queues
            .entry(event.category)
            .or_default()
            .insert(event.qualified_name, event.type_handle);
        state.pending = true;
        state.keep_waiting = true;
    }

    pub fn phase(&self) -> AggregatorPhase {
        let state = self.inner.state.lock();
        if state.cycle_running {
            AggregatorPhase::CycleRunning
        } else if state.pending {
            AggregatorPhase::Pending
        } else {
            AggregatorPhase::Idle
        }
    }

    /// Number of types currently queued across all categories
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queues.values().map(|q| q.len()).sum()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.inner.completed_cycles.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Inspect the coordinator, waiting for any running cycle to finish
    pub async fn with_coordinator<R>(&self, f: impl FnOnce(&ReloadCoordinator) -> R) -> R {
        let coordinator = self.inner.coordinator.lock().await;
        f(&coordinator)
    }

    /// One loop wake-up. Exposed so a host can drive cycles without the background loop;
    /// returns [`TickOutcome::Busy`] while another cycle is in flight.
    pub async fn tick(&self) -> TickOutcome {
        Self::tick_inner(&self.inner).await
    }

    /// Start the background loop on the current tokio runtime
    pub fn start(&self) -> ReloadResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ReloadError::Internal(format!("no tokio runtime: {e}")))?;

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ReloadError::AlreadyRunning);
        }

        info!(
            "Starting change aggregator (batch delay {:?})",
            self.inner.batch_delay
        );
        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(async move { Self::run_loop(inner).await });
        *self.inner.task.lock() = Some(handle);
        Ok(())
    }

    /// Stop the loop and wait for it; a cycle already in flight runs to completion.
    pub async fn shutdown(&self) -> ReloadResult<()> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Err(ReloadError::NotRunning);
        }
        self.inner.stop.notify_one();

        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| ReloadError::Internal(format!("aggregator loop failed: {e}")))?;
        }
        info!("Change aggregator stopped");
        Ok(())
    }

    async fn run_loop(inner: Arc<Inner>) {
        let mut ticker = tokio::time::interval(inner.batch_delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        while inner.running.load(Ordering::SeqCst) {
            tokio::select! {
                biased;
                _ = inner.stop.notified() => break,
                _ = ticker.tick() => {}
            }
            if !inner.running.load(Ordering::SeqCst) {
                break;
            }
            Self::tick_inner(&inner).await;
        }
        debug!("Change aggregator loop exited");
    }

    async fn tick_inner(inner: &Inner) -> TickOutcome {
        let snapshot = {
            let mut state = inner.state.lock();
            if state.cycle_running {
                trace!("A reload cycle is already in flight");
                return TickOutcome::Busy;
            }
            if !state.pending {
                return TickOutcome::Idle;
            }
            if state.keep_waiting {
                state.keep_waiting = false;
                trace!("Changes still arriving, waiting one more interval");
                return TickOutcome::Debounced;
            }
            state.cycle_running = true;
            state.take_snapshot()
        };

        let cycle = inner.completed_cycles.load(Ordering::SeqCst) + 1;
        let span = info_span!("reload_cycle", cycle);
        let report = async {
            let queued: usize = snapshot.values().map(Vec::len).sum();
            info!("Reload cycle started with {} changed types", queued);
            let report = inner.coordinator.lock().await.run_cycle(&snapshot).await;
            if report.failed.is_empty() {
                info!("Reload cycle finished (backlog: {})", report.backlog);
            } else {
                error!(
                    "Reload cycle finished with failing reloaders: {:?}",
                    report.failed
                );
            }
            report
        }
        .instrument(span)
        .await;

        inner.completed_cycles.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = inner.state.lock();
            state.cycle_running = false;
            // Changes submitted during the cycle keep their own pending flag
            state.pending = report.backlog || state.has_queued();
        }
        TickOutcome::Cycle(report)
    }
}
