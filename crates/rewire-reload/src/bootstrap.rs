//! Hot-reload bootstrap
//!
//! Builds the reloader chain from a [`HotReloadConfig`], hands every reloader
//! the container, starts the aggregator loop and exposes the redefinition
//! entry point. Nothing is registered when hot reload is disabled.

use chrono::{DateTime, Utc};
use error_stack::ResultExt;
use std::sync::Arc;
use tracing::info;

use rewire_kernel::container::Container;
use rewire_kernel::error::{IntoKernelReport, KernelError, KernelResult};
use rewire_kernel::reload::{Category, Reloader};
use rewire_kernel::types::TypeHandle;
use rewire_kernel::HotReloadConfig;

use crate::aggregator::ChangeAggregator;
use crate::coordinator::ReloadCoordinator;
use crate::engine::RewiringEngine;
use crate::plugin::RedefinitionPlugin;

/// Builder for [`HotReload`]
pub struct HotReloadBuilder {
    config: HotReloadConfig,
    container: Option<Arc<Container>>,
    engine: Option<RewiringEngine>,
    reloaders: Vec<Box<dyn Reloader>>,
}

impl HotReloadBuilder {
    fn new(config: HotReloadConfig) -> Self {
        Self {
            config,
            container: None,
            engine: None,
            reloaders: Vec::new(),
        }
    }

    /// Operate on an existing container instead of a fresh one
    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Use a preconfigured rewiring engine (loaders, listeners)
    pub fn engine(mut self, engine: RewiringEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Register an additional reloader
    pub fn reloader(mut self, reloader: Box<dyn Reloader>) -> Self {
        self.reloaders.push(reloader);
        self
    }

    /// Initialise every reloader and start the aggregator loop.
    ///
    /// Returns `Ok(None)` when hot reload is disabled. Must be called within a
    /// tokio runtime.
    pub fn start(self) -> KernelResult<Option<HotReload>> {
        if !self.config.enabled {
            info!("Hot reload is disabled");
            return Ok(None);
        }

        let container = self.container.unwrap_or_default();
        let engine = self.engine.unwrap_or_else(|| {
            RewiringEngine::new().with_wait_alert_threshold(self.config.wait_alert_threshold)
        });

        let mut reloaders: Vec<Box<dyn Reloader>> = Vec::with_capacity(self.reloaders.len() + 1);
        reloaders.push(Box::new(engine));
        reloaders.extend(self.reloaders);

        for reloader in reloaders.iter_mut() {
            let name = reloader.name().to_string();
            reloader
                .init(container.clone())
                .map_err(KernelError::from)
                .into_report()
                .attach(format!("initialising reloader '{name}'"))?;
        }

        let coordinator = ReloadCoordinator::new(reloaders);
        info!("Hot reload reloaders: {:?}", coordinator.reloader_names());

        let aggregator = ChangeAggregator::new(coordinator, self.config.batch_delay());
        aggregator
            .start()
            .map_err(KernelError::from)
            .into_report()
            .attach("starting the change aggregator")?;

        let plugin = RedefinitionPlugin::new(&self.config, aggregator.clone());
        Ok(Some(HotReload {
            config: self.config,
            container,
            aggregator,
            plugin,
        }))
    }
}

/// A running hot-reload subsystem
pub struct HotReload {
    config: HotReloadConfig,
    container: Arc<Container>,
    aggregator: ChangeAggregator,
    plugin: RedefinitionPlugin,
}

impl HotReload {
    pub fn builder(config: HotReloadConfig) -> HotReloadBuilder {
        HotReloadBuilder::new(config)
    }

    /// Start with the default reloader chain
    pub fn start(config: HotReloadConfig) -> KernelResult<Option<HotReload>> {
        Self::builder(config).start()
    }

    /// Load a configuration file, applying `REWIRE_*` environment overrides
    pub fn load_config(path: &str) -> KernelResult<HotReloadConfig> {
        rewire_kernel::config::load_with_env(path, "REWIRE")
            .map_err(KernelError::from)
            .into_report()
            .attach(format!("loading hot reload configuration from {path}"))
    }

    pub fn config(&self) -> &HotReloadConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn aggregator(&self) -> &ChangeAggregator {
        &self.aggregator
    }

    pub fn plugin(&self) -> &RedefinitionPlugin {
        &self.plugin
    }

    /// Entry point for the external redefinition mechanism
    pub fn on_type_redefined(
        &self,
        qualified_name: &str,
        type_handle: TypeHandle,
        timestamp: DateTime<Utc>,
    ) -> Option<Category> {
        self.plugin
            .on_type_redefined(qualified_name, type_handle, timestamp)
    }

    /// Stop the aggregator loop, letting an in-flight cycle finish
    pub async fn shutdown(self) -> KernelResult<()> {
        self.aggregator
            .shutdown()
            .await
            .map_err(KernelError::from)
            .into_report()
            .attach("stopping the change aggregator")
    }
}
