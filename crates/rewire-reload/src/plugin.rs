//! Redefinition entry point
//!
//! The external redefinition mechanism calls
//! [`RedefinitionPlugin::on_type_redefined`] for every type it swapped in.
//! Types outside the project, proxy-synthesized types, unclassifiable types
//! and disabled categories are ignored; everything else is queued.

use chrono::{DateTime, Utc};
use tracing::trace;

use rewire_kernel::config::CategoryToggles;
use rewire_kernel::reload::{Category, ChangeEvent};
use rewire_kernel::types::TypeHandle;
use rewire_kernel::HotReloadConfig;

use crate::aggregator::ChangeAggregator;
use crate::classifier::CategoryClassifier;

/// Filters, classifies and forwards redefinition callbacks
#[derive(Clone)]
pub struct RedefinitionPlugin {
    project_prefix: String,
    synthetic_infixes: Vec<String>,
    toggles: CategoryToggles,
    classifier: CategoryClassifier,
    aggregator: ChangeAggregator,
}

impl RedefinitionPlugin {
    pub fn new(config: &HotReloadConfig, aggregator: ChangeAggregator) -> Self {
        Self {
            project_prefix: config.packages.project.clone(),
            synthetic_infixes: config.synthetic_infixes.clone(),
            toggles: config.categories,
            classifier: CategoryClassifier::from_config(config),
            aggregator,
        }
    }

    /// Whether `qualified_name` may be classified at all
    pub fn accepts(&self, qualified_name: &str) -> bool {
        qualified_name.starts_with(&self.project_prefix)
            && !self
                .synthetic_infixes
                .iter()
                .any(|infix| qualified_name.contains(infix.as_str()))
    }

    /// Handle one redefinition. Returns the category it was queued under.
    pub fn on_type_redefined(
        &self,
        qualified_name: &str,
        type_handle: TypeHandle,
        timestamp: DateTime<Utc>,
    ) -> Option<Category> {
        if !self.accepts(qualified_name) {
            trace!("Ignoring redefinition of {}", qualified_name);
            return None;
        }

        let category = self.classifier.classify(&type_handle)?;
        if !self.toggles.is_enabled(category) {
            trace!("Reloading of {} is disabled, ignoring {}", category, qualified_name);
            return None;
        }

        let mut event = ChangeEvent::new(type_handle, category).with_timestamp(timestamp);
        event.qualified_name = qualified_name.to_string();
        self.aggregator.submit(event);
        Some(category)
    }
}
