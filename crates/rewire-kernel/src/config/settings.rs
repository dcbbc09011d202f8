use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::reload::Category;

/// Package prefixes used to filter and classify redefined types
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Only types under this prefix are considered; empty accepts everything
    pub project: String,
    /// Prefix of persistent entity types; empty disables entity detection
    pub domain: String,
    /// Prefix of transfer objects; empty disables dto detection
    pub dto: String,
}

/// Per-category enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryToggles {
    pub entity: bool,
    pub repository: bool,
    pub service: bool,
    pub controller: bool,
    pub component: bool,
    pub dto: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            entity: true,
            repository: true,
            service: true,
            controller: true,
            component: true,
            dto: true,
        }
    }
}

impl CategoryToggles {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Entity => self.entity,
            Category::Repository => self.repository,
            Category::Service => self.service,
            Category::Controller => self.controller,
            Category::Component => self.component,
            Category::Dto => self.dto,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        let flag = match category {
            Category::Entity => &mut self.entity,
            Category::Repository => &mut self.repository,
            Category::Service => &mut self.service,
            Category::Controller => &mut self.controller,
            Category::Component => &mut self.component,
            Category::Dto => &mut self.dto,
        };
        *flag = enabled;
    }
}

/// Hot-reload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Master switch; nothing is registered when false
    pub enabled: bool,
    /// Debounce interval of the change aggregator, in milliseconds
    pub batch_delay_ms: u64,
    pub packages: PackageConfig,
    pub categories: CategoryToggles,
    /// Name fragments of proxy-synthesized types, which are never classified
    pub synthetic_infixes: Vec<String>,
    /// Cycles a wait record may age before it is reported at warn level
    pub wait_alert_threshold: u32,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_delay_ms: 250,
            packages: PackageConfig::default(),
            categories: CategoryToggles::default(),
            synthetic_infixes: vec!["$$EnhancerBy".to_string(), "$$FastClassBy".to_string()],
            wait_alert_threshold: 40,
        }
    }
}

impl HotReloadConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Enable/disable hot reload
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the debounce interval
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_project_package(mut self, prefix: &str) -> Self {
        self.packages.project = prefix.to_string();
        self
    }

    pub fn with_domain_package(mut self, prefix: &str) -> Self {
        self.packages.domain = prefix.to_string();
        self
    }

    pub fn with_dto_package(mut self, prefix: &str) -> Self {
        self.packages.dto = prefix.to_string();
        self
    }

    /// Enable/disable one category
    pub fn with_category(mut self, category: Category, enabled: bool) -> Self {
        self.categories.set(category, enabled);
        self
    }

    pub fn with_wait_alert_threshold(mut self, cycles: u32) -> Self {
        self.wait_alert_threshold = cycles;
        self
    }
}
