//! Change categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional role of a redefined type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Entity,
    Repository,
    Service,
    Controller,
    Component,
    Dto,
}

impl Category {
    /// Every category, in the order queues are delivered to a reloader
    pub const ALL: [Category; 6] = [
        Category::Entity,
        Category::Dto,
        Category::Repository,
        Category::Service,
        Category::Component,
        Category::Controller,
    ];

    /// Display name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Category::Entity => "entities",
            Category::Repository => "repositories",
            Category::Service => "services",
            Category::Controller => "controllers",
            Category::Component => "components",
            Category::Dto => "dtos",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
