//! Rewire kernel
//!
//! Contracts shared by the hot-reload runtime:
//! - [`types`]: static descriptions of managed types (markers, scope, dependencies, operations)
//! - [`container`]: the in-process object container and its proxy-aware bean handles
//! - [`reload`]: change categories, change events and the Reloader / InstanceLoader /
//!   RewiringListener extension points
//! - [`config`]: hot-reload configuration and the multi-format loader

// types module
pub mod types;
pub use types::*;

// container module
pub mod container;
pub use container::{
    Advisor, AnnotationAdvisor, BeanEntry, BeanHandle, BeanState, Container, ContainerError,
    ContainerResult, ManagedInstance,
};

// reload module
pub mod reload;
pub use reload::{
    Category, ChangeEvent, InstanceLoader, Reloader, ReloadError, ReloadResult, RewiringListener,
};

// config module
pub mod config;
pub use config::HotReloadConfig;

// error module
pub mod error;
pub use error::{IntoKernelReport, KernelError, KernelResult};
