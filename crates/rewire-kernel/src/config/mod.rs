//! Hot-reload configuration
//!
//! [`HotReloadConfig`] is plain serde data with defaults for every field, so
//! it can be built programmatically with the `with_*` methods or loaded with
//! the multi-format loader (feature `config`) from YAML, TOML, JSON, INI, RON
//! or JSON5, with `${VAR}` substitution and environment overrides.

#[cfg(feature = "config")]
mod loader;
mod settings;

#[cfg(feature = "config")]
pub use loader::{
    ConfigError, ConfigResult, detect_format, from_str, load_config, load_merged, load_with_env,
    merge_configs, substitute_env_vars,
};
pub use settings::{CategoryToggles, HotReloadConfig, PackageConfig};
