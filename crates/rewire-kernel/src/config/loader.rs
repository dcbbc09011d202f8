//! Multi-format configuration loader
//!
//! Format is chosen from the file extension. `${VAR}` and `$VAR` references
//! are substituted from the process environment before parsing; unknown
//! variables are left untouched.

use config::{Config as Cfg, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// Supported: `.yaml`/`.yml`, `.toml`, `.json`, `.ini`, `.ron`, `.json5`.
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(format!("no file extension: {path}")))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute `${VAR}` and `$VAR` references with environment values
pub fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let lookup = |caps: &Captures| std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string());

    let braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let bare = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let result = braced.replace_all(content, lookup);
    Ok(bare.replace_all(&result, lookup).into_owned())
}

fn add_content(
    builder: ConfigBuilder<DefaultState>,
    content: &str,
    format: FileFormat,
) -> ConfigResult<ConfigBuilder<DefaultState>> {
    let substituted = substitute_env_vars(content)?;
    Ok(builder.add_source(File::from_str(&substituted, format)))
}

fn finish<T: DeserializeOwned>(builder: ConfigBuilder<DefaultState>) -> ConfigResult<T> {
    let config = builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file
///
/// ```rust,ignore
/// let config: HotReloadConfig = rewire_kernel::config::load_config("rewire.toml")?;
/// ```
pub fn load_config<T: DeserializeOwned>(path: &str) -> ConfigResult<T> {
    load_merged(&[path])
}

/// Load configuration from a string with explicit format
pub fn from_str<T: DeserializeOwned>(content: &str, format: FileFormat) -> ConfigResult<T> {
    finish(add_content(Cfg::builder(), content, format)?)
}

/// Merge several in-memory sources; later sources override earlier ones
pub fn merge_configs<T: DeserializeOwned>(sources: &[(&str, FileFormat)]) -> ConfigResult<T> {
    let mut builder = Cfg::builder();
    for (content, format) in sources {
        builder = add_content(builder, content, *format)?;
    }
    finish(builder)
}

/// Load several files; later files override earlier ones
pub fn load_merged<T: DeserializeOwned>(paths: &[&str]) -> ConfigResult<T> {
    let mut builder = Cfg::builder();
    for path in paths {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        builder = add_content(builder, &content, format)?;
    }
    finish(builder)
}

/// Load a file, then apply environment overrides
///
/// Variables use `prefix` and `__` for nesting: with prefix `REWIRE`,
/// `REWIRE_PACKAGES__DOMAIN` overrides `packages.domain`.
pub fn load_with_env<T: DeserializeOwned>(path: &str, env_prefix: &str) -> ConfigResult<T> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    let builder = add_content(Cfg::builder(), &content, format)?.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    finish(builder)
}
