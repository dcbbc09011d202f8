//! Crate-level error types for `rewire-kernel`.
//!
//! Provides a unified [`KernelError`] that composes errors from every
//! sub-module (container, reload, config) together with
//! [`error_stack::Report`] for context-carrying propagation at startup.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rewire_kernel::error::{IntoKernelReport, KernelResult};
//! use error_stack::ResultExt;
//!
//! fn load() -> KernelResult<HotReloadConfig> {
//!     rewire_kernel::config::load_config("rewire.toml")
//!         .map_err(KernelError::from)
//!         .into_report()
//!         .attach("loading rewire.toml")
//! }
//! ```

use error_stack::Report;
use thiserror::Error;

use crate::container::ContainerError;
use crate::reload::ReloadError;

/// Crate-level error type for `rewire-kernel`.
///
/// Wraps each sub-module's typed error via `#[from]` so that the `?`
/// operator converts them automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// An error raised by the object container.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// An error raised by a reloader, loader or listener.
    #[error("Reload error: {0}")]
    Reload(#[from] ReloadError),

    /// A configuration-related error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal / untyped error described by a message string.
    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, Report<KernelError>>;

/// Extension trait to convert `Result<T, KernelError>` into [`KernelResult<T>`].
pub trait IntoKernelReport<T> {
    /// Wrap the error in an `error_stack::Report`.
    fn into_report(self) -> KernelResult<T>;
}

impl<T> IntoKernelReport<T> for Result<T, KernelError> {
    #[inline]
    fn into_report(self) -> KernelResult<T> {
        self.map_err(Report::new)
    }
}
