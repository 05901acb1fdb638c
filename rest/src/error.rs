//! Error types for constructing a REST probe.
//!
//! Query failures are not errors at this level: they are reported to the
//! guard as [`ProbeError`](schema_guard_core::ProbeError) values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    /// The backend URL cannot serve as a base for table paths.
    #[error("invalid backend url '{0}'")]
    InvalidUrl(String),

    /// URL parsing failure.
    #[error("url parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP client construction failure.
    #[error("http client error: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Convenience alias for results with [`RestError`].
pub type Result<T> = std::result::Result<T, RestError>;
