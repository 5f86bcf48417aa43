//! Error types for labsite.
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;

macro_rules! impl_debug_for_error {
    ($($t:ty),*) => {
        $(
            impl Debug for $t {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    // Errors returned from main are printed with Debug, thiserror only implements Display.
                    write!(f, "{}", self)
                }
            }
        )*
    };
}

/// Fatal build failures. Anything not listed here is logged and skipped by the pipeline.
#[derive(Error)]
pub enum BuildError {
    #[error("Failed to prepare output directory: {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start bundler `{command}`")]
    BundlerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Bundler `{command}` failed with {status}")]
    BundlerFailed { command: String, status: ExitStatus },
    #[error("Bundler finished but did not produce the SPA shell at {path}")]
    MissingShell {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error)]
pub enum ContentError {
    #[error("Failed to read content file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid content directory pattern for {path}")]
    Pattern {
        path: PathBuf,
        #[source]
        source: glob::PatternError,
    },
}

#[derive(Error)]
pub enum DataError {
    #[error("Failed to read data file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Data file is not valid JSON: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Data file {path} must hold an array of records or an object of record arrays")]
    Shape { path: PathBuf },
}

#[derive(Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::de::Error,
    },
}

/// Cloneable so that every caller waiting on one request gets its outcome.
#[derive(Error, Clone)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Failed to fetch {kind} data from {url} (HTTP {status})")]
    Status {
        kind: String,
        url: String,
        status: u16,
    },
    #[error("Failed to decode {kind} data from {url}")]
    Decode {
        kind: String,
        url: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("Fetch task for {url} was aborted")]
    Aborted { url: String },
}

#[derive(Error, Clone, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Failed to load widget script {src}: {message}")]
    Load { src: String, message: String },
}

/// Anything that stops the `labsite` command.
#[derive(Error, Debug)]
pub enum LabsiteError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Formats an error with its source chain on one line.
pub fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl_debug_for_error!(
    BuildError,
    ContentError,
    DataError,
    ConfigError,
    FetchError,
    WidgetError
);
