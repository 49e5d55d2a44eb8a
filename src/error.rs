//! Error types for the core orchestrator.
//!
//! Each variant corresponds to one of the error kinds enumerated in the
//! design's error-handling section. Errors are never raised across the
//! event loop (see `scheduler`); they are converted to state transitions
//! on the owning `Port` and only surface here at the library's edges —
//! attribute loading, configuration, and the CLI's final report.

use crate::core::Origin;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("port `{0}` is not known to the cache")]
    UnknownPort(Origin),

    #[error("configuration of `{0}` failed")]
    ConfigFailure(Origin),

    #[error("fetch of `{0}` failed")]
    FetchFailure(Origin),

    #[error("build of `{0}` failed")]
    BuildFailure(Origin),

    #[error("install of `{0}` failed")]
    InstallFailure(Origin),

    #[error("dependency cycle detected involving `{0}`")]
    CycleDetected(Origin),

    #[error("failed to spawn external process for `{0}`")]
    ExternalProcess(Origin, #[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to parse configuration")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
