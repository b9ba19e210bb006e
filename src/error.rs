//! Error type shared by the worker, the media source and the enhancer.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a run or fail an enhancement.
#[derive(Debug, Error)]
pub enum Error {
    /// An external tool could not be found on PATH.
    #[error("{0} was not found; install it and make sure it is on PATH")]
    ToolNotFound(&'static str),

    /// Spawning an external tool failed.
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    /// An external tool printed something we could not make sense of.
    #[error("unexpected output from {tool}: {reason}")]
    Malformed { tool: &'static str, reason: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The media server answered with a non-success status.
    #[error("server returned {status} for {title}")]
    HttpStatus {
        status: reqwest::StatusCode,
        title: String,
    },

    /// A file the run expected to exist was missing.
    #[error("video file not found at {}", .0.display())]
    MissingFile(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User input was rejected before a run started.
    #[error("{0}")]
    Invalid(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
