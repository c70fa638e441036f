//! Error types for every seam of the pipeline.
//!
//! Each external collaborator (HTTP, release source, ledger, channel) has its own
//! error enum so the pipeline can decide per failure whether a version is deferred,
//! a variant is skipped, or the whole run halts.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the upstream site over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn io(context: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of the release source (listing or resolving).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The listing page could not be fetched or its structure was not recognised.
    #[error("listing for variant {variant} unavailable: {reason}")]
    Unavailable { variant: String, reason: String },
    /// A release page or its confirm-download page could not be turned into a release.
    #[error("could not resolve {variant} {version}: {reason}")]
    ResolutionFailed {
        variant: String,
        version: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("ledger record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failure publishing to, or editing a message on, the output channel.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("channel request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("channel rejected the request: {0}")]
    Rejected(String),
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("could not read known versions: {0}")]
    Ledger(#[from] LedgerError),
}

/// Failures that halt a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("ledger unreachable while diffing variant {variant}: {source}")]
    LedgerUnavailable {
        variant: String,
        #[source]
        source: LedgerError,
    },
}
