//! Error taxonomy for the commit pipeline.
//!
//! Every error here is fatal for *one commit* at most. The orchestrator in
//! [`crate::pipeline`] catches all of them at the commit boundary and turns
//! them into audit entries, so nothing in this module ever reaches the caller
//! of [`crate::pipeline::Pipeline::process_push`].
//!
//! Two outcomes are deliberately absent:
//! - a file without patch text is skipped by the ingestor, not reported;
//! - an unreadable history ledger is treated as empty by the site publisher.

use thiserror::Error;

/// Failure fetching a commit's file list from the source host.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to source host failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source host answered {status} for commit {sha}: {body}")]
    Status {
        sha: String,
        status: u16,
        body: String,
    },
}

/// Failure turning a change summary into a rendered document.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// No backend in the chain is configured.
    #[error("no composer backend configured (set an OpenAI API key or a Flowise URL)")]
    Unavailable,

    /// The active backend answered with an error or a payload without content.
    #[error("composer backend '{backend}' failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("composer backend '{backend}' unreachable: {source}")]
    Http {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to serialize composer prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

/// Failure persisting a document into one destination.
#[derive(Error, Debug)]
#[error("publishing to {destination} failed: {cause}")]
pub struct PublishError {
    pub destination: String,
    #[source]
    pub cause: PublishCause,
}

impl PublishError {
    pub fn new(destination: impl Into<String>, cause: impl Into<PublishCause>) -> Self {
        Self {
            destination: destination.into(),
            cause: cause.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishCause {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not start git for step '{step}': {source}")]
    GitSpawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git step '{step}' exited with {status}: {stderr}")]
    GitCommand {
        step: &'static str,
        status: String,
        stderr: String,
    },

    #[error("failed to serialize history ledger: {0}")]
    Ledger(#[from] serde_json::Error),
}

/// Pipeline stage a commit failed in, used for audit lines and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Compose,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Fetch => "fetch",
            Stage::Compose => "compose",
            Stage::Publish => "publish",
        })
    }
}

/// Any per-commit failure, tagged with the stage that produced it.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Fetch(_) => Stage::Fetch,
            StageError::Compose(_) => Stage::Compose,
            StageError::Publish(_) => Stage::Publish,
        }
    }
}
