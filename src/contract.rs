//! # contract: the pipeline's collaborator seams
//!
//! Every external effect of the pipeline sits behind one trait in this module:
//! fetching a commit's files, composing a document, publishing it, raising an
//! alert and writing the audit ledger. The orchestrator in
//! [`crate::pipeline`] only ever sees these traits, so each step can be
//! replaced by a real client, a local stand-in or a mock.
//!
//! ## Mocking & Testing
//! - Traits are annotated for `mockall`; the generated `Mock*` types are
//!   exported when the `test-export-mocks` feature is on (default), so
//!   integration tests and downstream crates can script them.
//!
//! ## Implementations in this crate
//! - [`CommitSource`]: [`crate::github::GitHubClient`]
//! - [`DocComposer`]: [`crate::compose::ComposerChain`]
//! - [`ComposerBackend`]: [`crate::compose::OpenAiBackend`], [`crate::compose::FlowiseBackend`]
//! - [`Publisher`]: [`crate::publish::WikiPublisher`], [`crate::publish::PagesPublisher`]
//! - [`Alerter`]: [`crate::notify::TeamsNotifier`]
//! - [`AuditSink`]: [`crate::audit::AuditLog`]

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::compose::{Attempt, DocMeta, RenderedDoc};
use crate::detect::ChangeSummary;
use crate::diff::{FileDiff, RawFileChange};
use crate::error::{ComposeError, FetchError, PublishError};
use crate::publish::PublishOutcome;

/// Source host access: the file list of one commit.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommitSource: Send + Sync {
    async fn fetch_files(&self, sha: &str) -> Result<Vec<RawFileChange>, FetchError>;
}

/// Turns a change summary into a rendered document.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocComposer: Send + Sync {
    async fn compose(
        &self,
        summary: &ChangeSummary,
        diffs: &[FileDiff],
        meta: &DocMeta,
    ) -> Result<RenderedDoc, ComposeError>;
}

/// One text-generation provider in the composer chain.
///
/// A backend that is not configured answers [`Attempt::Unavailable`] instead
/// of failing, which lets the chain move on to the next provider.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ComposerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<Attempt, ComposeError>;
}

/// A git-backed destination for rendered documents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short destination name used in logs, errors and audit lines.
    fn destination(&self) -> &'static str;

    async fn publish(&self, doc: &RenderedDoc) -> Result<PublishOutcome, PublishError>;
}

/// Fire-and-forget notification sink. Implementations swallow their own failures.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn alert(&self, title: &str, message: &str);
}

/// Append-only event ledger.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait AuditSink: Send + Sync {
    fn append(&self, message: &str) -> std::io::Result<()>;
}
