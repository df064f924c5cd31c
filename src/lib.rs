#![doc = "doc-sync-core: turns pushed commits into published documentation."]

//! The crate holds the whole commit pipeline and its adapters:
//!
//! - [`diff`]: source-host file records → added/removed lines
//! - [`detect`]: lexical change extraction into a [`detect::ChangeSummary`]
//! - [`compose`]: prompt building and the composer backend chain
//! - [`publish`] and [`git`]: wiki and versioned-site publication through ephemeral checkouts
//! - [`pipeline`]: per-commit orchestration with failure isolation
//! - [`github`], [`notify`], [`audit`]: source host, alerting and audit ledger adapters
//! - [`contract`]: the traits every step is reached through
//!
//! Transport (webhook delivery, signature checks) lives outside this crate;
//! callers hand a parsed [`pipeline::PushPayload`] to [`pipeline::Pipeline::process_push`].

pub mod audit;
pub mod compose;
pub mod config;
pub mod contract;
pub mod detect;
pub mod diff;
pub mod error;
pub mod git;
pub mod github;
pub mod notify;
pub mod pipeline;
pub mod publish;

/// First seven characters of a commit SHA (the whole string if shorter).
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
