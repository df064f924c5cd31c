//! High-level pipeline: orchestrates fetch → ingest → analyze → compose → publish per commit.
//!
//! This module sequences every pushed commit through the full documentation pipeline:
//!   - Fetches the commit's file list from the source host ([`CommitSource`])
//!   - Reduces it to added/removed lines ([`crate::diff::ingest`]) and summarises them ([`ChangeAnalyzer`])
//!   - Composes a markdown document ([`DocComposer`])
//!   - Publishes it to the wiki, then to the versioned site ([`Publisher`])
//!   - Writes exactly one audit line per commit ([`AuditSink`]) and raises an optional alert ([`Alerter`])
//!
//! # Failure isolation
//! Commits run strictly one after another in payload order. Any error for one
//! commit is logged, audited and reported, and the next commit starts as if
//! nothing happened. Nothing is retried. [`Pipeline::process_push`] itself
//! cannot fail.
//!
//! The two destinations are independent: both are attempted, and a commit may
//! end up published on one and not the other. That counts as a failed commit
//! and is not reconciled.

use serde::Deserialize;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::compose::DocMeta;
use crate::contract::{Alerter, AuditSink, CommitSource, DocComposer, Publisher};
use crate::detect::ChangeAnalyzer;
use crate::diff;
use crate::error::{Stage, StageError};
use crate::publish::PublishOutcome;
use crate::short_sha;

/// A commit as referenced by a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitRef {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl CommitRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: None,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

/// Push notification body, already authenticated by the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub commits: Vec<CommitRef>,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

#[derive(Debug, Clone)]
pub struct PushReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<CommitOutcome>,
}

impl PushReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub sha: String,
    pub result: CommitResult,
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, CommitResult::Published { .. })
    }
}

#[derive(Debug, Clone)]
pub enum CommitResult {
    Published {
        title: String,
        outcomes: Vec<PublishOutcome>,
    },
    Failed {
        stage: Stage,
        message: String,
        /// Destinations that did succeed before or despite the failure.
        published: Vec<PublishOutcome>,
    },
}

/// Per-commit failure with whatever was published anyway.
struct CommitFailure {
    stage: Stage,
    message: String,
    published: Vec<PublishOutcome>,
}

impl From<StageError> for CommitFailure {
    fn from(e: StageError) -> Self {
        CommitFailure {
            stage: e.stage(),
            message: e.to_string(),
            published: Vec::new(),
        }
    }
}

/// The collaborators one push is processed with.
pub struct Pipeline<'a> {
    pub repo_full_name: String,
    pub source: &'a dyn CommitSource,
    pub analyzer: &'a dyn ChangeAnalyzer,
    pub composer: &'a dyn DocComposer,
    pub wiki: &'a dyn Publisher,
    pub site: &'a dyn Publisher,
    pub audit: &'a dyn AuditSink,
    pub alerter: Option<&'a dyn Alerter>,
}

impl Pipeline<'_> {
    /// Process every commit of a push in order. Per-commit failures end up in
    /// the audit ledger and the report, never in the return type.
    pub async fn process_push(&self, commits: &[CommitRef]) -> PushReport {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, commits = commits.len(), repo = %self.repo_full_name, "[PUSH] Processing push event");

        let mut outcomes = Vec::with_capacity(commits.len());
        for commit in commits {
            let span = tracing::info_span!("commit", sha = %commit.id, %batch_id);
            let outcome = self.process_one(commit).instrument(span).await;
            outcomes.push(outcome);
        }

        let report = PushReport { batch_id, outcomes };
        info!(
            %batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "[PUSH] Finished push event"
        );
        report
    }

    async fn process_one(&self, commit: &CommitRef) -> CommitOutcome {
        let sha = commit.id.clone();
        info!(sha = %sha, message = commit.message.as_deref().unwrap_or(""), "[PUSH] === Processing commit ===");

        let result = match self.run_commit(&sha).await {
            Ok((title, outcomes)) => {
                let targets = outcomes
                    .iter()
                    .map(|o| match &o.record {
                        Some(record) => format!("{} {}", o.destination, record.relative_path),
                        None => o.destination.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                self.record_audit(&format!("Commit {sha} processed -> {targets}"));
                self.raise_alert(
                    &format!("Docs published for {}", short_sha(&sha)),
                    &format!("{title} ({targets})"),
                )
                .await;
                info!(sha = %sha, "[PUSH] === Finished commit ===");
                CommitResult::Published { title, outcomes }
            }
            Err(failure) => {
                error!(sha = %sha, stage = %failure.stage, error = %failure.message, "[PUSH][ERROR] Commit failed");
                self.record_audit(&format!(
                    "ERROR processing commit {sha}: {}: {}",
                    failure.stage, failure.message
                ));
                self.raise_alert(
                    &format!("Doc sync failed for {}", short_sha(&sha)),
                    &format!("{} stage failed: {}", failure.stage, failure.message),
                )
                .await;
                CommitResult::Failed {
                    stage: failure.stage,
                    message: failure.message,
                    published: failure.published,
                }
            }
        };
        CommitOutcome { sha, result }
    }

    async fn run_commit(&self, sha: &str) -> Result<(String, Vec<PublishOutcome>), CommitFailure> {
        // --- Step 1: Fetch ---
        let raw_files = self
            .source
            .fetch_files(sha)
            .await
            .map_err(StageError::from)?;

        // --- Step 2: Ingest and analyze ---
        let diffs = diff::ingest(&raw_files);
        let summary = self.analyzer.analyze(&diffs);
        info!(
            files = raw_files.len(),
            with_patch = diffs.len(),
            modules = summary.modules_affected.len(),
            functions_added = summary.functions_added.len(),
            apis_changed = summary.apis_changed.len(),
            "[PUSH] Change summary ready"
        );

        // --- Step 3: Compose ---
        let meta = DocMeta {
            sha: sha.to_string(),
            repo_full_name: self.repo_full_name.clone(),
        };
        let doc = self
            .composer
            .compose(&summary, &diffs, &meta)
            .await
            .map_err(StageError::from)?;
        drop(summary);

        // --- Step 4: Publish, wiki first, then site ---
        let mut published = Vec::new();
        let mut errors = Vec::new();
        for publisher in [self.wiki, self.site] {
            match publisher.publish(&doc).await {
                Ok(outcome) => {
                    info!(destination = publisher.destination(), committed = outcome.committed, "[PUSH] Publish succeeded");
                    published.push(outcome);
                }
                Err(e) => {
                    error!(destination = publisher.destination(), error = %e, "[PUSH][ERROR] Publish failed");
                    errors.push(StageError::from(e).to_string());
                }
            }
        }
        if !errors.is_empty() {
            return Err(CommitFailure {
                stage: Stage::Publish,
                message: errors.join("; "),
                published,
            });
        }
        Ok((doc.title, published))
    }

    /// Audit failures are reported on stderr and swallowed.
    fn record_audit(&self, message: &str) {
        if let Err(e) = self.audit.append(message) {
            error!(error = ?e, "Failed to write audit log entry");
            eprintln!("[ERROR] Failed to write history log: {e} (entry: {message})");
        }
    }

    async fn raise_alert(&self, title: &str, message: &str) {
        match self.alerter {
            Some(alerter) => alerter.alert(title, message).await,
            None => debug!(title, "No alerter configured, skipping alert"),
        }
    }
}
