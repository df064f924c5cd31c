/// # doc-sync CLI
///
/// Command parsing and wiring of the real adapters. All pipeline logic lives
/// in `doc-sync-core`; this module only loads inputs, builds collaborators
/// and prints results.
///
/// - `process`: run a push payload through fetch, compose and publish.
/// - `analyze`: offline change summary for a saved commit-detail response.
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_sync_core::audit::AuditLog;
use doc_sync_core::compose::ComposerChain;
use doc_sync_core::detect::{analyze, LexicalAnalyzer};
use doc_sync_core::diff::{ingest, RawFileChange};
use doc_sync_core::github::GitHubClient;
use doc_sync_core::notify::TeamsNotifier;
use doc_sync_core::pipeline::{CommitResult, Pipeline, PushPayload};
use doc_sync_core::publish::{PagesPublisher, WikiPublisher};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI for doc-sync: keep generated documentation in step with pushed commits.
#[derive(Parser)]
#[clap(
    name = "doc-sync",
    version,
    about = "Generate documentation for pushed commits and publish it to a wiki and a versioned site"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every commit of a push event payload
    Process {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the push event JSON
        #[clap(long)]
        payload: PathBuf,
    },
    /// Print the change summary of a commit-detail JSON (or a bare files array)
    Analyze {
        #[clap(long)]
        files: PathBuf,
    },
}

/// Either a full commit-detail response or just its `files` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum FilesInput {
    Bare(Vec<RawFileChange>),
    Detail { files: Vec<RawFileChange> },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {what} JSON {path:?}"))
}

/// Async CLI entrypoint for `main` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Process { config, payload } => {
            let config = load_config(config)?;
            let payload: PushPayload = read_json(&payload, "payload")?;
            tracing::info!(command = "process", commits = payload.commits.len(), "Starting push processing");

            let repo_full_name = config.repo_full_name();
            if let Some(repository) = &payload.repository {
                if repository.full_name != repo_full_name {
                    tracing::warn!(
                        payload_repo = %repository.full_name,
                        configured_repo = %repo_full_name,
                        "Payload repository differs from configured repository"
                    );
                }
            }

            let source = GitHubClient::new(&config.github);
            let analyzer = LexicalAnalyzer::new();
            let composer = ComposerChain::from_config(&config.composer);
            let wiki = WikiPublisher::new(config.wiki_remote(), &config.publish);
            let site = PagesPublisher::new(config.pages_remote(), &config.publish);
            let audit = AuditLog::from_config(&config.audit);
            let notifier = TeamsNotifier::new(config.notify.teams_webhook.clone());

            let pipeline = Pipeline {
                repo_full_name,
                source: &source,
                analyzer: &analyzer,
                composer: &composer,
                wiki: &wiki,
                site: &site,
                audit: &audit,
                alerter: Some(&notifier),
            };
            let report = pipeline.process_push(&payload.commits).await;

            for outcome in &report.outcomes {
                match &outcome.result {
                    CommitResult::Published { title, .. } => println!("ok     {} {title}", outcome.sha),
                    CommitResult::Failed { stage, message, .. } => {
                        println!("failed {} [{stage}] {message}", outcome.sha)
                    }
                }
            }
            println!(
                "batch {}: {} succeeded, {} failed",
                report.batch_id,
                report.succeeded(),
                report.failed()
            );
            tracing::info!(command = "process", batch_id = %report.batch_id, "Push processing complete");
            Ok(())
        }
        Commands::Analyze { files } => {
            let raw = match read_json::<FilesInput>(&files, "files")? {
                FilesInput::Bare(files) | FilesInput::Detail { files } => files,
            };
            let diffs = ingest(&raw);
            let summary = analyze(&diffs);
            tracing::info!(command = "analyze", files = raw.len(), with_patch = diffs.len(), "Analysis complete");
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
