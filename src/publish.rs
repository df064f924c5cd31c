//! Git-backed publication of rendered documents.
//!
//! Two destinations share one protocol: clone into a fresh ephemeral
//! directory, write, commit with the configured identity, push, and always
//! delete the checkout afterwards. Nothing is kept locally between calls, so a
//! failed publish is retried by starting over from the clone.
//!
//! - [`WikiPublisher`] overwrites a single markdown page (`AutoDocs.md`).
//! - [`PagesPublisher`] keeps a versioned static site on a publishing branch:
//!
//! ```text
//! docs/<sha7>/index.html   one directory per published commit
//! docs/latest/index.html   always the most recent publish
//! docs/history.json        append-only ledger of PublishRecord
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::compose::RenderedDoc;
use crate::config::{CommitIdentity, PublishConfig};
use crate::contract::Publisher;
use crate::error::{PublishCause, PublishError};
use crate::git::{self, EphemeralCheckout};

pub const WIKI_PAGE: &str = "AutoDocs.md";
pub const DOCS_DIR: &str = "docs";
pub const LATEST_DIR: &str = "latest";
pub const HISTORY_FILE: &str = "history.json";

/// One entry of `docs/history.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    #[serde(rename = "sha")]
    pub sha_short: String,
    /// ISO-8601 UTC with milliseconds.
    pub timestamp: String,
    /// Path of the versioned page, relative to the site root.
    #[serde(rename = "file")]
    pub relative_path: String,
}

/// What a successful publish did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub destination: &'static str,
    /// False when the destination already held identical content.
    pub committed: bool,
    /// Ledger entry appended by the versioned-site destination.
    pub record: Option<PublishRecord>,
}

/// Run `work` inside a fresh checkout, removing the checkout whatever happens.
async fn with_checkout<F, Fut>(
    destination: &'static str,
    tmp_base: &Path,
    prefix: &str,
    work: F,
) -> Result<PublishOutcome, PublishError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: std::future::Future<Output = Result<PublishOutcome, PublishCause>>,
{
    let checkout = EphemeralCheckout::create(tmp_base, prefix)
        .await
        .map_err(|e| PublishError::new(destination, e))?;
    let result = work(checkout.path().to_path_buf()).await;
    checkout.close();
    result.map_err(|cause| PublishError::new(destination, cause))
}

/// Single-page wiki destination. No versioning: the page is overwritten.
pub struct WikiPublisher {
    remote: String,
    tmp_base: PathBuf,
    identity: CommitIdentity,
}

impl WikiPublisher {
    pub const DESTINATION: &'static str = "wiki";

    pub fn new(remote: impl Into<String>, config: &PublishConfig) -> Self {
        Self {
            remote: remote.into(),
            tmp_base: config.tmp_base.clone(),
            identity: config.identity.clone(),
        }
    }

    async fn publish_in(&self, dir: PathBuf, doc: &RenderedDoc) -> Result<PublishOutcome, PublishCause> {
        info!(remote = %git::redact(&self.remote), "Cloning wiki repository");
        git::clone(&dir, &self.remote, None).await?;

        tokio::fs::write(dir.join(WIKI_PAGE), &doc.body).await?;
        git::configure_identity(&dir, &self.identity).await?;

        if !git::stage_all(&dir).await? {
            info!(sha = %doc.meta.sha, "Wiki page already up to date, nothing to push");
            return Ok(PublishOutcome {
                destination: Self::DESTINATION,
                committed: false,
                record: None,
            });
        }
        git::commit(&dir, &format!("Auto update docs for {}", doc.short_sha())).await?;

        // Wikis created before the main rename still live on master.
        let branch = git::current_branch(&dir).await?;
        if branch == "main" {
            git::push(&dir, "main").await?;
        } else {
            warn!(local_branch = %branch, "Wiki has no main branch, pushing to master");
            git::push(&dir, "master").await?;
        }
        info!(sha = %doc.meta.sha, page = WIKI_PAGE, "Wiki updated");
        Ok(PublishOutcome {
            destination: Self::DESTINATION,
            committed: true,
            record: None,
        })
    }
}

#[async_trait]
impl Publisher for WikiPublisher {
    fn destination(&self) -> &'static str {
        Self::DESTINATION
    }

    async fn publish(&self, doc: &RenderedDoc) -> Result<PublishOutcome, PublishError> {
        with_checkout(Self::DESTINATION, &self.tmp_base, "tmp-wiki", |dir| {
            self.publish_in(dir, doc)
        })
        .await
    }
}

/// Versioned static-site destination on a dedicated branch.
pub struct PagesPublisher {
    remote: String,
    branch: String,
    tmp_base: PathBuf,
    identity: CommitIdentity,
}

impl PagesPublisher {
    pub const DESTINATION: &'static str = "github-pages";

    pub fn new(remote: impl Into<String>, config: &PublishConfig) -> Self {
        Self {
            remote: remote.into(),
            branch: config.pages_branch.clone(),
            tmp_base: config.tmp_base.clone(),
            identity: config.identity.clone(),
        }
    }

    /// Clone the publishing branch, or create it from the default branch when absent.
    async fn checkout_branch(&self, dir: &Path) -> Result<(), PublishCause> {
        info!(remote = %git::redact(&self.remote), branch = %self.branch, "Cloning site repository");
        if git::clone(dir, &self.remote, Some(&self.branch)).await.is_ok() {
            return Ok(());
        }
        info!(branch = %self.branch, "Publishing branch not found, creating it");
        git::clear_dir(dir).await?;
        git::clone(dir, &self.remote, None).await?;
        git::create_branch(dir, &self.branch).await
    }

    async fn publish_in(&self, dir: PathBuf, doc: &RenderedDoc) -> Result<PublishOutcome, PublishCause> {
        self.checkout_branch(&dir).await?;

        let sha7 = doc.short_sha();
        let page = render_html(&doc.body);
        let docs = dir.join(DOCS_DIR);
        for target in [docs.join(sha7), docs.join(LATEST_DIR)] {
            tokio::fs::create_dir_all(&target).await?;
            tokio::fs::write(target.join("index.html"), &page).await?;
        }

        let history_path = docs.join(HISTORY_FILE);
        let mut history = load_history(&history_path).await;
        let record = PublishRecord {
            sha_short: sha7.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            relative_path: format!("{DOCS_DIR}/{sha7}/index.html"),
        };
        history.push(serde_json::to_value(&record)?);
        tokio::fs::write(&history_path, serde_json::to_string_pretty(&history)?).await?;

        git::configure_identity(&dir, &self.identity).await?;
        git::stage_all(&dir).await?;
        git::commit(&dir, &format!("Publish docs for commit {sha7}")).await?;
        git::push(&dir, &self.branch).await?;

        info!(sha = %doc.meta.sha, path = %record.relative_path, "Site updated");
        Ok(PublishOutcome {
            destination: Self::DESTINATION,
            committed: true,
            record: Some(record),
        })
    }
}

#[async_trait]
impl Publisher for PagesPublisher {
    fn destination(&self) -> &'static str {
        Self::DESTINATION
    }

    async fn publish(&self, doc: &RenderedDoc) -> Result<PublishOutcome, PublishError> {
        with_checkout(Self::DESTINATION, &self.tmp_base, "tmp-pages", |dir| {
            self.publish_in(dir, doc)
        })
        .await
    }
}

/// Existing ledger entries, kept as raw JSON so unknown shapes survive the rewrite.
///
/// A missing, unreadable or non-array ledger counts as empty.
async fn load_history(path: &Path) -> Vec<Value> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No history ledger found, starting a new one");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = ?e, path = %path.display(), "Unreadable history ledger, starting a new one");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Corrupt history ledger, starting a new one");
            Vec::new()
        }
    }
}

/// Typed view of a ledger file, for inspection.
pub fn read_history(path: &Path) -> std::io::Result<Vec<PublishRecord>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::other)
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8" />
<title>Documentation</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<style>
    body {
        font-family: Arial, sans-serif;
        margin: 40px;
        line-height: 1.6;
        max-width: 900px;
    }
    pre {
        background: #f4f4f4;
        padding: 12px;
        border-radius: 6px;
        overflow-x: auto;
    }
    code {
        color: #c7254e;
        background: #f9f2f4;
        padding: 3px 4px;
        border-radius: 4px;
    }
    h1, h2, h3, h4 {
        color: #333;
    }
</style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Markdown to a self-contained HTML page.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut page = String::from(PAGE_HEAD);
    html::push_html(&mut page, parser);
    page.push_str(PAGE_TAIL);
    page
}
