//! Source-host client: commit details from the GitHub REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::GitHubConfig;
use crate::contract::CommitSource;
use crate::diff::RawFileChange;
use crate::error::FetchError;

#[derive(Deserialize, Debug)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<RawFileChange>,
}

pub struct GitHubClient {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        }
    }
}

#[async_trait]
impl CommitSource for GitHubClient {
    async fn fetch_files(&self, sha: &str) -> Result<Vec<RawFileChange>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/commits/{sha}",
            self.api_base, self.owner, self.repo
        );
        info!(url = %url, "Fetching commit details");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "doc-sync");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, sha, "Source host returned error for commit");
            return Err(FetchError::Status {
                sha: sha.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let detail: CommitDetail = response.json().await?;
        info!(sha, files = detail.files.len(), "Fetched commit details");
        Ok(detail.files)
    }
}
