//! Document composition: change summary in, markdown document out.
//!
//! Text generation is delegated to an ordered chain of [`ComposerBackend`]s.
//! The chain is a fallback over *configuration*, not over failures: the first
//! backend that is configured is the only one asked, and whatever it returns
//! (content or error) is final.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::{ComposerConfig, FlowiseConfig, OpenAiConfig};
use crate::contract::{ComposerBackend, DocComposer};
use crate::detect::ChangeSummary;
use crate::diff::FileDiff;
use crate::error::ComposeError;
use crate::short_sha;

const PROMPT_PREAMBLE: &str = "You are an expert code documentation generator.
Generate documentation for the following code changes:";

const PROMPT_REQUEST: &str = "Return:
1. Markdown formatted documentation
2. Changelog summary
3. Function/class descriptions
4. Clear explanations of added/removed logic";

const OPENAI_MAX_TOKENS: u32 = 2000;

/// Response fields a flow endpoint may carry its text in, in priority order.
const FLOWISE_CONTENT_FIELDS: [&str; 3] = ["output", "result", "text"];

/// Identity of the commit a document is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMeta {
    pub sha: String,
    pub repo_full_name: String,
}

/// A finished document. Never modified after composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDoc {
    pub title: String,
    /// Markdown.
    pub body: String,
    pub meta: DocMeta,
    pub timestamp: DateTime<Utc>,
}

impl RenderedDoc {
    pub fn short_sha(&self) -> &str {
        short_sha(&self.meta.sha)
    }
}

/// Outcome of asking one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Backend not configured; the chain moves on.
    Unavailable,
    /// Raw generated text.
    Content(String),
}

#[derive(Serialize)]
struct PromptContext<'a> {
    diff: &'a [FileDiff],
    semantic: &'a ChangeSummary,
}

/// Build the generation prompt embedding the diffs and their summary as JSON.
pub fn build_prompt(summary: &ChangeSummary, diffs: &[FileDiff]) -> Result<String, ComposeError> {
    let context = serde_json::to_string_pretty(&PromptContext {
        diff: diffs,
        semantic: summary,
    })?;
    Ok(format!("{PROMPT_PREAMBLE}\n\n{context}\n\n{PROMPT_REQUEST}\n"))
}

/// Wrap generated text into the published document layout.
pub fn format_document(content: &str, meta: &DocMeta, timestamp: DateTime<Utc>) -> RenderedDoc {
    let title = format!(
        "Documentation for {} @ {}",
        meta.repo_full_name,
        short_sha(&meta.sha)
    );
    let body = format!(
        "# {title}\n\n\
         - **Commit:** `{sha}`\n\
         - **Repository:** {repo}\n\
         - **Generated:** {generated}\n\n\
         {content}\n",
        sha = meta.sha,
        repo = meta.repo_full_name,
        generated = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        content = content.trim(),
    );
    RenderedDoc {
        title,
        body,
        meta: meta.clone(),
        timestamp,
    }
}

/// Ordered backend chain; see the module docs for the selection rule.
pub struct ComposerChain {
    backends: Vec<Box<dyn ComposerBackend>>,
}

impl ComposerChain {
    pub fn new(backends: Vec<Box<dyn ComposerBackend>>) -> Self {
        Self { backends }
    }

    /// OpenAI first, Flowise second.
    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new(vec![
            Box::new(OpenAiBackend::new(&config.openai)),
            Box::new(FlowiseBackend::new(&config.flowise)),
        ])
    }

    /// Ask backends in order until one is configured.
    pub async fn generate(&self, prompt: &str) -> Result<String, ComposeError> {
        for backend in &self.backends {
            match backend.generate(prompt).await {
                Ok(Attempt::Unavailable) => {
                    debug!(backend = backend.name(), "Composer backend not configured, trying next");
                }
                Ok(Attempt::Content(content)) => {
                    info!(backend = backend.name(), chars = content.len(), "Composer backend produced content");
                    return Ok(content);
                }
                Err(e) => {
                    error!(backend = backend.name(), error = %e, "Composer backend failed");
                    return Err(e);
                }
            }
        }
        Err(ComposeError::Unavailable)
    }
}

#[async_trait]
impl DocComposer for ComposerChain {
    async fn compose(
        &self,
        summary: &ChangeSummary,
        diffs: &[FileDiff],
        meta: &DocMeta,
    ) -> Result<RenderedDoc, ComposeError> {
        let prompt = build_prompt(summary, diffs)?;
        let content = self.generate(&prompt).await?;
        Ok(format_document(&content, meta, Utc::now()))
    }
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

/// Direct chat-completions backend (OpenAI or any compatible endpoint).
pub struct OpenAiBackend {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ComposerBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<Attempt, ComposeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Attempt::Unavailable);
        };
        let url = format!("{}/v1/chat/completions", self.base_url);
        info!(url = %url, model = %self.model, "Generating documentation via OpenAI");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: OPENAI_MAX_TOKENS,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ComposeError::Http {
                backend: self.name(),
                source,
            })?;

        let body = read_json(self.name(), response).await?;
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ComposeError::Backend {
                backend: self.name(),
                message: "response has no choices[0].message.content".to_string(),
            })?;
        Ok(Attempt::Content(content.to_string()))
    }
}

/// Flow-execution backend: POST `{"input": prompt}` to a prediction URL.
pub struct FlowiseBackend {
    client: Client,
    url: Option<String>,
}

impl FlowiseBackend {
    pub fn new(config: &FlowiseConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl ComposerBackend for FlowiseBackend {
    fn name(&self) -> &'static str {
        "flowise"
    }

    async fn generate(&self, prompt: &str) -> Result<Attempt, ComposeError> {
        let Some(url) = self.url.as_deref() else {
            return Ok(Attempt::Unavailable);
        };
        info!(url = %url, "Generating documentation via Flowise");

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "input": prompt }))
            .send()
            .await
            .map_err(|source| ComposeError::Http {
                backend: self.name(),
                source,
            })?;

        let body = read_json(self.name(), response).await?;
        let content = FLOWISE_CONTENT_FIELDS
            .iter()
            .filter_map(|field| body.get(field).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .ok_or_else(|| ComposeError::Backend {
                backend: self.name(),
                message: format!(
                    "response has none of the fields {}",
                    FLOWISE_CONTENT_FIELDS.join(", ")
                ),
            })?;
        Ok(Attempt::Content(content.to_string()))
    }
}

/// Decode a JSON body, mapping non-2xx statuses and malformed bodies to backend errors.
async fn read_json(backend: &'static str, response: reqwest::Response) -> Result<Value, ComposeError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| ComposeError::Http { backend, source })?;
    if !status.is_success() {
        return Err(ComposeError::Backend {
            backend,
            message: format!("HTTP {status}: {text}"),
        });
    }
    serde_json::from_str(&text).map_err(|e| ComposeError::Backend {
        backend,
        message: format!("malformed JSON response: {e}"),
    })
}
