/// `load_config` module: reads the static YAML config and injects secrets and
/// deployment settings from the environment.
///
/// The YAML file carries no secrets. Tokens, API keys and webhook URLs come
/// from environment variables (optionally via a `.env` file loaded in `main`):
///
/// | Variable            | Field                         |
/// |---------------------|-------------------------------|
/// | `GITHUB_TOKEN`      | `github.token`                |
/// | `GITHUB_OWNER`      | `github.owner`                |
/// | `GITHUB_REPO`       | `github.repo`                 |
/// | `OPENAI_API_KEY`    | `composer.openai.api_key`     |
/// | `FLOWISE_URL`       | `composer.flowise.url`        |
/// | `TEAMS_WEBHOOK_URL` | `notify.teams_webhook`        |
/// | `TMP_BASE`          | `publish.tmp_base`            |
///
/// A variable that is set and non-empty overrides the file.
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{bail, Context, Result};
use doc_sync_core::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Overlay environment variables onto a parsed config.
pub fn apply_env(config: &mut Config) {
    if let Some(token) = env_value("GITHUB_TOKEN") {
        config.github.token = Some(token);
    }
    if let Some(owner) = env_value("GITHUB_OWNER") {
        config.github.owner = owner;
    }
    if let Some(repo) = env_value("GITHUB_REPO") {
        config.github.repo = repo;
    }
    if let Some(key) = env_value("OPENAI_API_KEY") {
        config.composer.openai.api_key = Some(key);
    }
    if let Some(url) = env_value("FLOWISE_URL") {
        config.composer.flowise.url = Some(url);
    }
    if let Some(url) = env_value("TEAMS_WEBHOOK_URL") {
        config.notify.teams_webhook = Some(url);
    }
    if let Some(base) = env_value("TMP_BASE") {
        config.publish.tmp_base = PathBuf::from(base);
    }
}

/// Load the YAML config at `path`, inject environment values and validate.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    // An empty file is a valid, all-defaults config.
    let mut config: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&content)
            .inspect_err(|e| error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML"))
            .context("Failed to parse config YAML")?
    };
    apply_env(&mut config);

    if config.github.owner.trim().is_empty() {
        bail!("github.owner is not set (config file or GITHUB_OWNER)");
    }
    if config.github.repo.trim().is_empty() {
        bail!("github.repo is not set (config file or GITHUB_REPO)");
    }

    config.trace_loaded();
    Ok(config)
}
