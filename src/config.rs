use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use std::env;
use std::time::Duration;

/// Runtime configuration for the GitHub client, the retry controller and the server.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub retry_jitter: bool,
    pub call_timeout_secs: u64,
    pub git_bin: String,
    pub enable_ping: bool,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional; requests are unauthenticated without it]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-ops-mcp/<version>)
    /// - GITHUB_MCP_MAX_ATTEMPTS (default: 3)
    /// - GITHUB_MCP_BACKOFF_BASE_MS / GITHUB_MCP_BACKOFF_MAX_MS (default: 1000 / 10000)
    /// - GITHUB_MCP_RETRY_JITTER (default: true)
    /// - GITHUB_MCP_CALL_TIMEOUT_SECS (default: 120)
    /// - GITHUB_MCP_GIT_BIN (default: git)
    /// - GITHUB_MCP_ENABLE_PING (default: false)
    pub fn from_env() -> Result<Self, String> {
        let token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());

        let api_url = env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_url).map_err(|e| format!("Invalid GITHUB_API_URL `{api_url}`: {e}"))?;

        let api_version =
            env::var("GITHUB_API_VERSION").unwrap_or_else(|_| "2022-11-28".to_string());
        let default_ua = format!("github-ops-mcp/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = env::var("GITHUB_USER_AGENT").unwrap_or(default_ua);

        let backoff_base_ms = parse_env("GITHUB_MCP_BACKOFF_BASE_MS", 1_000);
        let backoff_max_ms = parse_env("GITHUB_MCP_BACKOFF_MAX_MS", 10_000).max(backoff_base_ms);

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs: parse_env("GITHUB_HTTP_TIMEOUT_SECS", 30),
            max_attempts: parse_env("GITHUB_MCP_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            backoff_base_ms,
            backoff_max_ms,
            retry_jitter: env::var("GITHUB_MCP_RETRY_JITTER")
                .map(|v| is_truthy(&v))
                .unwrap_or(true),
            call_timeout_secs: parse_env("GITHUB_MCP_CALL_TIMEOUT_SECS", 120),
            git_bin: env::var("GITHUB_MCP_GIT_BIN").unwrap_or_else(|_| "git".to_string()),
            enable_ping: env::var("GITHUB_MCP_ENABLE_PING")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            jitter: self.retry_jitter,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
