//! Local version-control collaborator used by `push_to_github`.
//!
//! The trait keeps the push state machine testable without a real
//! repository; [`GitCli`] drives the `git` binary.

use crate::error::GatewayError;
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

#[async_trait]
pub trait VersionControl: Send + Sync {
    /// True only when `path` is the root of a work tree.
    async fn is_repository(&self, path: &Path) -> Result<bool, GatewayError>;
    async fn init(&self, path: &Path) -> Result<(), GatewayError>;
    async fn stage_all(&self, path: &Path) -> Result<(), GatewayError>;
    /// Whether HEAD resolves to a commit.
    async fn has_commits(&self, path: &Path) -> Result<bool, GatewayError>;
    async fn commit(&self, path: &Path, message: &str) -> Result<(), GatewayError>;
    /// Force-rename the current branch (`branch -M`).
    async fn rename_branch(&self, path: &Path, branch: &str) -> Result<(), GatewayError>;
    async fn remotes(&self, path: &Path) -> Result<Vec<String>, GatewayError>;
    async fn remote_url(&self, path: &Path, name: &str) -> Result<Option<String>, GatewayError>;
    async fn add_remote(&self, path: &Path, name: &str, url: &str) -> Result<(), GatewayError>;
    async fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<(), GatewayError>;
}

/// Fragments of git's stderr that indicate a network hiccup rather than a
/// rejected push.
const TRANSIENT_MARKERS: &[&str] = &[
    "could not resolve host",
    "connection timed out",
    "operation timed out",
    "connection reset",
    "failed to connect",
    "the remote end hung up unexpectedly",
    "early eof",
];

pub fn classify_git_failure(step: &str, stderr: &str) -> GatewayError {
    let detail = stderr.trim();
    let lower = detail.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return GatewayError::TransientNetwork {
            message: format!("git {step}: {detail}"),
        };
    }
    GatewayError::vcs(format!("git {step} failed: {detail}"))
}

#[derive(Debug, Clone)]
pub struct GitCli {
    bin: PathBuf,
}

impl GitCli {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    async fn output(&self, dir: &Path, args: &[&str]) -> Result<Output, GatewayError> {
        debug!("git -C {} {}", dir.display(), args.join(" "));
        Command::new(&self.bin)
            .arg("-C")
            .arg(dir)
            .args(args)
            // Never block on a credential prompt; stdin belongs to the RPC channel.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GatewayError::vcs(format!("failed to run {}: {e}", self.bin.display())))
    }

    async fn run(&self, dir: &Path, step: &str, args: &[&str]) -> Result<String, GatewayError> {
        let out = self.output(dir, args).await?;
        if !out.status.success() {
            return Err(classify_git_failure(step, &String::from_utf8_lossy(&out.stderr)));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn is_repository(&self, path: &Path) -> Result<bool, GatewayError> {
        let out = self.output(path, &["rev-parse", "--show-toplevel"]).await?;
        if !out.status.success() {
            return Ok(false);
        }
        let top = PathBuf::from(String::from_utf8_lossy(&out.stdout).trim());
        let here = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| GatewayError::vcs(format!("cannot resolve {}: {e}", path.display())))?;
        let top = tokio::fs::canonicalize(&top).await.unwrap_or(top);
        Ok(top == here)
    }

    async fn init(&self, path: &Path) -> Result<(), GatewayError> {
        self.run(path, "init", &["init"]).await.map(drop)
    }

    async fn stage_all(&self, path: &Path) -> Result<(), GatewayError> {
        self.run(path, "add", &["add", "--all"]).await.map(drop)
    }

    async fn has_commits(&self, path: &Path) -> Result<bool, GatewayError> {
        let out = self
            .output(path, &["rev-parse", "--verify", "--quiet", "HEAD"])
            .await?;
        Ok(out.status.success())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<(), GatewayError> {
        self.run(path, "commit", &["commit", "--allow-empty", "-m", message])
            .await
            .map(drop)
    }

    async fn rename_branch(&self, path: &Path, branch: &str) -> Result<(), GatewayError> {
        self.run(path, "branch", &["branch", "-M", branch])
            .await
            .map(drop)
    }

    async fn remotes(&self, path: &Path) -> Result<Vec<String>, GatewayError> {
        let out = self.run(path, "remote", &["remote"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn remote_url(&self, path: &Path, name: &str) -> Result<Option<String>, GatewayError> {
        let out = self.output(path, &["remote", "get-url", name]).await?;
        if !out.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&out.stdout).trim().to_string()))
    }

    async fn add_remote(&self, path: &Path, name: &str, url: &str) -> Result<(), GatewayError> {
        self.run(path, "remote add", &["remote", "add", name, url])
            .await
            .map(drop)
    }

    async fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<(), GatewayError> {
        let refspec = format!("{branch}:{branch}");
        self.run(path, "push", &["push", remote, &refspec])
            .await
            .map(drop)
    }
}
