//! `push_to_github`: publish a local directory to a remote branch.
//!
//! Steps run in order and the first failure stops the rest. Nothing is
//! rolled back: a repository initialized or a commit created before a
//! failing step stays in place, and a warning names what was kept.

use super::Gateway;
use crate::error::GatewayError;
use crate::models::PushReport;
use crate::tools::PushInput;
use log::{info, warn};
use std::io::ErrorKind;
use std::path::Path;

const ORIGIN: &str = "origin";

pub(super) async fn push_to_github(
    gw: &Gateway,
    input: PushInput,
) -> Result<PushReport, GatewayError> {
    let path = Path::new(&input.repo_path);
    check_directory(path).await?;

    let mut report = PushReport {
        remote_url: input.remote_url.clone(),
        branch: input.branch.clone(),
        initialized: false,
        committed: false,
        remote_created: false,
        message: String::new(),
    };
    match run_steps(gw, path, &input, &mut report).await {
        Ok(()) => {
            report.message = format!(
                "Successfully pushed to {} on branch '{}'.",
                input.remote_url, input.branch
            );
            info!("{}", report.message);
            Ok(report)
        }
        Err(e) => {
            if report.initialized || report.committed {
                warn!(
                    "push of {} failed; local changes kept (initialized={}, committed={})",
                    input.repo_path, report.initialized, report.committed
                );
            }
            Err(e)
        }
    }
}

async fn check_directory(path: &Path) -> Result<(), GatewayError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(GatewayError::validation(
            "repo_path",
            format!("`{}` is not a directory", path.display()),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(GatewayError::not_found(format!(
            "local directory `{}` does not exist",
            path.display()
        ))),
        Err(e) => Err(GatewayError::vcs(format!(
            "cannot access `{}`: {e}",
            path.display()
        ))),
    }
}

async fn run_steps(
    gw: &Gateway,
    path: &Path,
    input: &PushInput,
    report: &mut PushReport,
) -> Result<(), GatewayError> {
    let vcs = gw.vcs();

    if !vcs.is_repository(path).await? {
        vcs.init(path).await?;
        report.initialized = true;
        info!("initialized repository in {}", path.display());
    }

    vcs.stage_all(path).await?;

    // Only the first commit is created here; later changes are never amended or re-committed.
    if !vcs.has_commits(path).await? {
        vcs.commit(path, &input.commit_msg).await?;
        report.committed = true;
    }

    vcs.rename_branch(path, &input.branch).await?;

    if vcs.remotes(path).await?.iter().any(|r| r == ORIGIN) {
        if let Some(url) = vcs.remote_url(path, ORIGIN).await? {
            if url != input.remote_url {
                warn!(
                    "reusing existing {} ({}) instead of {}",
                    ORIGIN, url, input.remote_url
                );
            }
        }
    } else {
        vcs.add_remote(path, ORIGIN, &input.remote_url).await?;
        report.remote_created = true;
    }

    gw.retry()
        .run("git push", || vcs.push(path, ORIGIN, &input.branch))
        .await
}
