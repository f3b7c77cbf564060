//! Turns logical references into live upstream handles.
//!
//! Handles are request-scoped snapshots. Nothing here caches: a second
//! request resolves again because upstream state may have moved.

use crate::error::GatewayError;
use crate::models::{Branch, Commit, Issue, PullRequest, Repository};
use crate::retry::RetryPolicy;
use crate::upstream::{RepoRef, Upstream};

#[derive(Debug, Clone)]
pub struct RepoHandle {
    pub reference: RepoRef,
    pub repository: Repository,
}

#[derive(Debug, Clone)]
pub struct IssueHandle {
    pub number: u64,
    pub issue: Issue,
}

#[derive(Debug, Clone)]
pub struct PullHandle {
    pub number: u64,
    pub pull: PullRequest,
}

#[derive(Debug, Clone)]
pub struct CommitHandle {
    pub commit: Commit,
}

#[derive(Debug, Clone)]
pub struct BranchHandle {
    pub branch: Branch,
}

pub struct Resolver<'a> {
    upstream: &'a dyn Upstream,
    retry: &'a RetryPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(upstream: &'a dyn Upstream, retry: &'a RetryPolicy) -> Self {
        Self { upstream, retry }
    }

    pub async fn resolve(&self, owner: &str, name: &str) -> Result<RepoHandle, GatewayError> {
        let reference = RepoRef::new(owner, name);
        let what = format!("repository {reference}");
        let repository = self
            .retry
            .run("resolve repository", || self.upstream.get_repository(&reference))
            .await
            .map_err(|e| conservative(&what, e))?;
        Ok(RepoHandle {
            reference,
            repository,
        })
    }

    pub async fn resolve_issue(
        &self,
        repo: &RepoHandle,
        number: u64,
    ) -> Result<IssueHandle, GatewayError> {
        let what = format!("issue #{number} in {}", repo.reference);
        let issue = self
            .retry
            .run("resolve issue", || self.upstream.get_issue(&repo.reference, number))
            .await
            .map_err(|e| conservative(&what, e))?;
        Ok(IssueHandle { number, issue })
    }

    pub async fn resolve_pull(
        &self,
        repo: &RepoHandle,
        number: u64,
    ) -> Result<PullHandle, GatewayError> {
        let what = format!("pull request #{number} in {}", repo.reference);
        let pull = self
            .retry
            .run("resolve pull request", || {
                self.upstream.get_pull_request(&repo.reference, number)
            })
            .await
            .map_err(|e| conservative(&what, e))?;
        Ok(PullHandle { number, pull })
    }

    /// `reference` may be a SHA, a branch or a tag.
    pub async fn resolve_commit(
        &self,
        repo: &RepoHandle,
        reference: &str,
    ) -> Result<CommitHandle, GatewayError> {
        let what = format!("commit `{reference}` in {}", repo.reference);
        let commit = self
            .retry
            .run("resolve commit", || self.upstream.get_commit(&repo.reference, reference))
            .await
            .map_err(|e| conservative(&what, e))?;
        Ok(CommitHandle { commit })
    }

    pub async fn resolve_branch(
        &self,
        repo: &RepoHandle,
        name: &str,
    ) -> Result<BranchHandle, GatewayError> {
        let what = format!("branch `{name}` in {}", repo.reference);
        let branch = self
            .retry
            .run("resolve branch", || self.upstream.get_branch(&repo.reference, name))
            .await
            .map_err(|e| conservative(&what, e))?;
        Ok(BranchHandle { branch })
    }
}

/// GitHub answers 404 for resources the token cannot see, so "forbidden"
/// and "not found" are indistinguishable at lookup time. Both become
/// `NotFound`, keeping the upstream message for diagnostics.
fn conservative(what: &str, err: GatewayError) -> GatewayError {
    match err {
        // 409 here means an empty repository has no such ref.
        GatewayError::NotFound { message }
        | GatewayError::Permission { message }
        | GatewayError::Conflict { message } => {
            GatewayError::not_found(format!("{what} ({message})"))
        }
        other => other,
    }
}
