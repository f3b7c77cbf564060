//! The hosting-platform collaborator seam.
//!
//! Handlers only talk to the platform through [`Upstream`]. The production
//! implementation is `http::RestUpstream`; tests inject call-counting stubs.
//! Every method is a single attempt: retry is layered on top by the gateway.

use crate::error::GatewayError;
use crate::models::{
    Branch, CodeHit, CombinedStatus, Comment, Commit, FileChange, FileWriteResult, Issue,
    MergeResult, PullRequest, Repository, UserHit,
};
use crate::pagination::{PageWindow, RawCollection};
use crate::schema::{
    CodeSearchSort, Direction, IssueSearchSort, IssueSort, IssueState, MergeMethod, PullSort,
    PullState, PullUpdateState, UserSearchSort,
};
use async_trait::async_trait;
use std::fmt;

/// `owner/name` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub state: IssueState,
    pub labels: Vec<String>,
    pub sort: Option<IssueSort>,
    pub direction: Option<Direction>,
    pub since: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub body: Option<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub milestone: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullFilter {
    pub state: PullState,
    pub head: Option<String>,
    pub base: Option<String>,
    pub sort: PullSort,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<PullUpdateState>,
    pub base: Option<String>,
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: Option<String>,
    pub draft: bool,
    pub maintainer_can_modify: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeRequest {
    pub commit_title: Option<String>,
    pub commit_message: Option<String>,
    pub merge_method: MergeMethod,
}

/// A file write; `sha` present means update of that blob, absent means create.
#[derive(Debug, Clone, PartialEq)]
pub struct FileWrite {
    pub path: String,
    /// Plain text; the REST client base64-encodes it.
    pub content: String,
    pub message: String,
    pub branch: String,
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRepository {
    pub name: String,
    pub description: Option<String>,
    pub private: Option<bool>,
    pub auto_init: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery<S> {
    pub q: String,
    pub sort: Option<S>,
    pub order: Option<Direction>,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, GatewayError>;
    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository, GatewayError>;
    async fn create_fork(
        &self,
        repo: &RepoRef,
        organization: Option<&str>,
    ) -> Result<Repository, GatewayError>;

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, GatewayError>;
    async fn list_issues(
        &self,
        repo: &RepoRef,
        filter: &IssueFilter,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError>;
    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<Issue, GatewayError>;
    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, GatewayError>;
    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
        window: PageWindow,
    ) -> Result<RawCollection<Comment>, GatewayError>;

    /// `reference` may be a SHA, branch or tag.
    async fn get_commit(&self, repo: &RepoRef, reference: &str) -> Result<Commit, GatewayError>;
    async fn list_commits(
        &self,
        repo: &RepoRef,
        sha: Option<&str>,
        window: PageWindow,
    ) -> Result<RawCollection<Commit>, GatewayError>;
    async fn get_combined_status(
        &self,
        repo: &RepoRef,
        reference: &str,
    ) -> Result<CombinedStatus, GatewayError>;

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, GatewayError>;
    async fn list_branches(
        &self,
        repo: &RepoRef,
        window: PageWindow,
    ) -> Result<RawCollection<Branch>, GatewayError>;

    async fn put_file(&self, repo: &RepoRef, write: &FileWrite)
        -> Result<FileWriteResult, GatewayError>;

    async fn get_pull_request(&self, repo: &RepoRef, number: u64)
        -> Result<PullRequest, GatewayError>;
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GatewayError>;
    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &PullUpdate,
    ) -> Result<PullRequest, GatewayError>;
    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        filter: &PullFilter,
        window: PageWindow,
    ) -> Result<RawCollection<PullRequest>, GatewayError>;
    async fn merge_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        merge: &MergeRequest,
    ) -> Result<MergeResult, GatewayError>;
    async fn list_pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
        window: PageWindow,
    ) -> Result<RawCollection<FileChange>, GatewayError>;

    async fn search_issues(
        &self,
        query: &SearchQuery<IssueSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError>;
    async fn search_repositories(
        &self,
        query: &SearchQuery<()>,
        window: PageWindow,
    ) -> Result<RawCollection<Repository>, GatewayError>;
    async fn search_code(
        &self,
        query: &SearchQuery<CodeSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<CodeHit>, GatewayError>;
    async fn search_users(
        &self,
        query: &SearchQuery<UserSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<UserHit>, GatewayError>;
}
