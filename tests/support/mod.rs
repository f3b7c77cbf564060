//! In-memory collaborators for driving `Gateway` without a network or a git binary.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use github_ops_mcp::error::GatewayError;
use github_ops_mcp::models::{
    Branch, CodeHit, CombinedStatus, Comment, Commit, FileChange, FileWriteKind, FileWriteResult,
    Issue, MergeResult, PullRequest, Repository, UserHit,
};
use github_ops_mcp::pagination::{PageWindow, RawCollection};
use github_ops_mcp::retry::RetryPolicy;
use github_ops_mcp::schema::{CodeSearchSort, IssueSearchSort, UserSearchSort};
use github_ops_mcp::upstream::{
    FileWrite, IssueFilter, MergeRequest, NewIssue, NewPullRequest, NewRepository, PullFilter,
    PullUpdate, RepoRef, SearchQuery, Upstream,
};
use github_ops_mcp::vcs::VersionControl;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        jitter: false,
    }
}

pub fn rate_limited() -> GatewayError {
    GatewayError::RateLimited {
        message: "API rate limit exceeded".into(),
        retry_after: Some(Duration::from_millis(1)),
    }
}

/// How listings are handed back to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Window,
    Complete,
    Stream,
}

/// Serves the single repository `o/r`.
pub struct StubUpstream {
    shape: Shape,
    calls: Mutex<HashMap<&'static str, u32>>,
    failures: Mutex<HashMap<&'static str, VecDeque<GatewayError>>>,
    issues: Mutex<Vec<Issue>>,
    blobs: Mutex<HashMap<String, String>>,
    next_blob: AtomicUsize,
    hanging: Mutex<Vec<&'static str>>,
    /// Items pulled out of stream-shaped listings.
    pub pulled: Arc<AtomicUsize>,
}

impl StubUpstream {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            issues: Mutex::new(Vec::new()),
            blobs: Mutex::new(HashMap::new()),
            next_blob: AtomicUsize::new(1),
            hanging: Mutex::new(Vec::new()),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_issues(self, count: u64) -> Self {
        {
            let mut issues = self.issues.lock().unwrap();
            for n in 1..=count {
                issues.push(issue(n, &format!("issue {n}")));
            }
        }
        self
    }

    /// Queue `err` for the next `times` calls of `method`.
    pub fn fail(&self, method: &'static str, err: GatewayError, times: usize) {
        let mut failures = self.failures.lock().unwrap();
        let queue = failures.entry(method).or_default();
        for _ in 0..times {
            queue.push_back(err.clone());
        }
    }

    /// Make `method` never answer. Only repository lookups honor this.
    pub fn hang(&self, method: &'static str) {
        self.hanging.lock().unwrap().push(method);
    }

    async fn maybe_hang(&self, method: &'static str) {
        if self.hanging.lock().unwrap().contains(&method) {
            futures::future::pending::<()>().await;
        }
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, method: &'static str) -> Result<(), GatewayError> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn known(&self, repo: &RepoRef) -> Result<(), GatewayError> {
        if repo.owner == "o" && repo.name == "r" {
            Ok(())
        } else {
            Err(GatewayError::not_found("Not Found"))
        }
    }

    fn collect<T: Send + 'static>(&self, all: Vec<T>, window: PageWindow) -> RawCollection<T> {
        match self.shape {
            Shape::Window => RawCollection::Window {
                total_count: Some(all.len() as u64),
                items: all
                    .into_iter()
                    .skip(window.offset())
                    .take(window.limit())
                    .collect(),
            },
            Shape::Complete => RawCollection::Complete(all),
            Shape::Stream => {
                let pulled = self.pulled.clone();
                RawCollection::Stream {
                    items: stream::iter(all)
                        .map(move |item| {
                            pulled.fetch_add(1, Ordering::SeqCst);
                            Ok(item)
                        })
                        .boxed(),
                    total_count: None,
                }
            }
        }
    }
}

fn not_stubbed(what: &str) -> GatewayError {
    GatewayError::upstream(format!("{what} is not stubbed"))
}

pub fn issue(number: u64, title: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        state: "open".into(),
        body: None,
        author_login: Some("octocat".into()),
        labels: Vec::new(),
        assignees: Vec::new(),
        comments: 0,
        html_url: format!("https://github.com/o/r/issues/{number}"),
        created_at: "2025-01-01T00:00:00Z".into(),
        updated_at: "2025-01-01T00:00:00Z".into(),
        closed_at: None,
        is_pull_request: false,
    }
}

fn repository(repo: &RepoRef) -> Repository {
    Repository {
        id: 1,
        name: repo.name.clone(),
        full_name: repo.to_string(),
        owner_login: repo.owner.clone(),
        private: false,
        fork: false,
        description: None,
        html_url: format!("https://github.com/{repo}"),
        clone_url: format!("https://github.com/{repo}.git"),
        default_branch: "main".into(),
        stargazers_count: 0,
        language: None,
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, GatewayError> {
        self.enter("get_repository")?;
        self.maybe_hang("get_repository").await;
        self.known(repo)?;
        Ok(repository(repo))
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository, GatewayError> {
        self.enter("create_repository")?;
        Ok(repository(&RepoRef::new("me", repo.name.clone())))
    }

    async fn create_fork(
        &self,
        _repo: &RepoRef,
        _organization: Option<&str>,
    ) -> Result<Repository, GatewayError> {
        self.enter("create_fork")?;
        Err(not_stubbed("create_fork"))
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, GatewayError> {
        self.enter("get_issue")?;
        self.known(repo)?;
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.number == number)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("Not Found"))
    }

    async fn list_issues(
        &self,
        repo: &RepoRef,
        _filter: &IssueFilter,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError> {
        self.enter("list_issues")?;
        self.known(repo)?;
        let all = self.issues.lock().unwrap().clone();
        Ok(self.collect(all, window))
    }

    async fn create_issue(&self, repo: &RepoRef, new: &NewIssue) -> Result<Issue, GatewayError> {
        self.enter("create_issue")?;
        self.known(repo)?;
        let mut issues = self.issues.lock().unwrap();
        let created = issue(issues.len() as u64 + 1, &new.title);
        issues.push(created.clone());
        Ok(created)
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, GatewayError> {
        self.enter("create_issue_comment")?;
        self.known(repo)?;
        Ok(Comment {
            id: 1,
            body: body.to_string(),
            author_login: Some("bot".into()),
            html_url: format!("https://github.com/o/r/issues/{number}#issuecomment-1"),
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        })
    }

    async fn list_issue_comments(
        &self,
        _repo: &RepoRef,
        _number: u64,
        window: PageWindow,
    ) -> Result<RawCollection<Comment>, GatewayError> {
        self.enter("list_issue_comments")?;
        Ok(self.collect(Vec::new(), window))
    }

    async fn get_commit(&self, _repo: &RepoRef, _reference: &str) -> Result<Commit, GatewayError> {
        self.enter("get_commit")?;
        Err(not_stubbed("get_commit"))
    }

    async fn list_commits(
        &self,
        _repo: &RepoRef,
        _sha: Option<&str>,
        _window: PageWindow,
    ) -> Result<RawCollection<Commit>, GatewayError> {
        self.enter("list_commits")?;
        Err(not_stubbed("list_commits"))
    }

    async fn get_combined_status(
        &self,
        _repo: &RepoRef,
        _reference: &str,
    ) -> Result<CombinedStatus, GatewayError> {
        self.enter("get_combined_status")?;
        Err(not_stubbed("get_combined_status"))
    }

    async fn get_branch(&self, _repo: &RepoRef, _name: &str) -> Result<Branch, GatewayError> {
        self.enter("get_branch")?;
        Err(not_stubbed("get_branch"))
    }

    async fn list_branches(
        &self,
        repo: &RepoRef,
        window: PageWindow,
    ) -> Result<RawCollection<Branch>, GatewayError> {
        self.enter("list_branches")?;
        self.known(repo)?;
        let main = Branch {
            name: "main".into(),
            sha: "abc".into(),
            protected: false,
        };
        Ok(self.collect(vec![main], window))
    }

    /// Tracks the current blob per path the way the contents API does.
    async fn put_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
    ) -> Result<FileWriteResult, GatewayError> {
        self.enter("put_file")?;
        self.known(repo)?;
        let mut blobs = self.blobs.lock().unwrap();
        let current = blobs.get(&write.path).cloned();
        let operation = match (&write.sha, &current) {
            (None, None) => FileWriteKind::Created,
            (Some(given), Some(cur)) if given == cur => FileWriteKind::Updated,
            (None, Some(_)) => {
                return Err(GatewayError::Conflict {
                    message: format!("{} already exists", write.path),
                })
            }
            (Some(given), _) => {
                return Err(GatewayError::Conflict {
                    message: format!("{} does not match {given}", write.path),
                })
            }
        };
        let n = self.next_blob.fetch_add(1, Ordering::SeqCst);
        let sha = format!("blob{n}");
        blobs.insert(write.path.clone(), sha.clone());
        Ok(FileWriteResult {
            operation,
            path: write.path.clone(),
            content_sha: sha,
            commit_sha: format!("commit{n}"),
            html_url: None,
        })
    }

    async fn get_pull_request(
        &self,
        _repo: &RepoRef,
        _number: u64,
    ) -> Result<PullRequest, GatewayError> {
        self.enter("get_pull_request")?;
        Err(GatewayError::not_found("Not Found"))
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        _pull: &NewPullRequest,
    ) -> Result<PullRequest, GatewayError> {
        self.enter("create_pull_request")?;
        Err(not_stubbed("create_pull_request"))
    }

    async fn update_pull_request(
        &self,
        _repo: &RepoRef,
        _number: u64,
        _update: &PullUpdate,
    ) -> Result<PullRequest, GatewayError> {
        self.enter("update_pull_request")?;
        Err(not_stubbed("update_pull_request"))
    }

    async fn list_pull_requests(
        &self,
        _repo: &RepoRef,
        _filter: &PullFilter,
        _window: PageWindow,
    ) -> Result<RawCollection<PullRequest>, GatewayError> {
        self.enter("list_pull_requests")?;
        Err(not_stubbed("list_pull_requests"))
    }

    async fn merge_pull_request(
        &self,
        _repo: &RepoRef,
        _number: u64,
        _merge: &MergeRequest,
    ) -> Result<MergeResult, GatewayError> {
        self.enter("merge_pull_request")?;
        Err(not_stubbed("merge_pull_request"))
    }

    async fn list_pull_request_files(
        &self,
        _repo: &RepoRef,
        _number: u64,
        _window: PageWindow,
    ) -> Result<RawCollection<FileChange>, GatewayError> {
        self.enter("list_pull_request_files")?;
        Err(not_stubbed("list_pull_request_files"))
    }

    async fn search_issues(
        &self,
        _query: &SearchQuery<IssueSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError> {
        self.enter("search_issues")?;
        let all = self.issues.lock().unwrap().clone();
        Ok(self.collect(all, window))
    }

    async fn search_repositories(
        &self,
        _query: &SearchQuery<()>,
        _window: PageWindow,
    ) -> Result<RawCollection<Repository>, GatewayError> {
        self.enter("search_repositories")?;
        Err(not_stubbed("search_repositories"))
    }

    async fn search_code(
        &self,
        _query: &SearchQuery<CodeSearchSort>,
        _window: PageWindow,
    ) -> Result<RawCollection<CodeHit>, GatewayError> {
        self.enter("search_code")?;
        Err(not_stubbed("search_code"))
    }

    async fn search_users(
        &self,
        _query: &SearchQuery<UserSearchSort>,
        _window: PageWindow,
    ) -> Result<RawCollection<UserHit>, GatewayError> {
        self.enter("search_users")?;
        Err(not_stubbed("search_users"))
    }
}

/// Records every git step and keeps just enough state to behave like a work tree.
#[derive(Default)]
pub struct StubVcs {
    state: Mutex<VcsState>,
    push_failures: Mutex<VecDeque<GatewayError>>,
}

#[derive(Default)]
struct VcsState {
    repository: bool,
    commits: u32,
    branch: Option<String>,
    remotes: HashMap<String, String>,
    log: Vec<String>,
}

impl StubVcs {
    /// A directory that already holds a committed repository with `origin` set.
    pub fn existing(origin: &str) -> Self {
        let vcs = Self::default();
        {
            let mut s = vcs.state.lock().unwrap();
            s.repository = true;
            s.commits = 1;
            s.remotes.insert("origin".into(), origin.into());
        }
        vcs
    }

    pub fn fail_push(&self, err: GatewayError, times: usize) {
        let mut q = self.push_failures.lock().unwrap();
        for _ in 0..times {
            q.push_back(err.clone());
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn commits(&self) -> u32 {
        self.state.lock().unwrap().commits
    }

    pub fn branch(&self) -> Option<String> {
        self.state.lock().unwrap().branch.clone()
    }

    fn record(&self, step: impl Into<String>) {
        self.state.lock().unwrap().log.push(step.into());
    }
}

#[async_trait]
impl VersionControl for StubVcs {
    async fn is_repository(&self, _path: &Path) -> Result<bool, GatewayError> {
        Ok(self.state.lock().unwrap().repository)
    }

    async fn init(&self, _path: &Path) -> Result<(), GatewayError> {
        self.record("init");
        self.state.lock().unwrap().repository = true;
        Ok(())
    }

    async fn stage_all(&self, _path: &Path) -> Result<(), GatewayError> {
        self.record("add");
        Ok(())
    }

    async fn has_commits(&self, _path: &Path) -> Result<bool, GatewayError> {
        Ok(self.state.lock().unwrap().commits > 0)
    }

    async fn commit(&self, _path: &Path, message: &str) -> Result<(), GatewayError> {
        self.record(format!("commit {message}"));
        self.state.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn rename_branch(&self, _path: &Path, branch: &str) -> Result<(), GatewayError> {
        self.record(format!("branch {branch}"));
        self.state.lock().unwrap().branch = Some(branch.to_string());
        Ok(())
    }

    async fn remotes(&self, _path: &Path) -> Result<Vec<String>, GatewayError> {
        Ok(self.state.lock().unwrap().remotes.keys().cloned().collect())
    }

    async fn remote_url(&self, _path: &Path, name: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.state.lock().unwrap().remotes.get(name).cloned())
    }

    async fn add_remote(&self, _path: &Path, name: &str, url: &str) -> Result<(), GatewayError> {
        self.record(format!("remote add {name}"));
        self.state
            .lock()
            .unwrap()
            .remotes
            .insert(name.to_string(), url.to_string());
        Ok(())
    }

    async fn push(&self, _path: &Path, remote: &str, branch: &str) -> Result<(), GatewayError> {
        self.record(format!("push {remote} {branch}"));
        match self.push_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
